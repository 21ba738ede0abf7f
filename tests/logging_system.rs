//! 日志系统集成测试.
//!
//! tracing 的全局订阅器每个进程只能初始化一次, 调用 `init()` 的测试
//! 都标记为 `#[ignore]`, 需要单独运行.

use obmc::logging::{LOG_ENV, LoggingConfig, init};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn config_in(dir: &Path, prefix: &str, level: &str) -> LoggingConfig {
    LoggingConfig {
        level: level.to_string(),
        directory: dir.to_string_lossy().to_string(),
        file_prefix: prefix.to_string(),
        retention_days: 7,
        compress_history: false,
        cleanup_interval_seconds: 3600,
    }
}

fn today_log(config: &LoggingConfig) -> std::path::PathBuf {
    config.log_path(chrono::Local::now().date_naive())
}

#[tokio::test]
#[ignore] // 需要单独运行: cargo test --test logging_system test_logging_file_content -- --ignored
async fn test_logging_file_content() {
    let dir = TempDir::new().expect("创建临时目录失败");
    let log_dir = dir.path().join("nested").join("logs");
    let config = config_in(&log_dir, "obmc-test", "info");
    init(config.clone()).expect("日志初始化失败");
    assert!(log_dir.exists(), "嵌套日志目录应该被创建");

    tracing::error!("错误日志_ERROR_MSG");
    tracing::info!("信息日志_INFO_MSG");
    tracing::debug!("调试日志_DEBUG_MSG");
    // 库 crate 经 log 门面输出
    log::warn!(target: "obmc_mc::frame", "预测警告_LOG_MSG");

    std::thread::sleep(std::time::Duration::from_millis(200));

    let content = fs::read_to_string(today_log(&config)).expect("读取日志文件失败");
    assert!(content.contains("错误日志_ERROR_MSG"));
    assert!(content.contains("信息日志_INFO_MSG"));
    assert!(content.contains("INFO"), "日志应该包含级别标记");
    assert!(!content.contains("调试日志_DEBUG_MSG"), "debug 日志应该被过滤掉");
    assert!(content.contains("预测警告_LOG_MSG"), "log 门面的记录应该被桥接");
    assert!(content.contains("obmc_mc::frame"), "文件日志应该包含 target");
}

#[tokio::test]
#[ignore] // 需要单独运行: cargo test --test logging_system test_logging_target_filter -- --ignored
async fn test_logging_target_filter() {
    let dir = TempDir::new().expect("创建临时目录失败");
    let config = config_in(dir.path(), "obmc-filter", "warn,obmc_mc=trace");
    init(config.clone()).expect("日志初始化失败");

    log::trace!(target: "obmc_mc::walker", "叶子块_TRACE_MSG");
    log::info!(target: "obmc_core::cpu", "探测_INFO_MSG");

    std::thread::sleep(std::time::Duration::from_millis(200));

    let content = fs::read_to_string(today_log(&config)).expect("读取日志文件失败");
    assert!(content.contains("叶子块_TRACE_MSG"));
    assert!(!content.contains("探测_INFO_MSG"));
}

#[test]
fn test_logging_无效级别() {
    // 过滤指令在启动运行时之前就被拒绝
    let dir = TempDir::new().expect("创建临时目录失败");
    let config = config_in(dir.path(), "obmc", "obmc_mc=notalevel");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("创建运行时失败");
    let result = runtime.block_on(async { init(config) });
    assert!(result.is_err());
}

#[test]
fn test_logging_file_naming_format() {
    let date = chrono::NaiveDate::from_ymd_opt(2026, 10, 19).expect("日期无效");
    for prefix in ["obmc", "obmc-cli", "obmc-bench"] {
        let config = config_in(Path::new("logs"), prefix, "info");
        let path = config.log_path(date);
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(format!("{prefix}.2026-10-19.log").as_str())
        );
    }
}

#[test]
fn test_logging_config_from_json() {
    let dir = TempDir::new().expect("创建临时目录失败");
    let path = dir.path().join("logging.json");
    fs::write(
        &path,
        r#"{"level":"obmc_mc=debug,info","directory":"out","file_prefix":"obmc","retention_days":3}"#,
    )
    .expect("写入配置失败");
    let config = LoggingConfig::from_json_file(&path).expect("读取配置失败");
    assert_eq!(config.level, "obmc_mc=debug,info");
    assert_eq!(config.retention_days, 3);
    assert!(config.compress_history);
    assert_eq!(config.cleanup_interval_seconds, 3600);

    fs::write(&path, "{").expect("写入配置失败");
    assert!(LoggingConfig::from_json_file(&path).is_err());
    assert!(LoggingConfig::from_json_file(&dir.path().join("missing.json")).is_err());
}

#[test]
fn test_logging_config_defaults() {
    let config = LoggingConfig::default();
    assert_eq!(config.retention_days, 30, "默认保留天数应该是 30");
    assert!(config.compress_history, "默认应该开启压缩");
    assert_eq!(config.cleanup_interval_seconds, 3600);
    assert_eq!(config.file_prefix, "obmc");
    assert_eq!(LOG_ENV, "OBMC_LOG");
}
