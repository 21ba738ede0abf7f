//! 进程级日志系统.
//!
//! 基于 `tracing-subscriber` 注册两个输出层:
//! - 控制台: 彩色, 带源码位置
//! - 文件: 纯文本, 经 `tracing_appender::non_blocking` 异步写入按日期命名的文件
//!
//! 库 crate 只通过 `log` 门面输出, 由 `tracing-subscriber` 的 `tracing-log`
//! 桥接收集. 后台维护任务 (需要 tokio 运行时) 在午夜切换文件,
//! 压缩历史文件并删除超出保留期的文件.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

mod task;

pub use task::CleanupReport;

/// 覆盖控制台日志级别的环境变量
pub const LOG_ENV: &str = "OBMC_LOG";

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 文件日志的过滤指令, 如 `info` 或 `obmc_mc=trace,info`
    pub level: String,
    /// 日志目录
    pub directory: String,
    /// 文件名前缀, 文件名为 `{prefix}.{YYYY-MM-DD}.log`
    pub file_prefix: String,
    /// 保留天数
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// 是否压缩历史文件
    #[serde(default = "default_true")]
    pub compress_history: bool,
    /// 清理周期 (秒)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> i64 {
    30
}

fn default_cleanup_interval() -> u64 {
    3600
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: "logs".to_string(),
            file_prefix: "obmc".to_string(),
            retention_days: default_retention_days(),
            compress_history: true,
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

impl LoggingConfig {
    /// 从 JSON 文件读取配置, 缺省字段使用默认值
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取日志配置失败, path={}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("解析日志配置失败, path={}", path.display()))
    }

    /// 指定日期的日志文件路径
    pub fn log_path(&self, date: NaiveDate) -> PathBuf {
        build_current_log_path(Path::new(&self.directory), &self.file_prefix, date)
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 初始化全局日志订阅器, 并启动后台维护任务
///
/// 必须在 tokio 运行时内调用, 且每个进程只能调用一次.
pub fn init(config: LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("创建日志目录失败, path={}", config.directory))?;

    let rotate_requested = Arc::new(AtomicBool::new(false));
    let file_appender = CurrentFileWriter::new(
        Path::new(&config.directory),
        &config.file_prefix,
        Arc::clone(&rotate_requested),
    )?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).ok();

    let console_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("debug"));
    let file_filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("无效的日志级别: {}", config.level))?;

    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(ConsoleFormatter)
        .with_filter(console_filter);

    let file_layer = fmt::Layer::default()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("全局日志订阅器已初始化")?;

    task::spawn_log_maintenance_task(config, rotate_requested);

    Ok(())
}

/// 写入当日日志文件, 维护任务请求后重新打开
struct CurrentFileWriter {
    directory: PathBuf,
    prefix: String,
    rotate_requested: Arc<AtomicBool>,
    file: File,
}

impl CurrentFileWriter {
    fn new(directory: &Path, prefix: &str, rotate_requested: Arc<AtomicBool>) -> Result<Self> {
        let file = open_append_file(&build_current_log_path(
            directory,
            prefix,
            Local::now().date_naive(),
        ))?;
        Ok(Self {
            directory: directory.to_path_buf(),
            prefix: prefix.to_string(),
            rotate_requested,
            file,
        })
    }

    fn reopen(&mut self) -> std::io::Result<()> {
        let path = build_current_log_path(&self.directory, &self.prefix, Local::now().date_naive());
        self.file = open_append_file(&path).map_err(std::io::Error::other)?;
        Ok(())
    }
}

impl Write for CurrentFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.rotate_requested.swap(false, Ordering::AcqRel) {
            self.reopen()?;
        }
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

fn open_append_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("打开日志文件失败, path={}", path.display()))
}

pub(crate) fn build_current_log_path(directory: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    directory.join(format!("{}.{}.log", prefix, date.format("%Y-%m-%d")))
}

/// `[MM-DD hh:mm:ss.mmm] `
fn write_timestamp(writer: &mut Writer<'_>, now: DateTime<Local>) -> std::fmt::Result {
    write!(
        writer,
        "[{:02}-{:02} {:02}:{:02}:{:02}.{:03}] ",
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.timestamp_subsec_millis()
    )
}

struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        write_timestamp(&mut writer, Local::now())?;
        let color = match *meta.level() {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            _ => "\x1b[34m",
        };
        write!(
            writer,
            "{}{:5}\x1b[0m {}:{} > ",
            color,
            meta.level().to_string(),
            meta.file().unwrap_or("unknown"),
            meta.line().unwrap_or(0)
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        write_timestamp(&mut writer, Local::now())?;
        write!(writer, "{:5} {} > ", meta.level().to_string(), meta.target())?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_current_log_path() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 6).expect("测试日期初始化失败");
        let path = build_current_log_path(Path::new("logs"), "obmc-cli", date);
        assert_eq!(path, PathBuf::from("logs/obmc-cli.2026-02-06.log"));
    }

    #[test]
    fn test_config_json_缺省字段() {
        let config: LoggingConfig =
            serde_json::from_str(r#"{"level":"debug","directory":"out","file_prefix":"mc"}"#)
                .expect("解析失败");
        assert_eq!(config.retention_days, 30);
        assert!(config.compress_history);
        assert_eq!(config.cleanup_interval_seconds, 3600);
        let date = NaiveDate::from_ymd_opt(2026, 10, 1).expect("测试日期初始化失败");
        assert_eq!(config.log_path(date), PathBuf::from("out/mc.2026-10-01.log"));
    }
}
