//! 日志文件维护任务: 午夜切换, 历史压缩, 过期删除.

use super::{LoggingConfig, build_current_log_path};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate, TimeZone, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, error};

/// 一次清理的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// 删除的过期文件数
    pub removed: usize,
    /// 压缩的历史文件数
    pub compressed: usize,
}

pub(super) fn spawn_log_maintenance_task(config: LoggingConfig, rotate_requested: Arc<AtomicBool>) {
    tokio::spawn(async move {
        let mut cleanup_interval =
            tokio::time::interval(Duration::from_secs(config.cleanup_interval_seconds.max(1)));

        if let Err(err) = ensure_current_log_file(&config, Local::now().date_naive()) {
            error!("初始化当前日志文件失败: {}", err);
        }

        let mut next_rollover_at = next_rollover_or_retry(Local::now());
        loop {
            tokio::select! {
                _ = cleanup_interval.tick() => {
                    run_cleanup(&config);
                }
                _ = tokio::time::sleep_until(next_rollover_at) => {
                    match ensure_current_log_file(&config, Local::now().date_naive()) {
                        Ok(()) => rotate_requested.store(true, Ordering::Release),
                        Err(err) => error!("日志翻滚失败: {}", err),
                    }
                    run_cleanup(&config);
                    next_rollover_at = next_rollover_or_retry(Local::now());
                }
            }
        }
    });
}

fn run_cleanup(config: &LoggingConfig) {
    match cleanup_logs(config, Local::now().date_naive()) {
        Ok(report) if report != CleanupReport::default() => {
            debug!(
                "日志清理: 删除 {} 个, 压缩 {} 个",
                report.removed, report.compressed
            );
        }
        Ok(_) => {}
        Err(err) => error!("清理日志失败: {}", err),
    }
}

fn next_rollover_or_retry(now: DateTime<Local>) -> tokio::time::Instant {
    compute_next_rollover(now).unwrap_or_else(|err| {
        error!("计算下一次翻滚时间失败: {}", err);
        tokio::time::Instant::now() + Duration::from_secs(1)
    })
}

/// 确保指定日期的日志文件存在
fn ensure_current_log_file(config: &LoggingConfig, today: NaiveDate) -> Result<()> {
    let directory = Path::new(&config.directory);
    fs::create_dir_all(directory)?;
    let current_path = build_current_log_path(directory, &config.file_prefix, today);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&current_path)
        .with_context(|| format!("创建当前日志文件失败, path={}", current_path.display()))?;
    Ok(())
}

/// 以 `today` 为基准清理日志目录
///
/// 早于保留期的文件删除; 其余早于今天且未压缩的文件在开启压缩时转为 `.gz`.
pub(super) fn cleanup_logs(config: &LoggingConfig, today: NaiveDate) -> Result<CleanupReport> {
    let directory = Path::new(&config.directory);
    let mut report = CleanupReport::default();
    if !directory.exists() {
        return Ok(report);
    }
    let cutoff = today - ChronoDuration::days(config.retention_days);

    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        let Some((date, compressed)) = parse_rotated_log_name(&file_name, &config.file_prefix)
        else {
            continue;
        };
        let path = entry.path();
        if date < cutoff {
            if fs::remove_file(&path).is_ok() {
                report.removed += 1;
            }
        } else if config.compress_history && !compressed && date < today && compress_to_gz(&path)? {
            report.compressed += 1;
        }
    }
    Ok(report)
}

/// 压缩为同名 `.gz` 并删除原文件, 目标已存在时跳过
fn compress_to_gz(path: &Path) -> Result<bool> {
    let gz_path = PathBuf::from(format!("{}.gz", path.display()));
    if gz_path.exists() {
        return Ok(false);
    }
    let mut input =
        File::open(path).with_context(|| format!("打开待压缩日志失败, path={}", path.display()))?;
    let output = File::create(&gz_path)
        .with_context(|| format!("创建压缩日志失败, path={}", gz_path.display()))?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;
    fs::remove_file(path)
        .with_context(|| format!("删除已压缩日志失败, path={}", path.display()))?;
    Ok(true)
}

/// 解析 `{prefix}.{YYYY-MM-DD}.log[.gz]`, 返回 `(日期, 是否已压缩)`
fn parse_rotated_log_name(file_name: &str, prefix: &str) -> Option<(NaiveDate, bool)> {
    let rest = file_name.strip_prefix(prefix)?.strip_prefix('.')?;
    let (date_part, compressed) = match rest.strip_suffix(".log.gz") {
        Some(date_part) => (date_part, true),
        None => (rest.strip_suffix(".log")?, false),
    };
    if date_part.len() != 10 {
        return None;
    }
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some((date, compressed))
}

fn compute_next_rollover(now: DateTime<Local>) -> Result<tokio::time::Instant> {
    let next_midnight = (now.date_naive() + ChronoDuration::days(1))
        .and_hms_opt(0, 0, 0)
        .context("计算下一次日志翻滚时间失败")?;
    let next_local = Local
        .from_local_datetime(&next_midnight)
        .earliest()
        .context("转换本地时间失败")?;
    let wait = SystemTime::from(next_local.with_timezone(&Utc))
        .duration_since(SystemTime::now())
        .unwrap_or(Duration::ZERO);
    Ok(tokio::time::Instant::now() + wait)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, retention_days: i64, compress_history: bool) -> LoggingConfig {
        LoggingConfig {
            level: "info".to_string(),
            directory: dir.path().to_string_lossy().to_string(),
            file_prefix: "obmc".to_string(),
            retention_days,
            compress_history,
            cleanup_interval_seconds: 60,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("测试日期初始化失败")
    }

    #[test]
    fn test_parse_rotated_log_name() {
        assert_eq!(
            parse_rotated_log_name("obmc.2026-02-06.log", "obmc"),
            Some((date(2026, 2, 6), false))
        );
        assert_eq!(
            parse_rotated_log_name("obmc.2026-02-06.log.gz", "obmc"),
            Some((date(2026, 2, 6), true))
        );
        assert!(parse_rotated_log_name("obmc.log", "obmc").is_none());
        assert!(parse_rotated_log_name("obmc-cli.2026-02-06.log", "obmc").is_none());
        assert!(parse_rotated_log_name("obmc.2026-2-6.log", "obmc").is_none());
    }

    #[test]
    fn test_ensure_current_log_file_创建空文件() {
        let dir = TempDir::new().expect("创建临时目录失败");
        let config = config_in(&dir, 30, true);
        let today = date(2026, 10, 19);
        ensure_current_log_file(&config, today).expect("创建当前日志文件失败");
        // 重复调用不截断已有内容
        ensure_current_log_file(&config, today).expect("创建当前日志文件失败");
        let metadata = config.log_path(today).metadata().expect("读取元数据失败");
        assert_eq!(metadata.len(), 0);
    }

    #[test]
    fn test_cleanup_压缩与删除() {
        let dir = TempDir::new().expect("创建临时目录失败");
        let config = config_in(&dir, 7, true);
        let today = date(2026, 10, 19);
        for d in [date(2026, 10, 1), date(2026, 10, 15), today] {
            fs::write(config.log_path(d), format!("log of {d}\n")).expect("写入失败");
        }
        fs::write(dir.path().join("other.txt"), "keep").expect("写入失败");

        let report = cleanup_logs(&config, today).expect("清理失败");
        assert_eq!(report, CleanupReport { removed: 1, compressed: 1 });

        assert!(!config.log_path(date(2026, 10, 1)).exists());
        assert!(config.log_path(today).exists());
        assert!(dir.path().join("other.txt").exists());

        let gz = PathBuf::from(format!("{}.gz", config.log_path(date(2026, 10, 15)).display()));
        let mut text = String::new();
        flate2::read::GzDecoder::new(File::open(&gz).expect("打开压缩文件失败"))
            .read_to_string(&mut text)
            .expect("解压失败");
        assert_eq!(text, "log of 2026-10-15\n");

        // 再次清理没有新动作
        assert_eq!(cleanup_logs(&config, today).expect("清理失败"), CleanupReport::default());
    }

    #[test]
    fn test_cleanup_关闭压缩() {
        let dir = TempDir::new().expect("创建临时目录失败");
        let config = config_in(&dir, 30, false);
        let today = date(2026, 10, 19);
        fs::write(config.log_path(date(2026, 10, 18)), "x").expect("写入失败");
        let report = cleanup_logs(&config, today).expect("清理失败");
        assert_eq!(report, CleanupReport::default());
        assert!(config.log_path(date(2026, 10, 18)).exists());
    }
}
