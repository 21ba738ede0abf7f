//! 命令行工具的日志初始化.
//!
//! - stderr: 彩色, 不带 target, 级别随 `-v/-vv` 提升, 标准输出只留给校验和
//! - 文件: 无色, 带 target, 按天滚动到 `logs/{prefix}.{date}.log`
//!
//! `OBMC_LOG` 环境变量覆盖两者的过滤指令.

use anyhow::{Context, Result};
use chrono::Local;
use std::sync::OnceLock;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, format::Writer, time::FormatTime},
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

const LOG_ENV: &str = "OBMC_LOG";
const LOG_DIR: &str = "logs";

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 本地时间, 精确到毫秒
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "[{}]", Local::now().format("%m-%d %H:%M:%S%.3f"))
    }
}

fn filter_for(verbosity: u8) -> EnvFilter {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level))
}

/// 初始化日志系统
///
/// `verbosity`: 0=info, 1=debug, 2+=trace.
pub fn init(file_prefix: &str, verbosity: u8) -> Result<()> {
    std::fs::create_dir_all(LOG_DIR).context("创建日志目录失败")?;
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_prefix)
        .filename_suffix("log")
        .build(LOG_DIR)
        .context("创建日志文件失败")?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).ok();

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTimer)
        .with_target(false)
        .with_filter(filter_for(verbosity));
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_timer(LocalTimer)
        .with_filter(filter_for(verbosity));

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("初始化日志订阅器失败")
}
