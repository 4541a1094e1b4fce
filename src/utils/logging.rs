use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::CONFIG;

/// Target reserved for request and model timing events. The general log
/// sinks drop it, the timing sinks accept nothing else.
pub const TIMING_TARGET: &str = "advisor.timing";

/// Keeps the non-blocking appender workers alive for the process lifetime.
/// Dropping this flushes and stops all file sinks.
pub struct LoggingGuards {
    _workers: Vec<WorkerGuard>,
}

fn rolling_writer(dir: &Path, file_name: &str, workers: &mut Vec<WorkerGuard>) -> NonBlocking {
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, file_name));
    workers.push(guard);
    writer
}

/// Text and JSON daily-rolling files under `logs/` plus stdout, with timing
/// events split onto their own pair of files.
pub fn init_logging() -> LoggingGuards {
    let logs_dir = Path::new("logs");
    if let Err(err) = fs::create_dir_all(logs_dir) {
        eprintln!("Failed to create logs directory: {err}");
    }

    let mut workers = Vec::new();
    let app_writer = rolling_writer(logs_dir, "advisor.log", &mut workers);
    let app_json_writer = rolling_writer(logs_dir, "advisor.jsonl", &mut workers);
    let timing_writer = rolling_writer(logs_dir, "timing.log", &mut workers);
    let timing_json_writer = rolling_writer(logs_dir, "timing.jsonl", &mut workers);

    let level = CONFIG
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);
    let app_filter = Targets::new()
        .with_default(level)
        .with_target(TIMING_TARGET, LevelFilter::OFF)
        .with_target("hyper", LevelFilter::WARN)
        .with_target("hyper_util", LevelFilter::WARN)
        .with_target("reqwest", LevelFilter::WARN);
    let timing_filter = Targets::new()
        .with_default(LevelFilter::OFF)
        .with_target(TIMING_TARGET, LevelFilter::INFO);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(app_filter.clone()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(app_writer)
                .with_ansi(false)
                .with_filter(app_filter.clone()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(app_json_writer)
                .with_filter(app_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(timing_writer)
                .with_ansi(false)
                .with_filter(timing_filter.clone()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(timing_json_writer)
                .with_filter(timing_filter),
        )
        .init();

    LoggingGuards { _workers: workers }
}
