use chrono::Local;
use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::Write;

/// 日志级别从该环境变量读取，默认只输出警告和错误
pub const LOG_ENV: &str = "MINIFAT_LOG";

struct ShellLogger;

static LOGGER: ShellLogger = ShellLogger;

impl Log for ShellLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = record.level();
        let tag = match level {
            Level::Error => format!("{:5}", level).bright_red(),
            Level::Warn => format!("{:5}", level).bright_yellow(),
            Level::Info => format!("{:5}", level).bright_blue(),
            Level::Debug => format!("{:5}", level).bright_cyan(),
            Level::Trace => format!("{:5}", level).bright_magenta(),
        };
        let stamp = Local::now().format("%H:%M:%S%.3f").to_string();
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{} {} {}", tag, stamp.dimmed(), record.args());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

pub fn init() -> Result<(), log::SetLoggerError> {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|value| parse_level(&value))
        .unwrap_or(LevelFilter::Warn);
    log::set_max_level(level);
    log::set_logger(&LOGGER)
}
