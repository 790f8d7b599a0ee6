//! Log file bridge for padsync.
//!
//! Routes the `log` facade (`log::info!`, `log::debug!`, ...) to a log file:
//! /tmp/padsync.log on Unix/macOS, or %TEMP%\padsync.log on Windows.
//! Command output on stdout stays clean; when `RUST_LOG` is set every line is
//! mirrored to stderr as well.
//!
//! Level precedence: the `--log-level` CLI flag, then `RUST_LOG`, then the
//! config file's `log_level`.

use padsync_config::LogLevel;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Path of the log file for this platform
pub fn log_path() -> PathBuf {
    #[cfg(unix)]
    let path = PathBuf::from("/tmp/padsync.log");
    #[cfg(not(unix))]
    let path = std::env::temp_dir().join("padsync.log");
    path
}

struct FileLogger {
    file: Mutex<Option<File>>,
    mirror_stderr: bool,
}

impl FileLogger {
    fn write_line(&self, line: &str) {
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
        if self.mirror_stderr {
            eprint!("{}", line);
        }
    }
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.write_line(&format!(
            "[{}] [{:<5}] [{}] {}\n",
            timestamp(),
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

static LOGGER: OnceLock<FileLogger> = OnceLock::new();

fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}

/// Parse a `RUST_LOG`-style value. Only a bare level is understood; module
/// filters are ignored.
fn level_from_env(value: &str) -> Option<log::LevelFilter> {
    let level = value.split(',').next()?.trim();
    let level = level.rsplit('=').next()?.trim();
    level.parse().ok()
}

/// Pick the effective level: CLI flag, then `RUST_LOG`, then config.
pub fn resolve_level(
    cli: Option<LogLevel>,
    rust_log: Option<&str>,
    config: LogLevel,
) -> log::LevelFilter {
    if let Some(level) = cli {
        return level.to_level_filter();
    }
    if let Some(level) = rust_log.and_then(level_from_env) {
        return level;
    }
    config.to_level_filter()
}

/// Install the file logger. Safe to call more than once; later calls only
/// adjust the level.
pub fn init_log_bridge(level: log::LevelFilter) {
    let mirror_stderr = std::env::var_os("RUST_LOG").is_some();
    let logger = LOGGER.get_or_init(|| {
        let file = if level == log::LevelFilter::Off {
            None
        } else {
            // A missing log file must never break a command
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path())
                .ok()
        };
        FileLogger {
            file: Mutex::new(file),
            mirror_stderr,
        }
    });

    if log::set_logger(logger).is_ok() {
        logger.write_line(&format!(
            "\n{}\npadsync session started at {} (level={})\n{}\n",
            "=".repeat(80),
            timestamp(),
            level,
            "=".repeat(80)
        ));
    }
    log::set_max_level(level);
}
