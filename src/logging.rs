//! Logging for sync and publish runs.
//!
//! Every event goes through `tracing`, so whatever subscriber the host installs
//! (see [`init`]) receives it, and is additionally forwarded to an optional
//! [`LogObserver`] supplied when the run is constructed.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Local;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Severity of a forwarded log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    /// Unformatted text such as the welcome message.
    Raw,
}

/// Receives every log line of a run, e.g. a GUI log pane.
///
/// Called synchronously from the run task; implementations must not block.
pub trait LogObserver: Send + Sync {
    fn on_log(&self, level: LogLevel, line: &str);
}

impl<F> LogObserver for F
where
    F: Fn(LogLevel, &str) + Send + Sync,
{
    fn on_log(&self, level: LogLevel, line: &str) {
        self(level, line)
    }
}

/// Log facade owned by one run.
#[derive(Clone, Default)]
pub struct RunLog {
    observer: Option<Arc<dyn LogObserver>>,
}

impl RunLog {
    pub fn new(observer: Option<Arc<dyn LogObserver>>) -> Self {
        Self { observer }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        tracing::info!("{}", msg);
        self.forward(LogLevel::Info, msg);
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        tracing::warn!("{}", msg);
        self.forward(LogLevel::Warning, msg);
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        tracing::error!("{}", msg);
        self.forward(LogLevel::Error, msg);
    }

    /// Text passed through to the observer without timestamp or prefix.
    pub fn raw(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        tracing::info!("{}", msg);
        if let Some(observer) = &self.observer {
            observer.on_log(LogLevel::Raw, msg);
        }
    }

    fn forward(&self, level: LogLevel, msg: &str) {
        if let Some(observer) = &self.observer {
            observer.on_log(level, &format_line(level, msg));
        }
    }
}

/// `[YYYY-MM-DD HH:MM:SS] WARNING: msg` style line.
pub fn format_line(level: LogLevel, msg: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    match level {
        LogLevel::Info => format!("[{}] {}", timestamp, msg),
        LogLevel::Warning => format!("[{}] WARNING: {}", timestamp, msg),
        LogLevel::Error => format!("[{}] ERROR: {}", timestamp, msg),
        LogLevel::Raw => msg.to_string(),
    }
}

/// Install the process-wide subscriber: stderr plus an append-only log file.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init(log_file: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()?;

    Ok(())
}
