// ABOUTME: Run-scoped log: a timestamped file plus a console line channel.
// ABOUTME: Owned by one batch run and dropped at aggregation; no process-wide state.

use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Info,
    Success,
    Warning,
    Error,
}

/// One line streamed to the caller's console alongside the log file.
#[derive(Debug, Clone, Serialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}

pub struct RunLog {
    path: PathBuf,
    file: Mutex<File>,
    console: UnboundedSender<LogLine>,
}

impl RunLog {
    /// Create `{prefix}_{timestamp}.log` in `dir` plus the console channel
    /// the UI (or CLI) drains for live output.
    pub fn create(dir: &Path, prefix: &str) -> std::io::Result<(Self, UnboundedReceiver<LogLine>)> {
        let stamp = jiff::Zoned::now().strftime("%Y_%m_%d_%H_%M_%S").to_string();
        let path = dir.join(format!("{}_{}.log", prefix, stamp));
        std::fs::create_dir_all(dir)?;
        let file = File::create(&path)?;
        let (console, receiver) = unbounded_channel();
        Ok((
            Self {
                path,
                file: Mutex::new(file),
                console,
            },
            receiver,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.write(LogLevel::Trace, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.write(LogLevel::Info, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.write(LogLevel::Success, message.into());
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.write(LogLevel::Warning, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.write(LogLevel::Error, message.into());
    }

    fn write(&self, level: LogLevel, message: String) {
        let stamp = jiff::Zoned::now().strftime("%Y-%m-%d %H:%M:%S").to_string();
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{} | {:<7} | {}", stamp, level_name(level), message);
        }
        let _ = self.console.send(LogLine { level, message });
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "TRACE",
        LogLevel::Info => "INFO",
        LogLevel::Success => "SUCCESS",
        LogLevel::Warning => "WARNING",
        LogLevel::Error => "ERROR",
    }
}
