//! Logger port.
//!
//! The builder reports progress as plain messages at three levels. The
//! default sink forwards them to `tracing`; [`RecordingLogger`] keeps them in
//! memory for callers (and tests) that want to inspect what happened.

use std::sync::Mutex;

/// Sink for the builder's user-facing messages.
pub trait Logger {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards every message to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "packzip", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "packzip", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "packzip", "{}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
}

/// Collects messages in order. Also forwards them to `tracing` so recorded
/// runs still show up in the normal log output.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().clone()
    }

    /// Messages logged at `level`, in order.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        self.lock().push(LogRecord {
            level,
            message: message.to_string(),
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str) {
        TracingLogger.info(message);
        self.push(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        TracingLogger.warn(message);
        self.push(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        TracingLogger.error(message);
        self.push(Level::Error, message);
    }
}
