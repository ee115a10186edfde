use std::sync::{Arc, Mutex};
use std::time::Duration;

use localplugin::plugin::LogSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub machine: String,
    pub line: String,
}

/// A sink that remembers every record it receives.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Lines recorded at INFO (stdout), in arrival order.
    pub fn infos(&self) -> Vec<String> {
        self.lines_at(Level::Info)
    }

    /// Lines recorded at DEBUG (stderr), in arrival order.
    pub fn debugs(&self) -> Vec<String> {
        self.lines_at(Level::Debug)
    }

    fn lines_at(&self, level: Level) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .map(|r| r.line)
            .collect()
    }

    /// Poll until at least `n` records arrived.
    pub async fn wait_for_len(&self, n: usize) {
        while self.records.lock().unwrap().len() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn push(&self, level: Level, machine: &str, line: &str) {
        self.records.lock().unwrap().push(LogRecord {
            level,
            machine: machine.to_string(),
            line: line.to_string(),
        });
    }
}

impl LogSink for RecordingSink {
    fn info(&self, machine: &str, line: &str) {
        self.push(Level::Info, machine, line);
    }

    fn debug(&self, machine: &str, line: &str) {
        self.push(Level::Debug, machine, line);
    }
}
