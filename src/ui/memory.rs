use crate::ui::Ui;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiLevel {
    Say,
    Message,
    Error,
}

/// Sink that records every line, for tests and embedding hosts.
#[derive(Debug, Default)]
pub struct MemoryUi {
    lines: Mutex<Vec<(UiLevel, String)>>,
}

impl MemoryUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(UiLevel, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Lines recorded at one level, in order.
    pub fn at(&self, level: UiLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, text)| text)
            .collect()
    }

    fn push(&self, level: UiLevel, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}

impl Ui for MemoryUi {
    fn say(&self, message: &str) {
        self.push(UiLevel::Say, message);
    }

    fn message(&self, message: &str) {
        self.push(UiLevel::Message, message);
    }

    fn error(&self, message: &str) {
        self.push(UiLevel::Error, message);
    }
}
