use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::path::Path;

const MAX_LINES: usize = 2000;

/// Timestamped lines shown in the Play tab log box
#[derive(Debug, Default)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    text: String,
    dirty: bool,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl AsRef<str>) {
        self.push_at(Local::now(), message);
    }

    pub fn push_at(&mut self, at: DateTime<Local>, message: impl AsRef<str>) {
        let stamp = at.format("%H:%M:%S");
        for line in message.as_ref().lines() {
            self.lines.push_back(format!("[{}] {}", stamp, line));
        }
        while self.lines.len() > MAX_LINES {
            self.lines.pop_front();
        }
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.text.clear();
        self.dirty = false;
    }

    /// Joined contents, rebuilt only after a change
    pub fn text(&mut self) -> &str {
        if self.dirty {
            self.text = self.lines.iter().cloned().collect::<Vec<_>>().join("\n");
            self.dirty = false;
        }
        &self.text
    }

    pub fn export_to(&mut self, path: &Path) -> Result<()> {
        let mut contents = self.text().to_string();
        contents.push('\n');
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write log to {}", path.display()))
    }
}
