//! The build console: lines the user sees in the output of the build that
//! triggered a notification.

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct BuildConsole {
    lines: Vec<String>,
}

impl BuildConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn println(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whole console as one string
    pub fn output(&self) -> String {
        self.lines.join("\n")
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }
}
