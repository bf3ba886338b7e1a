use crate::ui::Ui;
use colored::*;
use std::io::{self, Write};

/// Coloured terminal sink. Every line is prefixed with the provisioner name.
pub struct ConsoleUi {
    prefix: String,
}

impl ConsoleUi {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }
}

impl Default for ConsoleUi {
    fn default() -> Self {
        Self::new("shell-local")
    }
}

impl ConsoleUi {
    /// Announcement line: `==> prefix: message`.
    pub fn announcement(&self, message: &str) -> String {
        format!("==> {}: {}", self.prefix, message)
    }

    /// Output and error line: `    prefix: message`.
    pub fn detail(&self, message: &str) -> String {
        format!("    {}: {}", self.prefix, message)
    }
}

impl Ui for ConsoleUi {
    fn say(&self, message: &str) {
        let _ = writeln!(io::stdout().lock(), "{}", self.announcement(message).bold());
    }

    fn message(&self, message: &str) {
        let _ = writeln!(io::stdout().lock(), "{}", self.detail(message));
    }

    fn error(&self, message: &str) {
        // stderr keeps error lines out of piped stdout
        let _ = writeln!(io::stderr().lock(), "{}", self.detail(message).red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_lines_are_not_announcements() {
        let ui = ConsoleUi::new("shell-local");
        assert_eq!(ui.announcement("Executing local command: ls"), "==> shell-local: Executing local command: ls");
        assert_eq!(ui.detail("oops"), "    shell-local: oops");
        assert!(!ui.detail("oops").starts_with("==>"));
    }
}
