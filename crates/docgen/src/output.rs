//! Colored terminal output utilities.

use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print the availability of an external tool.
    ///
    /// Missing required tools are shown in red, missing optional ones in yellow.
    pub(crate) fn tool_status(&self, name: &str, program: &str, available: bool, required: bool) {
        let mark = if available { "ok" } else { "missing" };
        let line = format!("{name:<12} {mark:<8} {program}");
        let style = match (available, required) {
            (true, _) => &self.green,
            (false, false) => &self.yellow,
            (false, true) => &self.red,
        };
        let _ = self.term.write_line(&style.apply_to(line).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }
}
