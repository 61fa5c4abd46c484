//! Command line parsing
//!
//! A command line has the shape `NAME ^ TARGET [^ PARAM]*`. Everything from the
//! first `//` to end of line is a comment. Blank and comment-only lines parse
//! to nothing; malformed lines are logged and also parse to nothing.

use tracing::warn;

/// Field separator between name, target and parameters
pub const FIELD_SEPARATOR: char = '^';

/// Start of a line comment
pub const COMMENT_MARKER: &str = "//";

/// One parsed instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub target: String,
    /// Positional; meaning depends on the command
    pub parameters: Vec<String>,
    /// Trimmed line with the comment removed
    pub raw_text: String,
    /// Captured result, set by handlers that produce one
    pub output: Option<String>,
}

impl Command {
    /// Parse one raw line.
    ///
    /// Returns `None` for blank lines, comment-only lines, and lines with fewer
    /// than two non-empty fields. Never panics on malformed input.
    pub fn parse(line: &str) -> Option<Command> {
        if line.trim().is_empty() {
            return None;
        }

        let code = match line.find(COMMENT_MARKER) {
            Some(index) => &line[..index],
            None => line,
        };

        let raw_text = code.trim();
        if raw_text.is_empty() {
            return None;
        }

        let mut fields = raw_text
            .split(FIELD_SEPARATOR)
            .map(str::trim)
            .filter(|field| !field.is_empty());

        let (name, target) = match (fields.next(), fields.next()) {
            (Some(name), Some(target)) => (name, target),
            _ => {
                warn!("Malformed command line (need NAME ^ TARGET): '{}'", raw_text);
                return None;
            }
        };

        Some(Command {
            name: name.to_string(),
            target: target.to_string(),
            parameters: fields.map(str::to_string).collect(),
            raw_text: raw_text.to_string(),
            output: None,
        })
    }

    /// Positional parameter, if present
    pub fn parameter(&self, index: usize) -> Option<&str> {
        self.parameters.get(index).map(String::as_str)
    }
}
