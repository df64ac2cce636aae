//! Session configuration
//!
//! # Example
//!
//! ```rust
//! use ccli::Config;
//!
//! let config = Config::new()
//!     .with_history_max(1000)
//!     .with_page_scroll(10)
//!     .with_command_delimiter(";");
//! assert_eq!(config.history_max, 1000);
//! ```

use crate::history::DEFAULT_HISTORY_MAX;

/// Number of history entries Page Up and Page Down move by.
pub const DEFAULT_PAGE_SCROLL: usize = 24;

/// Prompt shown on the physical lines of a backslash-continued line.
pub const DEFAULT_CONTINUATION_PROMPT: &str = "> ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of history entries kept.
    pub history_max: usize,

    /// History entries moved per Page Up / Page Down.
    pub page_scroll: usize,

    pub continuation_prompt: String,

    /// Separator between several commands on one line (e.g. `;`).
    pub command_delimiter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_max: DEFAULT_HISTORY_MAX,
            page_scroll: DEFAULT_PAGE_SCROLL,
            continuation_prompt: DEFAULT_CONTINUATION_PROMPT.to_string(),
            command_delimiter: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Set the history capacity (builder pattern)
    pub fn with_history_max(mut self, max: usize) -> Self {
        self.history_max = max;
        self
    }

    pub fn with_page_scroll(mut self, lines: usize) -> Self {
        self.page_scroll = lines;
        self
    }

    pub fn with_continuation_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.continuation_prompt = prompt.into();
        self
    }

    /// Split submitted lines into several commands at `delimiter`
    pub fn with_command_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.command_delimiter = Some(delimiter.into());
        self
    }
}
