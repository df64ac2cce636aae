//! ccli: an embeddable readline-style command line
//!
//! A [`Session`] puts a terminal (or any [`Console`]) into raw mode and runs
//! an editing loop: keys are decoded into [`Key`]s, the line is edited and
//! redrawn in place, Up/Down browse history, Ctrl-R searches it, and Tab
//! completes words through registered callbacks. A submitted line is split
//! into words with shell-like quoting and handed to the command registered
//! for its first word.
//!
//! ```no_run
//! use ccli::{FdConsole, Flow, Session};
//! use std::fmt::Write as _;
//!
//! let console = FdConsole::stdio()?;
//! let mut session = Session::new(console, "demo> ")?;
//! session.register_command("hello", |s, inv| {
//!     let _ = writeln!(s, "hello {}", inv.arg(1).unwrap_or("world"));
//!     Flow::Continue
//! })?;
//! session.run()?;
//! # Ok::<(), ccli::CliError>(())
//! ```
//!
//! # Modules
//!
//! - `words`: quote-aware word splitting and command delimiters
//! - `line`: the editable line buffer
//! - `input`: escape sequence decoding and read-ahead
//! - `history`: the history ring with per-entry edits
//! - `command` / `table`: command registry, dispatch and subcommand trees
//! - `complete`: tab completion and candidate listing
//! - `render`: redraw frames
//! - `editor`: the interactive loop and reverse search
//! - `cache`: saving history and aliases between runs
//! - `term`: consoles (file descriptors, scripted input for tests)

pub mod alias;
pub mod cache;
pub mod command;
pub mod complete;
pub mod config;
mod editor;
pub mod error;
pub mod history;
pub mod input;
pub mod line;
pub mod render;
pub mod session;
pub mod table;
pub mod term;
pub mod words;

pub use alias::Aliases;
pub use command::{CompletionRequest, Flow, Invocation};
pub use complete::Candidates;
pub use config::Config;
pub use error::{CliError, Result};
pub use history::History;
pub use input::Key;
pub use line::LineBuffer;
pub use session::Session;
pub use table::{CommandTable, CompletionTable};
pub use term::{Console, FdConsole, ScriptedConsole, Transcript, WindowSize};
pub use words::{split_command, split_words};
