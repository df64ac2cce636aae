//! Error types for the command line.

use thiserror::Error;

/// Errors returned by registration, editing and persistence operations.
///
/// Input mistakes made by the user at the prompt (unknown commands, odd
/// quoting) are never errors; they are reported on the console and the
/// loop keeps going.
#[derive(Debug, Error)]
pub enum CliError {
    /// A buffer or list could not grow.
    #[error("out of memory")]
    OutOfMemory,

    /// An argument was rejected before any state changed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The named command (or alias) is not registered.
    #[error("not found: {0}")]
    NotFound(String),

    /// A command or completion table failed structural validation.
    #[error("malformed table: {0}")]
    MalformedTable(String),

    /// A cache file section could not be understood.
    #[error("corrupt cache: {0}")]
    CorruptCache(String),

    /// Neither `XDG_CACHE_HOME` nor a home directory is available.
    #[error("no cache directory available")]
    NoCacheDir,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<std::collections::TryReserveError> for CliError {
    fn from(_: std::collections::TryReserveError) -> Self {
        CliError::OutOfMemory
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
