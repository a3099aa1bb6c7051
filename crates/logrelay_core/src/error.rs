// error.rs: error types shared by the relay pipeline
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Rejection of a single input line. Never fatal; the pump skips the line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed line: expected at least {expected} '|'-separated fields, got {fields}")]
    Malformed { fields: usize, expected: usize },
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{context} ({}): {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("SALT is not set; refusing to pseudonymize without a secret (set fallback_salt_allowed for low-assurance mode)")]
    MissingSecret,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    #[error("failed to spawn rotation watcher: {0}")]
    Spawn(#[source] io::Error),
}

impl RelayError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        RelayError::Io { context, path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
