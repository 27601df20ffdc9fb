//! Errors reported by the pasta bowl.
//!
//! "Not found" is deliberately absent: a missing pasta is an empty lookup
//! result, and deleting one is a no-op.

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BowlError>;

/// Errors that can occur while operating on a [`Bowl`](crate::Bowl).
#[derive(Debug, Error)]
pub enum BowlError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("pasta id already in use: {0}")]
    DuplicateIdentifier(String),

    #[error("corrupt metadata record for pasta {id}: {source}")]
    CorruptRecord {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid pasta id: {0:?}")]
    InvalidIdentifier(String),

    #[error("pasta bowl is in read-only mode")]
    ReadOnly,

    #[error("invalid bowl configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("could not allocate a free pasta id after {attempts} attempts")]
    IdSpaceExhausted { attempts: usize },
}

impl BowlError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True when this is an I/O error caused by something not existing,
    /// e.g. opening a reader for a pasta that was never inserted.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Attach a short description to raw I/O errors, the way `anyhow::Context` would.
pub(crate) trait IoContext<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| BowlError::io(context, e))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| BowlError::io(f(), e))
    }
}
