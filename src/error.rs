//! Error types for pipeline construction and execution

use thiserror::Error;

/// Boxed error raised by a user callback (map, filter, comparator, reduce).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building or executing a pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// A map transform, filter predicate, comparator or reduce function failed.
    ///
    /// The original error is kept as the source and can be downcast.
    #[error("callback failed: {0}")]
    Callback(#[source] BoxError),

    /// A source adapter was built over a handle of the wrong kind.
    #[error("invalid source: expected {expected:?}, got {found:?}")]
    InvalidSource { expected: String, found: String },

    /// A single-pass source was asked to iterate a second time.
    #[error("source already consumed")]
    SourceConsumed,

    /// A stateful source was asked for a cursor while another one is still open.
    #[error("source is being iterated by another execution")]
    SourceBusy,

    /// Driver text could not be converted to its column type.
    #[error("cannot coerce column {column:?} ({column_type}) value {value:?}: {reason}")]
    Coercion {
        column: String,
        column_type: String,
        value: String,
        reason: String,
    },

    /// The underlying result handle failed to produce a row.
    #[error("driver error: {0}")]
    Driver(String),
}

impl Error {
    /// Wrap a callback failure.
    pub fn callback<E: Into<BoxError>>(err: E) -> Self {
        Error::Callback(err.into())
    }

    /// Borrow the original callback error, if this is a callback failure.
    pub fn callback_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Error::Callback(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
