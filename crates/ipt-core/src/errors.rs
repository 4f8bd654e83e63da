use std::time::Duration;

/// Core error type.
///
/// Adapter crates map their specific errors into this type so the loop can tell
/// user-facing validation failures apart from retryable I/O failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid tracking number: {0}")]
    InvalidTrackingNumber(String),

    #[error("unknown status: {0}")]
    UnknownStatus(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("delivery error: {0}")]
    Delivery(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Store(_)
                | Error::Delivery(_)
                | Error::Timeout(_)
                | Error::Io(_)
                | Error::External(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
