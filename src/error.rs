//! Error taxonomy shared by every core operation.
//!
//! Each failure carries a stable `(kind, message)` pair so the HTTP layer can
//! map it to a status code without inspecting strings.

use rusqlite::ffi;
use serde::Serialize;
use thiserror::Error;

/// Stable classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    Unauthorized,
    StoreFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::StoreFailure => "store_failure",
        }
    }
}

/// Errors produced by the core.
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated, e.g. two racing toggles.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller identity is missing, invalid, or not allowed to act.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The underlying store failed.
    #[error("store failure: {0}")]
    StoreFailure(String),
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Error::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Error::Unauthorized(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::StoreFailure(_) => ErrorKind::StoreFailure,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::InvalidInput(msg)
            | Error::NotFound(msg)
            | Error::Conflict(msg)
            | Error::Unauthorized(msg)
            | Error::StoreFailure(msg) => msg,
        }
    }

    /// Only a lost toggle race may be re-issued by the caller; everything
    /// else would fail the same way again or risk a double write.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

/// Classifies SQLite constraint failures so a racing writer sees `Conflict`
/// and a write against a concurrently deleted parent sees `NotFound`.
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        let extended = err.sqlite_error().map(|e| e.extended_code);
        match extended {
            Some(ffi::SQLITE_CONSTRAINT_UNIQUE) | Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY) => {
                Error::Conflict(err.to_string())
            }
            Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                Error::NotFound("referenced record no longer exists".to_string())
            }
            Some(ffi::SQLITE_CONSTRAINT_CHECK) | Some(ffi::SQLITE_CONSTRAINT_NOTNULL) => {
                Error::InvalidInput(err.to_string())
            }
            _ => Error::StoreFailure(err.to_string()),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
