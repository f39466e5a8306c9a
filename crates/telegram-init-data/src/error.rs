//! Init data verification errors.

use thiserror::Error;

/// Reasons an init data string was rejected.
///
/// The variants exist for logging. Callers facing a remote client should
/// collapse all of them into a single "invalid" answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InitDataError {
    #[error("Malformed init data: {0}")]
    MalformedInput(String),

    #[error("Init data has no hash field")]
    MissingHash,

    #[error("Init data hash mismatch")]
    HashMismatch,

    #[error("Malformed user payload: {0}")]
    MalformedUserPayload(String),

    #[error("Init data expired ({age_secs}s old)")]
    Expired { age_secs: i64 },
}
