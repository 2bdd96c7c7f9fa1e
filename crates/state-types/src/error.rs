use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid state id {id:?}: {reason}")]
    InvalidStateId { id: String, reason: String },

    #[error("state document must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
