use thiserror::Error;

use state_codec::CodecError;
use state_store::StoreError;
use state_types::TypeError;

/// Errors from pipeline construction and the save/load paths.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The payload is not a JSON object. Caller error.
    #[error("invalid state document: {0}")]
    Parse(#[from] TypeError),

    /// The stored payload could not be decoded. Indicates storage corruption.
    #[error("corrupt stored state: {0}")]
    Codec(#[from] CodecError),

    #[error("identifier allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("state not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// `true` when the failure is attributable to the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("no free identifier after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("existence probe failed: {0}")]
    Store(#[from] StoreError),

    #[error("generated identifier rejected: {0}")]
    Candidate(#[from] TypeError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
