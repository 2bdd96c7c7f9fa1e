use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("stored payload is empty")]
    Empty,

    #[error("compression failed: {0}")]
    Compress(String),

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("corrupt attribution frame: {0}")]
    Attribution(String),
}

pub type CodecResult<T> = Result<T, CodecError>;
