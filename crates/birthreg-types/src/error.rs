use thiserror::Error;

/// Errors produced while encoding or decoding stored values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("encoding error: {0}")]
    Encode(String),

    #[error("decoding error: {0}")]
    Decode(String),

    #[error("timestamp out of range: {seconds}s {nanos}ns")]
    InvalidTimestamp { seconds: i64, nanos: i32 },
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
