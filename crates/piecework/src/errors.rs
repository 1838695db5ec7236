//! # Error Types

/// Errors from piecework operations.
#[derive(Debug, thiserror::Error)]
pub enum PieceworkError {
    /// Caller misconfiguration (vocab target size, sampling threshold, etc).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A token string looked up explicitly was absent from the vocabulary.
    ///
    /// Ordinary text encoding never produces this; unknown words degrade
    /// to the UNK token instead.
    #[error("unknown token: {token:?}")]
    UnknownToken {
        /// The token string that was looked up.
        token: String,
    },

    /// A token id outside the vocabulary range.
    #[error("token id {id} out of range for vocabulary of {size}")]
    TokenOutOfRange {
        /// The offending token id.
        id: usize,
        /// The vocabulary size.
        size: usize,
    },

    /// The external model violated the probability-distribution contract.
    #[error("generation contract violation: {0}")]
    Generation(String),

    /// I/O error from vocabulary file handling.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed vocabulary data.
    #[error("vocab parse error: {0}")]
    Parse(String),
}

/// Result type for piecework operations.
pub type PwResult<T> = core::result::Result<T, PieceworkError>;
