//! Error types for the swap engine

use thiserror::Error;

use crate::chain::ChainError;

/// Main error type for swap operations
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("atomic swap is not supported for {0}")]
    UnsupportedCoin(String),

    #[error("malformed handshake message: {0}")]
    MalformedMessage(String),

    #[error("chain operation failed: {0}")]
    Chain(#[from] ChainError),

    #[error("swap {0} not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid amount or rate: {0}")]
    InvalidAmount(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SwapError {
    /// Check if the failed operation can be retried on the next sweep.
    ///
    /// A chain failure never advances swap state, so the same transition is
    /// re-attempted by `process_next`; everything else is fatal to the call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SwapError::Chain(_))
    }
}

/// Result type for swap operations
pub type SwapResult<T> = Result<T, SwapError>;
