//! Operation-facing error taxonomy.

use thiserror::Error;

use crate::ports::{CalldataError, ProviderError};

#[derive(Debug, Error)]
pub enum WalletError {
    /// The session has no usable provider or is still synchronizing.
    /// Distinct from provider failures: the wallet was never contacted.
    #[error("wallet provider is not available or still synchronizing")]
    Unavailable,
    /// A provider was required at a call site where absence is a programming
    /// error rather than an expected runtime state.
    #[error("wallet provider must be present in order to use this method")]
    ProviderRequired,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Calldata(#[from] CalldataError),
    #[error("invalid request parameters: {0}")]
    InvalidParams(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}
