//! Port traits over the injected wallet provider.

use std::future::Future;
use std::sync::Arc;

use alloy::primitives::Bytes;
use serde_json::Value;
use thiserror::Error;

/// JSON-RPC error code a wallet returns while an equivalent request is
/// still awaiting user action.
pub const REQUEST_PENDING_CODE: i64 = -32002;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Error surfaced by the provider itself, with its JSON-RPC code.
    #[error("provider rejected request: {message} (code {code})")]
    Rpc { code: i64, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// `true` when the wallet reported that an equivalent request is already
    /// pending user action; such failures are absorbed, not propagated.
    pub fn is_request_pending(&self) -> bool {
        matches!(
            self,
            ProviderError::Rpc {
                code: REQUEST_PENDING_CODE,
                ..
            }
        )
    }
}

/// Provider event streams a session can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEventKind {
    AccountsChanged,
    ChainChanged,
}

impl ProviderEventKind {
    /// Event name on the provider's wire surface.
    pub fn wire_name(self) -> &'static str {
        match self {
            ProviderEventKind::AccountsChanged => "accountsChanged",
            ProviderEventKind::ChainChanged => "chainChanged",
        }
    }
}

/// Callback registered with a provider event stream. Payloads arrive as raw
/// wire values and are normalized by the subscriber.
pub type EventListener = Arc<dyn Fn(Value) + Send + Sync + 'static>;

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Capability surface of an injected wallet provider.
///
/// Request futures must be `Send` so sessions can be driven from spawned
/// tasks.
pub trait ProviderPort: Send + Sync + 'static {
    /// Submits a JSON-RPC request to the wallet.
    fn request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, ProviderError>> + Send;

    /// Registers `listener` for `kind` events and returns its handle.
    fn subscribe(&self, kind: ProviderEventKind, listener: EventListener) -> SubscriptionId;

    /// Removes a previously registered listener. Unknown handles are ignored.
    fn unsubscribe(&self, kind: ProviderEventKind, id: SubscriptionId);

    /// Flag identifying the target wallet extension.
    fn is_metamask(&self) -> bool;

    /// Flag set by the competing wallet skin that ships the same flag
    /// surface.
    fn is_brave_wallet(&self) -> bool;
}

/// Encodes a contract method call into transaction calldata.
pub trait CalldataPort: Send + Sync + 'static {
    fn encode_call(
        &self,
        abi_json: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Bytes, CalldataError>;
}

#[derive(Debug, Error)]
pub enum CalldataError {
    #[error("invalid abi json: {0}")]
    InvalidAbi(String),
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error("argument error: {0}")]
    Argument(String),
    #[error("abi encoding failed: {0}")]
    Encoding(String),
}
