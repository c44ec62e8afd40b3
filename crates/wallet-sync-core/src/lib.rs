//! State synchronization between an injected browser wallet provider and a
//! consuming application.
//!
//! The crate tracks connection status, current account and chain id, exposes
//! the imperative wallet operations (connect, chain management, transaction
//! submission) and keeps the state consistent with asynchronously fired
//! provider events. The provider itself stays behind [`ports::ProviderPort`]
//! so sessions can be driven against any capability object, injected browser
//! wallet or test double alike.

pub mod detect;
pub mod dispatch;
pub mod error;
pub mod ports;
pub mod reducer;
pub mod session;
pub mod state;
pub mod tx;

pub use detect::{detect_provider, require_provider, InjectedWallet};
pub use dispatch::SafeDispatcher;
pub use error::WalletError;
pub use ports::{
    CalldataError, CalldataPort, EventListener, ProviderError, ProviderEventKind, ProviderPort,
    SubscriptionId, REQUEST_PENDING_CODE,
};
pub use reducer::{reduce, WalletEvent};
pub use session::{SessionConfig, WalletSession, WalletSigner};
pub use state::{WalletState, WalletStatus};
pub use tx::{AddChainParams, ContractCall, NativeCurrency, TransactionRequest, TransferRequest};
