//! Connection state of a wallet session.

/// Status tag of the connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletStatus {
    Initializing,
    Unavailable,
    NotConnected,
    Connecting,
    Connected,
}

impl WalletStatus {
    /// A compatible provider has been confirmed and initial synchronization
    /// has finished.
    pub fn is_available(self) -> bool {
        match self {
            WalletStatus::Initializing | WalletStatus::Unavailable => false,
            WalletStatus::NotConnected | WalletStatus::Connecting | WalletStatus::Connected => true,
        }
    }
}

/// Connection state, replaced wholesale on every transition.
///
/// [`crate::reducer::reduce`] is the only mutation path. The account is
/// carried exactly in `Connected`; the chain id exactly outside
/// `Initializing`/`Unavailable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletState {
    /// Startup, the provider is being queried.
    Initializing,
    /// No compatible provider was found.
    Unavailable,
    /// Provider present, no account granted.
    NotConnected { chain_id: String },
    /// Account request in flight.
    Connecting { chain_id: String },
    /// Account granted, chain known.
    Connected { account: String, chain_id: String },
}

impl WalletState {
    pub fn status(&self) -> WalletStatus {
        match self {
            WalletState::Initializing => WalletStatus::Initializing,
            WalletState::Unavailable => WalletStatus::Unavailable,
            WalletState::NotConnected { .. } => WalletStatus::NotConnected,
            WalletState::Connecting { .. } => WalletStatus::Connecting,
            WalletState::Connected { .. } => WalletStatus::Connected,
        }
    }

    pub fn account(&self) -> Option<&str> {
        match self {
            WalletState::Connected { account, .. } => Some(account),
            WalletState::Initializing
            | WalletState::Unavailable
            | WalletState::NotConnected { .. }
            | WalletState::Connecting { .. } => None,
        }
    }

    pub fn chain_id(&self) -> Option<&str> {
        match self {
            WalletState::NotConnected { chain_id }
            | WalletState::Connecting { chain_id }
            | WalletState::Connected { chain_id, .. } => Some(chain_id),
            WalletState::Initializing | WalletState::Unavailable => None,
        }
    }
}

impl Default for WalletState {
    fn default() -> Self {
        WalletState::Initializing
    }
}
