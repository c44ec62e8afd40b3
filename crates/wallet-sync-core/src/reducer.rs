//! Pure transition function over [`WalletState`].

use crate::state::WalletState;

/// Events produced by synchronization, the event subscriptions and the
/// connect flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// No compatible provider could be found.
    Unavailable,
    /// An account request went out to the wallet.
    Connecting,
    /// The user refused the pending account request.
    PermissionRejected,
    /// Provider confirmed, no account authorized.
    NotConnected { chain_id: String },
    /// Accounts granted. Callers must not dispatch this with an empty
    /// account list.
    Connected { accounts: Vec<String>, chain_id: String },
    /// The wallet switched its selected accounts.
    AccountsChanged { accounts: Vec<String> },
    /// The wallet switched networks.
    ChainChanged { chain_id: String },
}

impl WalletEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WalletEvent::Unavailable => "unavailable",
            WalletEvent::Connecting => "connecting",
            WalletEvent::PermissionRejected => "permission_rejected",
            WalletEvent::NotConnected { .. } => "not_connected",
            WalletEvent::Connected { .. } => "connected",
            WalletEvent::AccountsChanged { .. } => "accounts_changed",
            WalletEvent::ChainChanged { .. } => "chain_changed",
        }
    }
}

/// Applies `event` to `state` and returns the next state.
///
/// Total over every state/event pair: illegal transitions hand the input
/// state back unchanged and emit a single warning naming the rejected event
/// and the current status. Matches are exhaustive on purpose so a new
/// variant forces review of every transition.
pub fn reduce(state: WalletState, event: WalletEvent) -> WalletState {
    let event_name = event.name();
    match event {
        WalletEvent::Unavailable => match state {
            WalletState::Initializing
            | WalletState::Unavailable
            | WalletState::NotConnected { .. }
            | WalletState::Connecting { .. }
            | WalletState::Connected { .. } => WalletState::Unavailable,
        },
        WalletEvent::Connecting => match state {
            WalletState::NotConnected { chain_id } => WalletState::Connecting { chain_id },
            WalletState::Initializing
            | WalletState::Unavailable
            | WalletState::Connecting { .. }
            | WalletState::Connected { .. } => rejected(state, event_name),
        },
        WalletEvent::PermissionRejected => match state {
            WalletState::Connecting { chain_id } => WalletState::NotConnected { chain_id },
            WalletState::Initializing
            | WalletState::Unavailable
            | WalletState::NotConnected { .. }
            | WalletState::Connected { .. } => rejected(state, event_name),
        },
        WalletEvent::NotConnected { chain_id } => match state {
            WalletState::Initializing | WalletState::Unavailable => {
                WalletState::NotConnected { chain_id }
            }
            WalletState::NotConnected { .. }
            | WalletState::Connecting { .. }
            | WalletState::Connected { .. } => rejected(state, event_name),
        },
        WalletEvent::Connected { accounts, chain_id } => match accounts.into_iter().next() {
            Some(account) => match state {
                WalletState::Initializing
                | WalletState::Unavailable
                | WalletState::NotConnected { .. }
                | WalletState::Connecting { .. }
                | WalletState::Connected { .. } => WalletState::Connected { account, chain_id },
            },
            // Non-empty accounts is a caller contract; totalize the breach
            // as a rejection instead of panicking.
            None => rejected(state, event_name),
        },
        WalletEvent::AccountsChanged { accounts } => match state {
            WalletState::Connected { account, chain_id } => match accounts.into_iter().next() {
                Some(next_account) => WalletState::Connected {
                    account: next_account,
                    chain_id,
                },
                // An empty payload leaves the session connected; the wallet
                // emits it while locked. The subscription layer filters
                // these out before dispatch, the reducer mirrors that.
                None => {
                    tracing::debug!("accounts_changed carried no accounts; keeping connection");
                    WalletState::Connected { account, chain_id }
                }
            },
            WalletState::Initializing
            | WalletState::Unavailable
            | WalletState::NotConnected { .. }
            | WalletState::Connecting { .. } => rejected(state, event_name),
        },
        WalletEvent::ChainChanged { chain_id } => match state {
            WalletState::NotConnected { .. } => WalletState::NotConnected { chain_id },
            WalletState::Connecting { .. } => WalletState::Connecting { chain_id },
            WalletState::Connected { account, .. } => WalletState::Connected { account, chain_id },
            WalletState::Initializing | WalletState::Unavailable => rejected(state, event_name),
        },
    }
}

fn rejected(state: WalletState, event: &'static str) -> WalletState {
    tracing::warn!(
        status = ?state.status(),
        event,
        "rejected illegal wallet state transition"
    );
    state
}
