//! Scriptable in-process provider for driving sessions in tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Value};

use wallet_sync_core::{
    EventListener, ProviderError, ProviderEventKind, ProviderPort, SubscriptionId,
};

struct MockState {
    accounts: Vec<String>,
    chain_id: String,
    /// One-shot error answered to the next `eth_requestAccounts`.
    request_accounts_error: Option<(i64, String)>,
    /// One-shot error answered to the next chain management request.
    chain_request_error: Option<(i64, String)>,
    /// Number of `eth_accounts` polls answered empty before the scripted
    /// accounts come back. Models a dialog the user has not approved yet.
    empty_account_polls: u64,
    transaction_hash: String,
    request_log: Vec<(String, Value)>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            chain_id: "0x1".to_owned(),
            request_accounts_error: None,
            chain_request_error: None,
            empty_account_polls: 0,
            transaction_hash:
                "0x1111111111111111111111111111111111111111111111111111111111111111".to_owned(),
            request_log: Vec::new(),
        }
    }
}

/// Fully scripted wallet provider. Requests answer from scripted state and
/// events are fired manually through the `emit_*` methods, so tests control
/// ordering precisely.
pub struct MockProvider {
    metamask: bool,
    brave_wallet: bool,
    state: Mutex<MockState>,
    listeners: Mutex<HashMap<(ProviderEventKind, SubscriptionId), EventListener>>,
    next_subscription: AtomicU64,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_flags(true, false)
    }

    pub fn with_flags(metamask: bool, brave_wallet: bool) -> Self {
        Self {
            metamask,
            brave_wallet,
            state: Mutex::new(MockState::default()),
            listeners: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    pub fn set_accounts(&self, accounts: Vec<String>) {
        self.lock_state().accounts = accounts;
    }

    pub fn set_chain_id(&self, chain_id: impl Into<String>) {
        self.lock_state().chain_id = chain_id.into();
    }

    pub fn set_transaction_hash(&self, hash: impl Into<String>) {
        self.lock_state().transaction_hash = hash.into();
    }

    /// Scripts the next `eth_requestAccounts` answer as an error.
    pub fn script_request_accounts_error(&self, code: i64, message: impl Into<String>) {
        self.lock_state().request_accounts_error = Some((code, message.into()));
    }

    /// Scripts the next chain add/switch answer as an error.
    pub fn script_chain_request_error(&self, code: i64, message: impl Into<String>) {
        self.lock_state().chain_request_error = Some((code, message.into()));
    }

    /// The next `count` `eth_accounts` requests answer an empty list before
    /// the scripted accounts become visible.
    pub fn set_empty_account_polls(&self, count: u64) {
        self.lock_state().empty_account_polls = count;
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.lock_state().request_log.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.lock_listeners().len()
    }

    /// Fires `accountsChanged` at every registered listener.
    pub fn emit_accounts_changed(&self, accounts: Vec<String>) {
        self.lock_state().accounts = accounts.clone();
        self.emit(ProviderEventKind::AccountsChanged, json!(accounts));
    }

    /// Fires `chainChanged` at every registered listener.
    pub fn emit_chain_changed(&self, chain_id: impl Into<String>) {
        let chain_id = chain_id.into();
        self.lock_state().chain_id = chain_id.clone();
        self.emit(ProviderEventKind::ChainChanged, json!(chain_id));
    }

    fn emit(&self, kind: ProviderEventKind, payload: Value) {
        // Collect outside the lock so listeners may resubscribe reentrantly.
        let targets: Vec<EventListener> = self
            .lock_listeners()
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in targets {
            listener(payload.clone());
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_listeners(
        &self,
    ) -> MutexGuard<'_, HashMap<(ProviderEventKind, SubscriptionId), EventListener>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn answer(&self, method: &str, params: &Value) -> Result<Value, ProviderError> {
        let mut state = self.lock_state();
        state.request_log.push((method.to_owned(), params.clone()));
        match method {
            "eth_chainId" => Ok(json!(state.chain_id)),
            "eth_accounts" => {
                if state.empty_account_polls > 0 {
                    state.empty_account_polls -= 1;
                    Ok(json!([]))
                } else {
                    Ok(json!(state.accounts))
                }
            }
            "eth_requestAccounts" => match state.request_accounts_error.take() {
                Some((code, message)) => Err(ProviderError::Rpc { code, message }),
                None => Ok(json!(state.accounts)),
            },
            "wallet_addEthereumChain" | "wallet_switchEthereumChain" => {
                match state.chain_request_error.take() {
                    Some((code, message)) => Err(ProviderError::Rpc { code, message }),
                    None => Ok(Value::Null),
                }
            }
            "eth_sendTransaction" => Ok(json!(state.transaction_hash)),
            other => Err(ProviderError::Transport(format!(
                "mock provider has no answer for {other}"
            ))),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderPort for MockProvider {
    fn request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, ProviderError>> + Send {
        let outcome = self.answer(method, &params);
        async move { outcome }
    }

    fn subscribe(&self, kind: ProviderEventKind, listener: EventListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.lock_listeners().insert((kind, id), listener);
        id
    }

    fn unsubscribe(&self, kind: ProviderEventKind, id: SubscriptionId) {
        self.lock_listeners().remove(&(kind, id));
    }

    fn is_metamask(&self) -> bool {
        self.metamask
    }

    fn is_brave_wallet(&self) -> bool {
        self.brave_wallet
    }
}
