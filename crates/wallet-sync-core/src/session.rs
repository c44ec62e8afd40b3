//! Wallet session facade: owns the state, drives synchronization and the
//! provider event subscriptions, and exposes the imperative wallet
//! operations.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alloy::primitives::B256;
use serde_json::{json, Value};
use tokio::pin;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{self, MissedTickBehavior};

use crate::detect::{detect_provider, InjectedWallet};
use crate::dispatch::SafeDispatcher;
use crate::error::WalletError;
use crate::ports::{CalldataPort, ProviderEventKind, ProviderPort, SubscriptionId};
use crate::reducer::{reduce, WalletEvent};
use crate::state::{WalletState, WalletStatus};
use crate::tx::{AddChainParams, ContractCall, TransactionRequest, TransferRequest};

/// Tunables of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval of the `eth_accounts` poll that races a pending account
    /// request during [`WalletSession::connect`].
    pub connect_poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_poll_interval: Duration::from_millis(200),
        }
    }
}

impl SessionConfig {
    /// Reads overrides from the environment, falling back to defaults for
    /// unset or malformed variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("WALLET_SYNC_CONNECT_POLL_INTERVAL_MS") {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => config.connect_poll_interval = Duration::from_millis(ms),
                _ => tracing::warn!(
                    %raw,
                    "ignoring malformed WALLET_SYNC_CONNECT_POLL_INTERVAL_MS"
                ),
            }
        }
        config
    }
}

/// Provider event routed through the session pump, tagged with the state the
/// subscription was installed under.
enum WatchedEvent {
    AccountsWhileConnected(Value),
    AccountsWhileNotConnected(Value),
    ChainChanged(Value),
    Shutdown,
}

/// Registered provider listener, removed from the provider on drop.
struct Subscription<P: ProviderPort> {
    provider: Arc<P>,
    kind: ProviderEventKind,
    id: SubscriptionId,
}

impl<P: ProviderPort> Drop for Subscription<P> {
    fn drop(&mut self) {
        self.provider.unsubscribe(self.kind, self.id);
    }
}

/// One slot per conditional subscription. A filled slot stays in place
/// across transitions that keep its condition true, so no listener churn.
struct SubscriptionSlots<P: ProviderPort> {
    accounts_while_connected: Option<Subscription<P>>,
    accounts_while_not_connected: Option<Subscription<P>>,
    chain_changed: Option<Subscription<P>>,
}

impl<P: ProviderPort> SubscriptionSlots<P> {
    fn empty() -> Self {
        Self {
            accounts_while_connected: None,
            accounts_while_not_connected: None,
            chain_changed: None,
        }
    }

    fn clear(&mut self) {
        self.accounts_while_connected = None;
        self.accounts_while_not_connected = None;
        self.chain_changed = None;
    }
}

struct SessionInner<P: ProviderPort, C: CalldataPort> {
    provider: Option<Arc<P>>,
    calldata: C,
    config: SessionConfig,
    state: Mutex<WalletState>,
    dispatcher: SafeDispatcher,
    events_tx: UnboundedSender<WatchedEvent>,
    events_rx: Mutex<Option<UnboundedReceiver<WatchedEvent>>>,
    subscriptions: Mutex<SubscriptionSlots<P>>,
}

/// A running wallet session.
///
/// Cheap to clone; clones share the state, the dispatcher and the event
/// pump. One clone drives [`WalletSession::run`], the others query state and
/// issue operations.
pub struct WalletSession<P: ProviderPort, C: CalldataPort> {
    inner: Arc<SessionInner<P, C>>,
}

impl<P: ProviderPort, C: CalldataPort> Clone for WalletSession<P, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: ProviderPort, C: CalldataPort> WalletSession<P, C> {
    /// Builds a session over the injected wallet object. Provider detection
    /// happens here; synchronization is deferred to [`WalletSession::run`].
    pub fn new(
        injected: Option<&InjectedWallet<P>>,
        calldata: C,
        config: SessionConfig,
    ) -> Self {
        let provider = detect_provider(injected);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(SessionInner {
                provider,
                calldata,
                config,
                state: Mutex::new(WalletState::Initializing),
                dispatcher: SafeDispatcher::new(),
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
                subscriptions: Mutex::new(SubscriptionSlots::empty()),
            }),
        }
    }

    /// Snapshot of the connection state.
    pub fn state(&self) -> WalletState {
        self.lock_state().clone()
    }

    pub fn status(&self) -> WalletStatus {
        self.lock_state().status()
    }

    pub fn account(&self) -> Option<String> {
        self.lock_state().account().map(str::to_owned)
    }

    pub fn chain_id(&self) -> Option<String> {
        self.lock_state().chain_id().map(str::to_owned)
    }

    /// Raw provider handle, exposed once the session has confirmed it. Not
    /// handed out while initializing or unavailable.
    pub fn provider(&self) -> Option<Arc<P>> {
        if self.status().is_available() {
            self.inner.provider.clone()
        } else {
            None
        }
    }

    /// Activates the session, runs initial synchronization and then pumps
    /// provider events until [`WalletSession::shutdown`]. Callbacks fired by
    /// the provider are applied here in arrival order.
    ///
    /// Single-use: the receiver is claimed before anything is activated, so
    /// a repeat call returns without touching state or listeners.
    pub async fn run(&self) {
        let receiver = self
            .inner
            .events_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(mut receiver) = receiver else {
            tracing::warn!("wallet session event pump already taken; run() is single-use");
            return;
        };
        self.start().await;
        while let Some(event) = receiver.recv().await {
            if matches!(event, WatchedEvent::Shutdown) {
                break;
            }
            self.handle_watched(event).await;
        }
    }

    /// Releases the dispatch guard and tears the subscriptions down. Events
    /// already queued behind the shutdown marker are discarded.
    pub fn shutdown(&self) {
        self.inner.dispatcher.release();
        self.lock_subscriptions().clear();
        let _ = self.inner.events_tx.send(WatchedEvent::Shutdown);
    }

    async fn start(&self) {
        self.inner.dispatcher.activate();
        self.synchronize().await;
    }

    /// Queries the provider for its chain and granted accounts and settles
    /// the session out of `Initializing`.
    async fn synchronize(&self) {
        let Some(provider) = self.inner.provider.clone() else {
            self.dispatch(WalletEvent::Unavailable);
            return;
        };
        let chain_id = match request_chain_id(provider.as_ref()).await {
            Ok(chain_id) => chain_id,
            Err(error) => {
                tracing::warn!(%error, "initial chain query failed; marking wallet unavailable");
                self.dispatch(WalletEvent::Unavailable);
                return;
            }
        };
        let accounts = match provider.request("eth_accounts", json!([])).await {
            Ok(payload) => normalize_accounts(&payload).unwrap_or_default(),
            Err(error) => {
                tracing::warn!(%error, "initial account query failed; marking wallet unavailable");
                self.dispatch(WalletEvent::Unavailable);
                return;
            }
        };
        if accounts.is_empty() {
            self.dispatch(WalletEvent::NotConnected { chain_id });
        } else {
            self.dispatch(WalletEvent::Connected { accounts, chain_id });
        }
    }

    /// Applies an event through the reducer, then lines the subscriptions up
    /// with the new state. Dropped outright when the session is not live.
    fn dispatch(&self, event: WalletEvent) {
        if !self.inner.dispatcher.is_live() {
            tracing::debug!(event = event.name(), "dropping event for released session");
            return;
        }
        {
            let mut state = self.lock_state();
            let current = mem::replace(&mut *state, WalletState::Initializing);
            *state = reduce(current, event);
        }
        self.reconcile_subscriptions();
    }

    /// Installs and removes provider listeners so that exactly the
    /// subscriptions warranted by the current status are active:
    /// account changes while connected, account changes (manual
    /// reconnection) while not connected, chain changes whenever a provider
    /// is confirmed.
    fn reconcile_subscriptions(&self) {
        let Some(provider) = self.inner.provider.as_ref() else {
            return;
        };
        let status = self.status();
        let mut slots = self.lock_subscriptions();

        if status == WalletStatus::Connected {
            if slots.accounts_while_connected.is_none() {
                slots.accounts_while_connected = Some(self.watch(
                    provider,
                    ProviderEventKind::AccountsChanged,
                    WatchedEvent::AccountsWhileConnected,
                ));
            }
        } else {
            slots.accounts_while_connected = None;
        }

        if status == WalletStatus::NotConnected {
            if slots.accounts_while_not_connected.is_none() {
                slots.accounts_while_not_connected = Some(self.watch(
                    provider,
                    ProviderEventKind::AccountsChanged,
                    WatchedEvent::AccountsWhileNotConnected,
                ));
            }
        } else {
            slots.accounts_while_not_connected = None;
        }

        if status.is_available() {
            if slots.chain_changed.is_none() {
                slots.chain_changed = Some(self.watch(
                    provider,
                    ProviderEventKind::ChainChanged,
                    WatchedEvent::ChainChanged,
                ));
            }
        } else {
            slots.chain_changed = None;
        }
    }

    fn watch(
        &self,
        provider: &Arc<P>,
        kind: ProviderEventKind,
        wrap: fn(Value) -> WatchedEvent,
    ) -> Subscription<P> {
        let sender = self.inner.events_tx.clone();
        let id = provider.subscribe(
            kind,
            Arc::new(move |payload| {
                let _ = sender.send(wrap(payload));
            }),
        );
        Subscription {
            provider: Arc::clone(provider),
            kind,
            id,
        }
    }

    async fn handle_watched(&self, event: WatchedEvent) {
        match event {
            WatchedEvent::AccountsWhileConnected(payload) => {
                let Some(accounts) = normalize_accounts(&payload) else {
                    tracing::warn!("malformed accounts_changed payload ignored");
                    return;
                };
                // An empty payload means the wallet is locked or mid-switch;
                // the connection is kept until a definitive change arrives.
                if accounts.is_empty() {
                    tracing::debug!("empty accounts_changed payload ignored");
                    return;
                }
                self.dispatch(WalletEvent::AccountsChanged { accounts });
            }
            WatchedEvent::AccountsWhileNotConnected(payload) => {
                let Some(accounts) = normalize_accounts(&payload) else {
                    tracing::warn!("malformed accounts_changed payload ignored");
                    return;
                };
                if accounts.is_empty() {
                    return;
                }
                // Manual reconnection through the wallet UI. The chain may
                // have changed while unsubscribed, refetch it.
                let Some(provider) = self.inner.provider.clone() else {
                    return;
                };
                match request_chain_id(provider.as_ref()).await {
                    Ok(chain_id) => {
                        self.dispatch(WalletEvent::Connected { accounts, chain_id });
                    }
                    Err(error) => {
                        tracing::warn!(%error, "chain query after manual reconnection failed");
                    }
                }
            }
            WatchedEvent::ChainChanged(payload) => {
                let Some(chain_id) = payload.as_str() else {
                    tracing::warn!("malformed chain_changed payload ignored");
                    return;
                };
                self.dispatch(WalletEvent::ChainChanged {
                    chain_id: chain_id.to_owned(),
                });
            }
            WatchedEvent::Shutdown => {}
        }
    }

    /// Requests account access from the wallet. Returns the granted accounts.
    ///
    /// While the dialog is pending the wallet may answer the direct request
    /// with a "request already pending" error even though the user later
    /// approves; an `eth_accounts` poll races the direct request to pick the
    /// approval up regardless.
    ///
    /// No-op returning an empty list while the session is not available.
    pub async fn connect(&self) -> Result<Vec<String>, WalletError> {
        if !self.status().is_available() {
            tracing::warn!(
                status = ?self.status(),
                "connect() ignored; session has no confirmed provider"
            );
            return Ok(Vec::new());
        }
        let Some(provider) = self.inner.provider.clone() else {
            return Ok(Vec::new());
        };
        self.dispatch(WalletEvent::Connecting);
        let accounts = match self.race_account_access(provider.as_ref()).await {
            Ok(accounts) => accounts,
            Err(error) => {
                self.dispatch(WalletEvent::PermissionRejected);
                return Err(error);
            }
        };
        if accounts.is_empty() {
            self.dispatch(WalletEvent::PermissionRejected);
            return Err(WalletError::InvalidResponse(
                "wallet granted an empty account list".to_owned(),
            ));
        }
        let chain_id = match request_chain_id(provider.as_ref()).await {
            Ok(chain_id) => chain_id,
            Err(error) => {
                self.dispatch(WalletEvent::PermissionRejected);
                return Err(error);
            }
        };
        self.dispatch(WalletEvent::Connected {
            accounts: accounts.clone(),
            chain_id,
        });
        Ok(accounts)
    }

    async fn race_account_access(&self, provider: &P) -> Result<Vec<String>, WalletError> {
        let direct = provider.request("eth_requestAccounts", json!([]));
        pin!(direct);
        let period = self.inner.config.connect_poll_interval;
        // First tick fires one full interval in, not immediately.
        let mut poll_timer = time::interval_at(time::Instant::now() + period, period);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut direct_abandoned = false;
        loop {
            tokio::select! {
                outcome = &mut direct, if !direct_abandoned => match outcome {
                    Ok(payload) => {
                        let accounts = normalize_accounts(&payload).ok_or_else(|| {
                            WalletError::InvalidResponse(
                                "eth_requestAccounts returned a non-account payload".to_owned(),
                            )
                        })?;
                        return Ok(accounts);
                    }
                    Err(error) if error.is_request_pending() => {
                        // The dialog is already up; only the poll can see the
                        // eventual approval now.
                        direct_abandoned = true;
                    }
                    Err(error) => return Err(error.into()),
                },
                _ = poll_timer.tick() => {
                    if let Ok(payload) = provider.request("eth_accounts", json!([])).await {
                        if let Some(accounts) = normalize_accounts(&payload) {
                            if !accounts.is_empty() {
                                return Ok(accounts);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Asks the wallet to register a new network (EIP-3085). A "request
    /// already pending" answer is absorbed; the wallet dialog is up and the
    /// eventual switch arrives through the chain subscription.
    ///
    /// No-op while the session is not available.
    pub async fn add_chain(&self, params: AddChainParams) -> Result<(), WalletError> {
        if !self.status().is_available() {
            tracing::warn!(
                status = ?self.status(),
                "add_chain() ignored; session has no confirmed provider"
            );
            return Ok(());
        }
        let Some(provider) = self.inner.provider.clone() else {
            return Ok(());
        };
        match provider
            .request("wallet_addEthereumChain", json!([params]))
            .await
        {
            Ok(_) => Ok(()),
            Err(error) if error.is_request_pending() => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    /// Asks the wallet to switch networks (EIP-3326). Same pending-request
    /// handling as [`WalletSession::add_chain`]; the state update itself
    /// arrives through the chain subscription.
    pub async fn switch_chain(&self, chain_id: &str) -> Result<(), WalletError> {
        if !self.status().is_available() {
            tracing::warn!(
                status = ?self.status(),
                "switch_chain() ignored; session has no confirmed provider"
            );
            return Ok(());
        }
        let Some(provider) = self.inner.provider.clone() else {
            return Ok(());
        };
        match provider
            .request("wallet_switchEthereumChain", json!([{ "chainId": chain_id }]))
            .await
        {
            Ok(_) => Ok(()),
            Err(error) if error.is_request_pending() => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    /// Fresh signer over the current provider and account. Built per call so
    /// it always reflects the latest selected account.
    pub fn get_signer(&self) -> Result<WalletSigner<P>, WalletError> {
        let provider = self
            .inner
            .provider
            .clone()
            .ok_or(WalletError::ProviderRequired)?;
        Ok(WalletSigner {
            provider,
            account: self.account(),
        })
    }

    /// Submits a raw transaction request through the wallet.
    pub async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, WalletError> {
        if !self.status().is_available() {
            return Err(WalletError::Unavailable);
        }
        self.get_signer()?.send_transaction(tx).await
    }

    /// Native-token transfer.
    pub async fn transfer(&self, request: TransferRequest) -> Result<B256, WalletError> {
        if !self.status().is_available() {
            return Err(WalletError::Unavailable);
        }
        let mut tx = request.overrides;
        tx.to = Some(request.to);
        tx.value = Some(request.value);
        self.get_signer()?.send_transaction(tx).await
    }

    /// Encodes a contract method call and submits it as a transaction.
    pub async fn call_contract_method(&self, call: ContractCall) -> Result<B256, WalletError> {
        if !self.status().is_available() {
            return Err(WalletError::Unavailable);
        }
        let data = self
            .inner
            .calldata
            .encode_call(&call.abi, &call.method, &call.args)?;
        let mut tx = call.overrides;
        tx.to = Some(call.contract_address);
        tx.data = Some(data);
        self.get_signer()?.send_transaction(tx).await
    }

    fn lock_state(&self) -> MutexGuard<'_, WalletState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_subscriptions(&self) -> MutexGuard<'_, SubscriptionSlots<P>> {
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

/// Transaction submitter bound to a provider and the account selected at
/// build time.
pub struct WalletSigner<P: ProviderPort> {
    provider: Arc<P>,
    account: Option<String>,
}

impl<P: ProviderPort> WalletSigner<P> {
    /// Sends the transaction through `eth_sendTransaction`, filling in the
    /// bound account as sender when the request leaves `from` unset.
    pub async fn send_transaction(&self, mut tx: TransactionRequest) -> Result<B256, WalletError> {
        if tx.from.is_none() {
            tx.from = self.account.as_deref().and_then(|a| a.parse().ok());
        }
        let params = serde_json::to_value(&tx)
            .map_err(|e| WalletError::InvalidParams(e.to_string()))?;
        let provider = self.provider.clone();
        let payload = provider.request("eth_sendTransaction", json!([params])).await?;
        let hash = payload.as_str().ok_or_else(|| {
            WalletError::InvalidResponse("eth_sendTransaction returned a non-string hash".to_owned())
        })?;
        hash.parse().map_err(|_| {
            WalletError::InvalidResponse(format!("malformed transaction hash: {hash}"))
        })
    }
}

async fn request_chain_id<P: ProviderPort>(provider: &P) -> Result<String, WalletError> {
    let payload = provider.request("eth_chainId", json!([])).await?;
    payload
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| WalletError::InvalidResponse("eth_chainId returned a non-string".to_owned()))
}

/// Extracts an account list from a raw provider payload. `None` when the
/// payload is not an array of strings.
fn normalize_accounts(payload: &Value) -> Option<Vec<String>> {
    let entries = payload.as_array()?;
    entries
        .iter()
        .map(|entry| entry.as_str().map(str::to_owned))
        .collect()
}
