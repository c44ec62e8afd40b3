//! HTTP JSON-RPC provider for headless runtimes, where the wallet is
//! reached over a local proxy endpoint instead of a browser injection.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::{json, Value};

use wallet_sync_core::{
    EventListener, ProviderError, ProviderEventKind, ProviderPort, SubscriptionId,
};

use crate::config::HttpProviderConfig;

/// Provider that forwards every request as a JSON-RPC 2.0 call over HTTP.
///
/// Wallet push events have no transport here; the host bridges them in
/// through [`HttpProvider::notify_accounts_changed`] and
/// [`HttpProvider::notify_chain_changed`].
pub struct HttpProvider {
    config: HttpProviderConfig,
    client: reqwest::Client,
    next_id: AtomicU64,
    listeners: Mutex<HashMap<(ProviderEventKind, SubscriptionId), EventListener>>,
    next_subscription: AtomicU64,
}

impl HttpProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ProviderError::Transport(format!("http client init failed: {e}")))?;
        Ok(Self {
            config,
            client,
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        })
    }

    /// Bridges an `accountsChanged` push from the wallet to the registered
    /// listeners.
    pub fn notify_accounts_changed(&self, accounts: Vec<String>) {
        self.notify(ProviderEventKind::AccountsChanged, json!(accounts));
    }

    /// Bridges a `chainChanged` push from the wallet to the registered
    /// listeners.
    pub fn notify_chain_changed(&self, chain_id: impl Into<String>) {
        self.notify(ProviderEventKind::ChainChanged, json!(chain_id.into()));
    }

    fn notify(&self, kind: ProviderEventKind, payload: Value) {
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

    fn lock_listeners(
        &self,
    ) -> MutexGuard<'_, HashMap<(ProviderEventKind, SubscriptionId), EventListener>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.config.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("rpc request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(format!("rpc json decode failed: {e}")))?;
        if !status.is_success() {
            return Err(ProviderError::Transport(format!(
                "rpc status {status}: {body}"
            )));
        }
        if let Some(error) = body.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown provider error")
                .to_owned();
            return Err(ProviderError::Rpc { code, message });
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| ProviderError::InvalidResponse("rpc response missing result".to_owned()))
    }
}

impl ProviderPort for HttpProvider {
    fn request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, ProviderError>> + Send {
        let method = method.to_owned();
        async move { self.rpc(&method, params).await }
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
        self.config.metamask
    }

    fn is_brave_wallet(&self) -> bool {
        self.config.brave_wallet
    }
}
