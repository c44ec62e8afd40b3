#![allow(dead_code)]

use std::sync::Arc;

use wallet_sync_adapters::{AbiCalldataEncoder, MockProvider};
use wallet_sync_core::{InjectedWallet, SessionConfig, WalletSession};

pub type TestSession = WalletSession<MockProvider, AbiCalldataEncoder>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Session over a single injected mock provider.
pub fn session_with(provider: Arc<MockProvider>) -> TestSession {
    WalletSession::new(
        Some(&InjectedWallet::single(provider)),
        AbiCalldataEncoder,
        SessionConfig::default(),
    )
}

/// Session with no injected wallet object at all.
pub fn detached_session() -> TestSession {
    WalletSession::new(None, AbiCalldataEncoder, SessionConfig::default())
}

/// Drives the session pump on a background task.
pub fn spawn_pump(session: &TestSession) -> tokio::task::JoinHandle<()> {
    let session = session.clone();
    tokio::spawn(async move { session.run().await })
}

/// Lets queued pump work drain on the current-thread runtime.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
