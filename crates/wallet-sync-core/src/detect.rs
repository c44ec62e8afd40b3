//! Provider detection over the externally injected wallet object.

use std::sync::Arc;

use crate::error::WalletError;
use crate::ports::ProviderPort;

/// The injected global wallet object, passed explicitly instead of being
/// read from ambient state.
///
/// The `providers` array is populated when several wallet extensions compete
/// for the same injection point (Coinbase Wallet alongside the target
/// wallet, or Brave with its built-in wallet active); the target provider
/// then hides inside the array rather than at the root.
#[derive(Debug)]
pub struct InjectedWallet<P> {
    root: Option<Arc<P>>,
    providers: Option<Vec<Arc<P>>>,
}

impl<P> InjectedWallet<P> {
    /// A single injected provider at the root of the object.
    pub fn single(provider: Arc<P>) -> Self {
        Self {
            root: Some(provider),
            providers: None,
        }
    }

    /// Multiple competing extensions behind one injection point.
    pub fn multiplexed(providers: Vec<Arc<P>>) -> Self {
        Self {
            root: None,
            providers: Some(providers),
        }
    }

    /// An injection point that exists but carries nothing usable.
    pub fn empty() -> Self {
        Self {
            root: None,
            providers: None,
        }
    }
}

impl<P> Clone for InjectedWallet<P> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            providers: self.providers.clone(),
        }
    }
}

/// Locates the target wallet provider among possibly multiple injected ones.
///
/// When a `providers` array is present, an entry flagged as the target
/// wallet that is not the competing wallet skin wins; an entry carrying both
/// flags is the fallback. Otherwise the root object is returned when it
/// carries the target flag itself.
pub fn detect_provider<P: ProviderPort>(injected: Option<&InjectedWallet<P>>) -> Option<Arc<P>> {
    let injected = injected?;
    if let Some(providers) = injected.providers.as_ref() {
        if let Some(provider) = providers
            .iter()
            .find(|p| p.is_metamask() && !p.is_brave_wallet())
        {
            return Some(Arc::clone(provider));
        }
        return providers
            .iter()
            .find(|p| p.is_metamask() && p.is_brave_wallet())
            .map(Arc::clone);
    }
    let root = injected.root.as_ref()?;
    if root.is_metamask() {
        Some(Arc::clone(root))
    } else {
        None
    }
}

/// Variant of [`detect_provider`] for call sites where a missing provider is
/// a contract violation rather than an expected runtime state.
pub fn require_provider<P: ProviderPort>(
    injected: Option<&InjectedWallet<P>>,
) -> Result<Arc<P>, WalletError> {
    detect_provider(injected).ok_or(WalletError::ProviderRequired)
}
