//! Adapter configuration.

#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Flags reported through the provider port; an HTTP endpoint stands in
    /// for a wallet extension, so these describe the wallet behind it.
    pub metamask: bool,
    pub brave_wallet: bool,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8545".to_owned(),
            timeout_ms: 15_000,
            metamask: true,
            brave_wallet: false,
        }
    }
}

impl HttpProviderConfig {
    /// Reads overrides from the environment, falling back to defaults for
    /// unset or malformed variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("WALLET_SYNC_PROVIDER_URL") {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(raw) = std::env::var("WALLET_SYNC_PROVIDER_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => config.timeout_ms = ms,
                _ => tracing::warn!(%raw, "ignoring malformed WALLET_SYNC_PROVIDER_TIMEOUT_MS"),
            }
        }
        config
    }
}
