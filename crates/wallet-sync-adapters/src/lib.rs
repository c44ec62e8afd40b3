//! Concrete adapters behind the wallet-sync-core ports: an in-process mock
//! provider for tests, an HTTP JSON-RPC provider for headless runtimes, and
//! an ABI calldata encoder.

pub mod abi;
pub mod config;
pub mod http;
pub mod mock;

pub use abi::AbiCalldataEncoder;
pub use config::HttpProviderConfig;
pub use http::HttpProvider;
pub use mock::MockProvider;
