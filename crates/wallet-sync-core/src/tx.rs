//! Request types forwarded to the wallet.

use alloy::primitives::{Address, Bytes, U256, U64};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC transaction request, the `eth_sendTransaction` parameter object.
///
/// Absent fields are left out of the serialized object so the wallet fills
/// them in (gas estimation, nonce management).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U64>,
}

/// Native-token transfer: destination and amount over a base request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub to: Address,
    pub value: U256,
    pub overrides: TransactionRequest,
}

/// Contract method invocation, encoded through the calldata port before
/// entering the generic send path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub contract_address: Address,
    /// JSON ABI of the target contract.
    pub abi: String,
    /// Method name, or the full signature (`transfer(address,uint256)`) to
    /// disambiguate overloads.
    pub method: String,
    pub args: Vec<Value>,
    pub overrides: TransactionRequest,
}

/// Network description for `wallet_addEthereumChain` requests (EIP-3085).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    /// Chain id of the new network, hexadecimal.
    pub chain_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_explorer_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_currency: Option<NativeCurrency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_urls: Option<Vec<String>>,
}

impl AddChainParams {
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            chain_name: None,
            block_explorer_urls: None,
            icon_urls: None,
            native_currency: None,
            rpc_urls: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}
