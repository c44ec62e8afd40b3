mod common;

use common::{detached_session, init_tracing, session_with, settle, spawn_pump};
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use serde_json::json;
use wallet_sync_adapters::MockProvider;
use wallet_sync_core::{
    ContractCall, TransactionRequest, TransferRequest, WalletError, WalletStatus,
};

const ACCOUNT_A: &str = "0x1000000000000000000000000000000000000001";
const ACCOUNT_B: &str = "0x1000000000000000000000000000000000000002";
const RECIPIENT: &str = "0x2000000000000000000000000000000000000002";
const TOKEN: &str = "0x3000000000000000000000000000000000000003";

const ERC20_ABI: &str = r#"[
  {
    "type": "function",
    "name": "transfer",
    "stateMutability": "nonpayable",
    "inputs": [
      { "name": "to", "type": "address" },
      { "name": "amount", "type": "uint256" }
    ],
    "outputs": [{ "name": "", "type": "bool" }]
  }
]"#;

fn recipient() -> Address {
    RECIPIENT.parse().expect("static recipient address")
}

#[tokio::test]
async fn transfer_fills_sender_destination_and_value() {
    init_tracing();
    let provider = Arc::new(MockProvider::new());
    provider.set_accounts(vec![ACCOUNT_A.to_owned()]);
    let session = session_with(Arc::clone(&provider));
    let pump = spawn_pump(&session);
    settle().await;
    assert_eq!(session.status(), WalletStatus::Connected);

    let hash = session
        .transfer(TransferRequest {
            to: recipient(),
            value: U256::from(1000u64),
            overrides: TransactionRequest::default(),
        })
        .await
        .expect("transfer accepted");
    assert_eq!(
        hash.to_string(),
        "0x1111111111111111111111111111111111111111111111111111111111111111"
    );

    let requests = provider.requests();
    let (_, sent) = requests
        .iter()
        .find(|(method, _)| method == "eth_sendTransaction")
        .expect("transaction reached the provider");
    assert_eq!(sent[0]["from"], ACCOUNT_A);
    assert_eq!(sent[0]["to"], RECIPIENT);
    assert_eq!(sent[0]["value"], "0x3e8");
    assert!(sent[0].get("data").is_none());

    session.shutdown();
    pump.await.expect("pump task");
}

#[tokio::test]
async fn send_transaction_keeps_an_explicit_sender() {
    init_tracing();
    let provider = Arc::new(MockProvider::new());
    provider.set_accounts(vec![ACCOUNT_A.to_owned()]);
    let session = session_with(Arc::clone(&provider));
    let pump = spawn_pump(&session);
    settle().await;

    let tx = TransactionRequest {
        from: Some(ACCOUNT_B.parse().expect("static sender address")),
        to: Some(recipient()),
        value: Some(U256::from(5u64)),
        ..TransactionRequest::default()
    };
    session.send_transaction(tx).await.expect("tx accepted");

    let requests = provider.requests();
    let (_, sent) = requests
        .iter()
        .find(|(method, _)| method == "eth_sendTransaction")
        .expect("transaction reached the provider");
    assert_eq!(sent[0]["from"], ACCOUNT_B);

    session.shutdown();
    pump.await.expect("pump task");
}

#[tokio::test]
async fn contract_calls_carry_encoded_calldata() {
    init_tracing();
    let provider = Arc::new(MockProvider::new());
    provider.set_accounts(vec![ACCOUNT_A.to_owned()]);
    let session = session_with(Arc::clone(&provider));
    let pump = spawn_pump(&session);
    settle().await;

    session
        .call_contract_method(ContractCall {
            contract_address: TOKEN.parse().expect("static token address"),
            abi: ERC20_ABI.to_owned(),
            method: "transfer".to_owned(),
            args: vec![json!(RECIPIENT), json!("1000")],
            overrides: TransactionRequest::default(),
        })
        .await
        .expect("contract call accepted");

    let requests = provider.requests();
    let (_, sent) = requests
        .iter()
        .find(|(method, _)| method == "eth_sendTransaction")
        .expect("transaction reached the provider");
    assert_eq!(sent[0]["to"], TOKEN);
    let data = sent[0]["data"].as_str().expect("calldata string");
    assert!(
        data.starts_with("0xa9059cbb"),
        "transfer(address,uint256) selector, got {data}"
    );
    assert_eq!(sent[0]["from"], ACCOUNT_A);

    session.shutdown();
    pump.await.expect("pump task");
}

#[tokio::test]
async fn signer_follows_the_selected_account() {
    init_tracing();
    let provider = Arc::new(MockProvider::new());
    provider.set_accounts(vec![ACCOUNT_A.to_owned()]);
    let session = session_with(Arc::clone(&provider));
    let pump = spawn_pump(&session);
    settle().await;

    provider.emit_accounts_changed(vec![ACCOUNT_B.to_owned()]);
    settle().await;
    assert_eq!(session.account().as_deref(), Some(ACCOUNT_B));

    // A signer built after the switch signs as the new account.
    let signer = session.get_signer().expect("signer with provider present");
    signer
        .send_transaction(TransactionRequest {
            to: Some(recipient()),
            ..TransactionRequest::default()
        })
        .await
        .expect("tx accepted");

    let requests = provider.requests();
    let (_, sent) = requests
        .iter()
        .find(|(method, _)| method == "eth_sendTransaction")
        .expect("transaction reached the provider");
    assert_eq!(sent[0]["from"], ACCOUNT_B);

    session.shutdown();
    pump.await.expect("pump task");
}

#[tokio::test]
async fn transactions_are_rejected_without_a_provider() {
    init_tracing();
    let session = detached_session();
    let pump = spawn_pump(&session);
    settle().await;
    assert_eq!(session.status(), WalletStatus::Unavailable);

    let outcome = session
        .transfer(TransferRequest {
            to: recipient(),
            value: U256::from(1u64),
            overrides: TransactionRequest::default(),
        })
        .await;
    assert!(matches!(outcome, Err(WalletError::Unavailable)));

    let outcome = session.send_transaction(TransactionRequest::default()).await;
    assert!(matches!(outcome, Err(WalletError::Unavailable)));

    let outcome = session.get_signer();
    assert!(matches!(outcome, Err(WalletError::ProviderRequired)));

    session.shutdown();
    pump.await.expect("pump task");
}
