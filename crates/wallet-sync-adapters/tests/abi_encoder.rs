use alloy::primitives::keccak256;
use serde_json::json;
use wallet_sync_adapters::AbiCalldataEncoder;
use wallet_sync_core::{CalldataError, CalldataPort};

const TOKEN_ABI: &str = r#"[
  {
    "type": "function",
    "name": "transfer",
    "stateMutability": "nonpayable",
    "inputs": [
      { "name": "to", "type": "address" },
      { "name": "amount", "type": "uint256" }
    ],
    "outputs": [{ "name": "", "type": "bool" }]
  },
  {
    "type": "function",
    "name": "mint",
    "stateMutability": "nonpayable",
    "inputs": [{ "name": "amount", "type": "uint256" }],
    "outputs": []
  },
  {
    "type": "function",
    "name": "mint",
    "stateMutability": "nonpayable",
    "inputs": [
      { "name": "to", "type": "address" },
      { "name": "amount", "type": "uint256" }
    ],
    "outputs": []
  }
]"#;

const COMPLEX_ABI: &str = r#"[
  {
    "type": "function",
    "name": "configure",
    "stateMutability": "nonpayable",
    "inputs": [
      { "name": "enabled", "type": "bool" },
      { "name": "tag", "type": "bytes32" },
      { "name": "owners", "type": "address[]" },
      { "name": "label", "type": "string" }
    ],
    "outputs": []
  }
]"#;

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

#[test]
fn encodes_a_simple_transfer() {
    let encoder = AbiCalldataEncoder;
    let data = encoder
        .encode_call(
            TOKEN_ABI,
            "transfer",
            &[
                json!("0x2000000000000000000000000000000000000002"),
                json!("1000"),
            ],
        )
        .expect("encode transfer");
    assert_eq!(&data[..4], selector("transfer(address,uint256)"));
    // Selector plus two 32-byte words.
    assert_eq!(data.len(), 4 + 64);
}

#[test]
fn full_signature_selects_among_overloads() {
    let encoder = AbiCalldataEncoder;

    let single = encoder
        .encode_call(TOKEN_ABI, "mint(uint256)", &[json!(7)])
        .expect("encode single-arg overload");
    assert_eq!(&single[..4], selector("mint(uint256)"));

    let double = encoder
        .encode_call(
            TOKEN_ABI,
            "mint(address,uint256)",
            &[
                json!("0x2000000000000000000000000000000000000002"),
                json!(7),
            ],
        )
        .expect("encode two-arg overload");
    assert_eq!(&double[..4], selector("mint(address,uint256)"));
}

#[test]
fn argument_count_mismatch_is_an_argument_error() {
    let encoder = AbiCalldataEncoder;
    let outcome = encoder.encode_call(TOKEN_ABI, "transfer", &[json!("1000")]);
    assert!(matches!(outcome, Err(CalldataError::Argument(_))));
}

#[test]
fn unknown_method_is_reported() {
    let encoder = AbiCalldataEncoder;
    let outcome = encoder.encode_call(TOKEN_ABI, "burn", &[]);
    assert!(matches!(outcome, Err(CalldataError::MethodNotFound(_))));

    let outcome = encoder.encode_call(TOKEN_ABI, "mint(bool)", &[json!(true)]);
    assert!(matches!(outcome, Err(CalldataError::MethodNotFound(_))));
}

#[test]
fn malformed_abi_is_reported() {
    let encoder = AbiCalldataEncoder;
    let outcome = encoder.encode_call("not json", "transfer", &[]);
    assert!(matches!(outcome, Err(CalldataError::InvalidAbi(_))));
}

#[test]
fn hex_and_decimal_uint_forms_are_accepted() {
    let encoder = AbiCalldataEncoder;
    let decimal = encoder
        .encode_call(TOKEN_ABI, "mint(uint256)", &[json!("1000")])
        .expect("decimal string");
    let hex = encoder
        .encode_call(TOKEN_ABI, "mint(uint256)", &[json!("0x3e8")])
        .expect("hex string");
    let number = encoder
        .encode_call(TOKEN_ABI, "mint(uint256)", &[json!(1000)])
        .expect("json number");
    assert_eq!(decimal, hex);
    assert_eq!(decimal, number);
}

#[test]
fn encodes_compound_argument_types() {
    let encoder = AbiCalldataEncoder;
    let data = encoder
        .encode_call(
            COMPLEX_ABI,
            "configure",
            &[
                json!(true),
                json!("0x0101010101010101010101010101010101010101010101010101010101010101"),
                json!([
                    "0x2000000000000000000000000000000000000002",
                    "0x3000000000000000000000000000000000000003"
                ]),
                json!("primary"),
            ],
        )
        .expect("encode compound args");
    assert_eq!(
        &data[..4],
        selector("configure(bool,bytes32,address[],string)")
    );
}

#[test]
fn mistyped_arguments_are_argument_errors() {
    let encoder = AbiCalldataEncoder;
    let outcome = encoder.encode_call(
        TOKEN_ABI,
        "transfer",
        &[json!("not an address"), json!("1000")],
    );
    assert!(matches!(outcome, Err(CalldataError::Argument(_))));
}
