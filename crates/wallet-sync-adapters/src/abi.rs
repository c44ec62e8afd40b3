//! Contract calldata encoding over alloy's dynamic ABI machinery.

use std::str::FromStr;

use alloy::dyn_abi::{DynSolType, DynSolValue, JsonAbiExt};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes, FixedBytes, I256, U256};
use serde_json::Value;

use wallet_sync_core::{CalldataError, CalldataPort};

#[derive(Debug, Clone, Default)]
pub struct AbiCalldataEncoder;

impl CalldataPort for AbiCalldataEncoder {
    fn encode_call(
        &self,
        abi_json: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Bytes, CalldataError> {
        let abi: JsonAbi =
            serde_json::from_str(abi_json).map_err(|e| CalldataError::InvalidAbi(e.to_string()))?;
        let function = select_function(&abi, method)?;
        if function.inputs.len() != args.len() {
            return Err(CalldataError::Argument(format!(
                "argument count mismatch: expected {}, got {}",
                function.inputs.len(),
                args.len()
            )));
        }

        let mut dyn_args = Vec::with_capacity(args.len());
        for (input, arg) in function.inputs.iter().zip(args.iter()) {
            let ty: DynSolType = input.ty.parse().map_err(|e| {
                CalldataError::InvalidAbi(format!("unsupported type '{}': {e}", input.ty))
            })?;
            let value = sol_value_from_json(arg, &ty).map_err(|e| {
                CalldataError::Argument(format!("arg '{}': {e}", input.name))
            })?;
            dyn_args.push(value);
        }

        function
            .abi_encode_input(&dyn_args)
            .map(Bytes::from)
            .map_err(|e| CalldataError::Encoding(e.to_string()))
    }
}

/// Resolves `method` against the ABI. A bare name picks the first overload;
/// a full signature (`transfer(address,uint256)`) selects an exact one.
fn select_function<'a>(abi: &'a JsonAbi, method: &str) -> Result<&'a Function, CalldataError> {
    let (method_name, full_sig_opt) = if method.contains('(') {
        (
            method
                .split_once('(')
                .map(|(name, _)| name)
                .unwrap_or(method),
            Some(method),
        )
    } else {
        (method, None)
    };

    let candidates = abi
        .function(method_name)
        .ok_or_else(|| CalldataError::MethodNotFound(method_name.to_owned()))?;

    if let Some(full_sig) = full_sig_opt {
        if let Some(function) = candidates
            .iter()
            .find(|f| function_signature(f) == full_sig)
        {
            return Ok(function);
        }
        return Err(CalldataError::MethodNotFound(full_sig.to_owned()));
    }

    candidates
        .first()
        .ok_or_else(|| CalldataError::MethodNotFound(method_name.to_owned()))
}

fn function_signature(function: &Function) -> String {
    let mut out = String::new();
    out.push_str(&function.name);
    out.push('(');
    for (idx, input) in function.inputs.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&input.ty);
    }
    out.push(')');
    out
}

/// Maps a JSON argument onto the sol type the ABI declares for it. Numeric
/// arguments are accepted as JSON numbers, decimal strings, or 0x-hex
/// strings; compound types take JSON arrays.
fn sol_value_from_json(value: &Value, ty: &DynSolType) -> Result<DynSolValue, String> {
    match ty {
        DynSolType::Bool => value
            .as_bool()
            .map(DynSolValue::Bool)
            .ok_or_else(|| format!("bool expected, got {value}")),
        DynSolType::Uint(bits) => parse_uint(value).map(|x| DynSolValue::Uint(x, *bits)),
        DynSolType::Int(bits) => parse_int(value).map(|x| DynSolValue::Int(x, *bits)),
        DynSolType::Address => {
            let raw = value
                .as_str()
                .ok_or_else(|| format!("address string expected, got {value}"))?;
            Address::from_str(raw)
                .map(DynSolValue::Address)
                .map_err(|e| format!("bad address '{raw}': {e}"))
        }
        DynSolType::FixedBytes(size) => {
            let raw = value
                .as_str()
                .ok_or_else(|| format!("bytes{size} hex string expected, got {value}"))?;
            FixedBytes::from_str(raw)
                .map(|x| DynSolValue::FixedBytes(x, *size))
                .map_err(|e| format!("bad bytes{size} '{raw}': {e}"))
        }
        DynSolType::Bytes => {
            let raw = value
                .as_str()
                .ok_or_else(|| format!("bytes hex string expected, got {value}"))?;
            Bytes::from_str(raw)
                .map(|x| DynSolValue::Bytes(x.into()))
                .map_err(|e| format!("bad bytes '{raw}': {e}"))
        }
        DynSolType::String => value
            .as_str()
            .map(|s| DynSolValue::String(s.to_owned()))
            .ok_or_else(|| format!("string expected, got {value}")),
        DynSolType::Array(inner) => sol_sequence(value, inner, None).map(DynSolValue::Array),
        DynSolType::FixedArray(inner, size) => {
            sol_sequence(value, inner, Some(*size)).map(DynSolValue::FixedArray)
        }
        DynSolType::Tuple(inner) => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("tuple array expected, got {value}"))?;
            if items.len() != inner.len() {
                return Err(format!(
                    "tuple of {} expected, got {} elements",
                    inner.len(),
                    items.len()
                ));
            }
            items
                .iter()
                .zip(inner.iter())
                .map(|(item, item_ty)| sol_value_from_json(item, item_ty))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Tuple)
        }
        other => Err(format!("unsupported argument type {other}")),
    }
}

fn sol_sequence(
    value: &Value,
    inner: &DynSolType,
    expected_len: Option<usize>,
) -> Result<Vec<DynSolValue>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("array expected, got {value}"))?;
    if let Some(len) = expected_len {
        if items.len() != len {
            return Err(format!(
                "array of {len} expected, got {} elements",
                items.len()
            ));
        }
    }
    items
        .iter()
        .map(|item| sol_value_from_json(item, inner))
        .collect()
}

fn parse_uint(value: &Value) -> Result<U256, String> {
    match value {
        Value::String(s) => U256::from_str(s)
            .or_else(|_| U256::from_str_radix(s.trim_start_matches("0x"), 16))
            .map_err(|e| format!("bad uint '{s}': {e}")),
        Value::Number(n) => {
            U256::from_str(&n.to_string()).map_err(|e| format!("bad uint {n}: {e}"))
        }
        other => Err(format!("uint expected, got {other}")),
    }
}

fn parse_int(value: &Value) -> Result<I256, String> {
    match value {
        Value::String(s) => I256::from_str(s).map_err(|e| format!("bad int '{s}': {e}")),
        Value::Number(n) => {
            I256::from_str(&n.to_string()).map_err(|e| format!("bad int {n}: {e}"))
        }
        other => Err(format!("int expected, got {other}")),
    }
}
