//! Calldata encoding for contract calls requested by the Link surface.
//!
//! The surface sends the contract ABI as a string (either a standard JSON ABI
//! or a JSON array of human-readable signatures), a function name and JSON
//! arguments. Arguments are coerced against the declared parameter types, so
//! amounts may arrive as decimal strings, hex strings or plain numbers.

use alloy_dyn_abi::{DynSolType, DynSolValue, JsonAbiExt};
use alloy_json_abi::{Function, JsonAbi};
use serde_json::Value;

use crate::error::EthError;

/// Signature prefixes that are valid in a human-readable ABI but are not
/// callable functions.
const NON_FUNCTION_ITEMS: &[&str] = &["event ", "error ", "constructor", "fallback", "receive"];

/// Parses every function declared by `raw`.
pub fn parse_functions(raw: &str) -> Result<Vec<Function>, EthError> {
    if let Ok(abi) = serde_json::from_str::<JsonAbi>(raw) {
        return Ok(abi.functions().cloned().collect());
    }

    let signatures: Vec<String> = match serde_json::from_str::<Vec<String>>(raw) {
        Ok(list) => list,
        Err(_) => vec![raw.to_string()],
    };

    let mut functions = Vec::with_capacity(signatures.len());
    for sig in &signatures {
        let sig = sig.trim();
        if NON_FUNCTION_ITEMS.iter().any(|p| sig.starts_with(p)) {
            continue;
        }
        let function =
            Function::parse(sig).map_err(|e| EthError::InvalidAbi(format!("{sig}: {e}")))?;
        functions.push(function);
    }
    Ok(functions)
}

/// Picks `name` from `functions`, preferring the overload whose arity
/// matches `arg_count`.
pub fn select_function<'a>(
    functions: &'a [Function],
    name: &str,
    arg_count: usize,
) -> Result<&'a Function, EthError> {
    let mut candidates = functions.iter().filter(|f| f.name == name).peekable();
    let first = candidates
        .peek()
        .copied()
        .ok_or_else(|| EthError::UnknownFunction(name.to_string()))?;
    Ok(candidates
        .find(|f| f.inputs.len() == arg_count)
        .unwrap_or(first))
}

/// Encodes a call to `function_name` as `0x`-prefixed calldata.
pub fn encode_call(abi: &str, function_name: &str, args: &[Value]) -> Result<String, EthError> {
    let functions = parse_functions(abi)?;
    let function = select_function(&functions, function_name, args.len())?;

    if function.inputs.len() != args.len() {
        return Err(EthError::EncodingError(format!(
            "{} expects {} arguments, got {}",
            function.name,
            function.inputs.len(),
            args.len()
        )));
    }

    let values = function
        .inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = DynSolType::parse(&param.selector_type())
                .map_err(|e| EthError::InvalidAbi(e.to_string()))?;
            coerce_json(&ty, arg)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let data = function
        .abi_encode_input(&values)
        .map_err(|e| EthError::EncodingError(e.to_string()))?;
    Ok(format!("0x{}", hex::encode(data)))
}

/// Converts one JSON argument into a value of type `ty`.
fn coerce_json(ty: &DynSolType, arg: &Value) -> Result<DynSolValue, EthError> {
    match (ty, arg) {
        (DynSolType::Array(inner), Value::Array(items)) => Ok(DynSolValue::Array(
            items
                .iter()
                .map(|item| coerce_json(inner, item))
                .collect::<Result<_, _>>()?,
        )),
        (DynSolType::FixedArray(inner, len), Value::Array(items)) => {
            if items.len() != *len {
                return Err(EthError::EncodingError(format!(
                    "expected {len} elements for {ty}, got {}",
                    items.len()
                )));
            }
            Ok(DynSolValue::FixedArray(
                items
                    .iter()
                    .map(|item| coerce_json(inner, item))
                    .collect::<Result<_, _>>()?,
            ))
        }
        (DynSolType::Tuple(types), Value::Array(items)) => {
            if items.len() != types.len() {
                return Err(EthError::EncodingError(format!(
                    "expected {} tuple fields, got {}",
                    types.len(),
                    items.len()
                )));
            }
            Ok(DynSolValue::Tuple(
                types
                    .iter()
                    .zip(items)
                    .map(|(t, item)| coerce_json(t, item))
                    .collect::<Result<_, _>>()?,
            ))
        }
        (_, Value::String(s)) => coerce_text(ty, s),
        (_, Value::Bool(b)) => coerce_text(ty, &b.to_string()),
        (_, Value::Number(n)) => {
            // serde_json prints large floats in exponent form.
            let text = match (n.as_u64(), n.as_i64(), n.as_f64()) {
                (Some(u), _, _) => u.to_string(),
                (None, Some(i), _) => i.to_string(),
                (None, None, Some(f)) => format!("{f}"),
                _ => n.to_string(),
            };
            coerce_text(ty, &text)
        }
        _ => Err(EthError::EncodingError(format!(
            "cannot encode {arg} as {ty}"
        ))),
    }
}

fn coerce_text(ty: &DynSolType, text: &str) -> Result<DynSolValue, EthError> {
    ty.coerce_str(text)
        .map_err(|e| EthError::EncodingError(format!("{text} as {ty}: {e}")))
}
