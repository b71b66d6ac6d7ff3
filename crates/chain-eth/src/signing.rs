use serde_json::{json, Value};
use wallet_api::WalletError;

use crate::error::EthError;
use crate::provider::Eip1193Provider;

pub const SIGN_REJECTED: &str = "User rejected message signing";

/// Builds `personal_sign` params.
///
/// EIP-191 puts the message first. Rainbow expects the address first and
/// rejects the standard order.
pub fn personal_sign_params(wallet_name: Option<&str>, address: &str, message: &str) -> Value {
    let message_hex = format!("0x{}", hex::encode(message.as_bytes()));
    let address = address.to_lowercase();
    if wallet_name.is_some_and(|w| w.eq_ignore_ascii_case("rainbow")) {
        json!([address, message_hex])
    } else {
        json!([message_hex, address])
    }
}

/// Signs a UTF-8 message and returns the `0x`-prefixed signature.
pub async fn sign_message(
    provider: &dyn Eip1193Provider,
    wallet_name: Option<&str>,
    address: &str,
    message: &str,
) -> Result<String, WalletError> {
    let params = personal_sign_params(wallet_name, address, message);
    let signature = provider
        .request("personal_sign", params)
        .await
        .map_err(|e| WalletError::classify(e, SIGN_REJECTED))?;
    match signature {
        Value::String(sig) => Ok(sig),
        other => Err(EthError::UnexpectedResponse(other.to_string()).into()),
    }
}
