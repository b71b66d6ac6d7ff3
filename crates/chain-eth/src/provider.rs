use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use wallet_api::ProviderError;

use crate::error::EthError;

/// An injected EIP-1193 provider (`window.ethereum` or an EIP-6963
/// announcement).
#[async_trait(?Send)]
pub trait Eip1193Provider {
    /// `provider.request({ method, params })`. `params` is `Value::Null`
    /// when the method takes none.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// Boolean `is*` properties the provider exposes (`isMetaMask`, ...).
    fn flags(&self) -> BTreeMap<String, bool> {
        BTreeMap::new()
    }

    /// Drops every event subscription the page registered on the provider.
    fn remove_all_listeners(&self) {}
}

/// Parses a `0x`-prefixed hex quantity as returned by `eth_chainId`.
pub fn parse_quantity(value: &Value) -> Result<u64, EthError> {
    match value {
        Value::String(s) => {
            let hex = s
                .strip_prefix("0x")
                .ok_or_else(|| EthError::InvalidQuantity(s.clone()))?;
            u64::from_str_radix(hex, 16).map_err(|_| EthError::InvalidQuantity(s.clone()))
        }
        // Some wallets answer with a plain number.
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| EthError::InvalidQuantity(n.to_string())),
        other => Err(EthError::InvalidQuantity(other.to_string())),
    }
}

/// Formats a chain id the way `wallet_switchEthereumChain` expects.
pub fn chain_id_hex(chain_id: u64) -> String {
    format!("{chain_id:#x}")
}

pub(crate) fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}
