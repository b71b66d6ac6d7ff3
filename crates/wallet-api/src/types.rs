use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Network family a wallet strategy serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Evm,
    Solana,
}

impl NetworkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Evm => "evm",
            NetworkType::Solana => "solana",
        }
    }

    /// Parses an explicit network hint. Families without a strategy yield `None`.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.to_ascii_lowercase();
        if hint.contains("solana") {
            Some(NetworkType::Solana)
        } else if hint == "evm" {
            Some(NetworkType::Evm)
        } else {
            None
        }
    }

    /// Resolves an optional hint, falling back to EVM.
    pub fn resolve(hint: Option<&str>) -> Self {
        hint.and_then(Self::from_hint).unwrap_or(NetworkType::Evm)
    }

    /// EVM addresses are `0x`-prefixed hex; anything else is treated as Solana.
    pub fn infer_from_address(address: &str) -> Self {
        if address.starts_with("0x") {
            NetworkType::Evm
        } else {
            NetworkType::Solana
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chain identifier as reported back to the embedded surface: EVM chains
/// are numeric, Solana uses a fixed string id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainRef {
    Id(u64),
    Name(String),
}

impl fmt::Display for ChainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainRef::Id(id) => write!(f, "{id}"),
            ChainRef::Name(name) => f.write_str(name),
        }
    }
}

/// A wallet the host can present or auto-route to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(rename = "type")]
    pub network: NetworkType,
    /// Boolean `is*` capability flags copied from the injected provider
    /// (`isMetaMask`, `isRabby`, ...).
    #[serde(flatten)]
    pub flags: BTreeMap<String, bool>,
}

impl ProviderDescriptor {
    pub fn new(id: impl Into<String>, network: NetworkType) -> Self {
        Self {
            id: id.into(),
            name: None,
            icon: None,
            network,
            flags: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests from the embedded surface
// ---------------------------------------------------------------------------

/// `walletBrowserInjectedWalletSelected`: the user picked an injected wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSelection {
    pub integration_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "chain_id::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_name: Option<String>,
}

impl WalletSelection {
    pub fn named(integration_name: impl Into<String>) -> Self {
        Self {
            integration_name: integration_name.into(),
            network_type: None,
            target_chain_id: None,
            wallet_name: None,
        }
    }
}

/// `walletBrowserSignRequest`: sign `message` with `address`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub address: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
}

/// `walletBrowserChainSwitchRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSwitchRequest {
    #[serde(deserialize_with = "chain_id::deserialize")]
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_name: Option<String>,
}

/// `walletBrowserTransferBalanceRequest`. Recognized, but carries no wallet
/// operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferBalanceRequest {
    pub account: String,
    #[serde(deserialize_with = "chain_id::deserialize")]
    pub chain_id: u64,
}

/// `walletBrowserNativeTransferRequest`: move the chain's native asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTransferRequest {
    pub to_address: String,
    /// Human-readable decimal amount, e.g. `0.25`.
    pub amount: f64,
    pub decimal_places: u32,
    #[serde(deserialize_with = "chain_id::deserialize")]
    pub chain_id: u64,
    /// Sending account.
    pub account: String,
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockhash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_name: Option<String>,
}

/// Non-native transfers and smart deposits: call `function_name` on the
/// contract at `address`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartContractCall {
    pub address: String,
    /// JSON ABI or a JSON array of human-readable signatures.
    pub abi: String,
    pub function_name: String,
    #[serde(default)]
    pub args: Vec<Value>,
    pub account: String,
    /// Optional native value in smallest units (decimal or `0x` hex).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// `walletBrowserDisconnect`. Without a network type every strategy is
/// disconnected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOutcome {
    pub accounts: Vec<String>,
    pub chain_id: ChainRef,
    pub is_connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSwitchOutcome {
    pub chain_id: ChainRef,
    pub accounts: Vec<String>,
}

/// Lenient chain id decoding: the surface sends numbers, decimal strings
/// and occasionally `0x` hex.
pub mod chain_id {
    use super::*;
    use serde::de::Error as _;

    pub fn parse(value: &Value) -> Option<u64> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => parse_str(s),
            _ => None,
        }
    }

    pub fn parse_str(raw: &str) -> Option<u64> {
        let raw = raw.trim();
        match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => raw.parse().ok(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        parse(&value).ok_or_else(|| D::Error::custom(format!("invalid chain id: {value}")))
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(value) => parse(&value)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid chain id: {value}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn network_hint_resolution() {
        assert_eq!(NetworkType::resolve(Some("solana")), NetworkType::Solana);
        assert_eq!(NetworkType::resolve(Some("solana-devnet")), NetworkType::Solana);
        assert_eq!(NetworkType::resolve(Some("evm")), NetworkType::Evm);
        assert_eq!(NetworkType::resolve(Some("bitcoin")), NetworkType::Evm);
        assert_eq!(NetworkType::resolve(None), NetworkType::Evm);
        assert_eq!(NetworkType::from_hint("tron"), None);
    }

    #[test]
    fn network_inferred_from_address() {
        assert_eq!(
            NetworkType::infer_from_address("0x000000000000000000000000000000000000dEaD"),
            NetworkType::Evm
        );
        assert_eq!(
            NetworkType::infer_from_address("7EcDhSYGxXyscszYEp35KHN8vvw3svAuLKTzXwCFLtV"),
            NetworkType::Solana
        );
    }

    #[test]
    fn selection_accepts_string_or_number_chain_id() {
        let a: WalletSelection =
            serde_json::from_value(json!({"integrationName": "MetaMask", "targetChainId": "137"}))
                .unwrap();
        let b: WalletSelection =
            serde_json::from_value(json!({"integrationName": "MetaMask", "targetChainId": 137}))
                .unwrap();
        let c: WalletSelection =
            serde_json::from_value(json!({"integrationName": "MetaMask"})).unwrap();
        assert_eq!(a.target_chain_id, Some(137));
        assert_eq!(b.target_chain_id, Some(137));
        assert_eq!(c.target_chain_id, None);
    }

    #[test]
    fn chain_switch_accepts_hex() {
        let req: ChainSwitchRequest =
            serde_json::from_value(json!({"chainId": "0x89", "networkType": "evm"})).unwrap();
        assert_eq!(req.chain_id, 137);
    }

    #[test]
    fn chain_switch_rejects_garbage() {
        let res: Result<ChainSwitchRequest, _> =
            serde_json::from_value(json!({"chainId": "polygon"}));
        assert!(res.is_err());
    }

    #[test]
    fn native_transfer_payload_shape() {
        let req: NativeTransferRequest = serde_json::from_value(json!({
            "toAddress": "0x456",
            "amount": 1,
            "decimalPlaces": 18,
            "chainId": 1,
            "account": "0x123",
            "network": "ethereum"
        }))
        .unwrap();
        assert_eq!(req.amount, 1.0);
        assert_eq!(req.decimal_places, 18);
        assert!(req.blockhash.is_none());
    }

    #[test]
    fn provider_descriptor_flattens_flags() {
        let mut descriptor = ProviderDescriptor::new("uuid-1", NetworkType::Evm);
        descriptor.name = Some("MetaMask".into());
        descriptor.flags.insert("isMetaMask".into(), true);

        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            value,
            json!({"id": "uuid-1", "name": "MetaMask", "type": "evm", "isMetaMask": true})
        );
    }

    #[test]
    fn solana_descriptor_has_only_id_and_type() {
        let value =
            serde_json::to_value(ProviderDescriptor::new("phantom", NetworkType::Solana)).unwrap();
        assert_eq!(value, json!({"id": "phantom", "type": "solana"}));
    }

    #[test]
    fn chain_ref_serializes_untagged() {
        assert_eq!(serde_json::to_value(ChainRef::Id(137)).unwrap(), json!(137));
        assert_eq!(
            serde_json::to_value(ChainRef::Name("101".into())).unwrap(),
            json!("101")
        );
    }

    #[test]
    fn connect_outcome_is_camel_case() {
        let outcome = ConnectOutcome {
            accounts: vec!["0x123".into()],
            chain_id: ChainRef::Id(1),
            is_connected: true,
        };
        assert_eq!(
            serde_json::to_value(outcome).unwrap(),
            json!({"accounts": ["0x123"], "chainId": 1, "isConnected": true})
        );
    }
}
