//! Transaction submission through the wallet (`eth_sendTransaction`) and
//! receipt tracking.
//!
//! The wallet fills nonce, gas limit and fee fields itself; this module only
//! sets what the request dictates. The active chain is read once when the
//! transaction is prepared and again right before submission, and a
//! mismatch aborts with [`WalletError::NetworkChanged`].

use alloy_primitives::U256;
use serde_json::{json, Map, Value};
use wallet_api::{Sleeper, WalletError};

use crate::config::EvmConfig;
use crate::error::EthError;
use crate::provider::{parse_quantity, Eip1193Provider};

pub const TX_REJECTED: &str = "Transaction was rejected by user";

/// Parses a uint256 given either as decimal or as `0x` hex.
pub fn parse_u256(raw: &str) -> Result<U256, EthError> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(raw, 10),
    };
    parsed.map_err(|_| EthError::InvalidQuantity(raw.to_string()))
}

/// Fields of an `eth_sendTransaction` request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub value: Option<U256>,
    pub data: Option<String>,
    pub gas_price: Option<U256>,
}

impl TransactionRequest {
    pub fn to_json(&self) -> Value {
        let mut tx = Map::new();
        tx.insert("from".into(), json!(self.from));
        tx.insert("to".into(), json!(self.to));
        if let Some(value) = self.value {
            tx.insert("value".into(), json!(format!("{value:#x}")));
        }
        if let Some(data) = &self.data {
            tx.insert("data".into(), json!(data));
        }
        if let Some(gas_price) = self.gas_price {
            tx.insert("gasPrice".into(), json!(format!("{gas_price:#x}")));
        }
        Value::Object(tx)
    }
}

pub struct TransactionSender<'a> {
    provider: &'a dyn Eip1193Provider,
    sleeper: &'a dyn Sleeper,
    config: &'a EvmConfig,
}

impl<'a> TransactionSender<'a> {
    pub fn new(
        provider: &'a dyn Eip1193Provider,
        sleeper: &'a dyn Sleeper,
        config: &'a EvmConfig,
    ) -> Self {
        Self {
            provider,
            sleeper,
            config,
        }
    }

    /// Sends `value` wei of the native asset and waits for the receipt.
    pub async fn send_native(
        &self,
        from: &str,
        to: &str,
        value: U256,
    ) -> Result<String, WalletError> {
        let prepared_on = self.chain_id().await?;
        let tx = TransactionRequest {
            from: from.to_string(),
            to: to.to_string(),
            value: Some(value),
            ..Default::default()
        };
        self.submit(prepared_on, tx).await
    }

    /// Sends a contract call with a marked-up gas price.
    pub async fn send_contract_call(
        &self,
        from: &str,
        contract: &str,
        data: String,
        value: Option<U256>,
    ) -> Result<String, WalletError> {
        let prepared_on = self.chain_id().await?;
        let gas_price = self.marked_up_gas_price().await?;
        let tx = TransactionRequest {
            from: from.to_string(),
            to: contract.to_string(),
            value,
            data: Some(data),
            gas_price,
        };
        self.submit(prepared_on, tx).await
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        let raw = self
            .provider
            .request("eth_chainId", Value::Null)
            .await
            .map_err(|e| WalletError::classify(e, TX_REJECTED))?;
        Ok(parse_quantity(&raw)?)
    }

    /// `eth_gasPrice` scaled by the configured markup; `None` when the
    /// wallet reports no price so it can pick its own fees.
    async fn marked_up_gas_price(&self) -> Result<Option<U256>, WalletError> {
        let raw = self
            .provider
            .request("eth_gasPrice", Value::Null)
            .await
            .map_err(|e| WalletError::classify(e, TX_REJECTED))?;
        let Some(price) = raw.as_str() else {
            return Ok(None);
        };
        let price = parse_u256(price)?;
        Ok(Some(
            price * U256::from(self.config.gas_price_markup_percent) / U256::from(100u64),
        ))
    }

    async fn submit(&self, prepared_on: u64, tx: TransactionRequest) -> Result<String, WalletError> {
        let current = self.chain_id().await?;
        if current != prepared_on {
            tracing::warn!(prepared_on, current, "active chain changed before submission");
            return Err(WalletError::NetworkChanged);
        }

        let hash = self
            .provider
            .request("eth_sendTransaction", json!([tx.to_json()]))
            .await
            .map_err(|e| WalletError::classify(e, TX_REJECTED))?;
        let hash = hash
            .as_str()
            .ok_or_else(|| EthError::UnexpectedResponse(hash.to_string()))?
            .to_string();
        tracing::debug!(%hash, "transaction submitted");

        self.wait_for_receipt(&hash).await
    }

    /// Polls `eth_getTransactionReceipt` until the transaction is mined.
    async fn wait_for_receipt(&self, hash: &str) -> Result<String, WalletError> {
        for _ in 0..self.config.receipt_poll_limit {
            let receipt = self
                .provider
                .request("eth_getTransactionReceipt", json!([hash]))
                .await
                .map_err(|e| WalletError::classify(e, TX_REJECTED))?;

            if !receipt.is_null() {
                if receipt.get("status").and_then(Value::as_str) == Some("0x0") {
                    return Err(EthError::Reverted(hash.to_string()).into());
                }
                let mined = receipt
                    .get("transactionHash")
                    .and_then(Value::as_str)
                    .unwrap_or(hash);
                return Ok(mined.to_string());
            }

            self.sleeper.sleep(self.config.receipt_poll_interval).await;
        }
        Err(WalletError::Timeout(format!(
            "Timed out waiting for transaction {hash} to be mined"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use futures::executor::block_on;
    use wallet_api::units::to_base_units;
    use wallet_api::{Immediate, ProviderError};

    const HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    fn mined(provider: &ScriptedProvider) {
        provider.on("eth_sendTransaction", Ok(json!(HASH)));
        provider
            .on("eth_getTransactionReceipt", Ok(Value::Null))
            .on(
                "eth_getTransactionReceipt",
                Ok(json!({"transactionHash": HASH, "status": "0x1"})),
            );
    }

    #[test]
    fn parse_u256_accepts_decimal_and_hex() {
        assert_eq!(parse_u256("1000").unwrap(), U256::from(1000u64));
        assert_eq!(parse_u256("0x3e8").unwrap(), U256::from(1000u64));
        assert!(parse_u256("ten").is_err());
    }

    #[test]
    fn request_json_omits_unset_fields() {
        let tx = TransactionRequest {
            from: "0x1".into(),
            to: "0x2".into(),
            value: Some(U256::from(255u64)),
            ..Default::default()
        };
        assert_eq!(tx.to_json(), json!({"from": "0x1", "to": "0x2", "value": "0xff"}));
    }

    #[test]
    fn native_transfer_submits_exact_wei() {
        let provider = ScriptedProvider::new();
        provider.on("eth_chainId", Ok(json!("0x1")));
        mined(&provider);
        let config = EvmConfig::default();
        let sender = TransactionSender::new(&provider, &Immediate, &config);

        let value = to_base_units(1.0, 18).unwrap();
        let hash = block_on(sender.send_native("0x123", "0x456", value)).unwrap();

        assert_eq!(hash, HASH);
        let sent = &provider.calls_to("eth_sendTransaction")[0][0];
        assert_eq!(sent["value"], "0xde0b6b3a7640000");
        assert_eq!(
            U256::from_str_radix("de0b6b3a7640000", 16).unwrap().to_string(),
            "1000000000000000000"
        );
        assert_eq!(provider.count("eth_getTransactionReceipt"), 2);
    }

    #[test]
    fn network_change_aborts_before_submission() {
        let provider = ScriptedProvider::new();
        provider
            .on("eth_chainId", Ok(json!("0x1")))
            .on("eth_chainId", Ok(json!("0x89")));
        mined(&provider);
        let config = EvmConfig::default();
        let sender = TransactionSender::new(&provider, &Immediate, &config);

        let err = block_on(sender.send_native("0x123", "0x456", U256::from(1u64))).unwrap_err();
        assert_eq!(err, WalletError::NetworkChanged);
        assert_eq!(provider.count("eth_sendTransaction"), 0);
    }

    #[test]
    fn rejection_is_normalized() {
        let provider = ScriptedProvider::new();
        provider.on("eth_chainId", Ok(json!("0x1")));
        provider.on(
            "eth_sendTransaction",
            Err(ProviderError::new(4001, "MetaMask Tx Signature: User denied transaction signature.")),
        );
        let config = EvmConfig::default();
        let sender = TransactionSender::new(&provider, &Immediate, &config);

        let err = block_on(sender.send_native("0x123", "0x456", U256::from(1u64))).unwrap_err();
        assert_eq!(err, WalletError::UserRejected(TX_REJECTED.into()));
    }

    #[test]
    fn reverted_receipt_is_an_error() {
        let provider = ScriptedProvider::new();
        provider.on("eth_chainId", Ok(json!("0x1")));
        provider.on("eth_sendTransaction", Ok(json!(HASH)));
        provider.on(
            "eth_getTransactionReceipt",
            Ok(json!({"transactionHash": HASH, "status": "0x0"})),
        );
        let config = EvmConfig::default();
        let sender = TransactionSender::new(&provider, &Immediate, &config);

        let err = block_on(sender.send_native("0x123", "0x456", U256::from(1u64))).unwrap_err();
        assert_eq!(err, WalletError::Provider(format!("transaction {HASH} reverted")));
    }

    #[test]
    fn receipt_wait_is_bounded() {
        let provider = ScriptedProvider::new();
        provider.on("eth_chainId", Ok(json!("0x1")));
        provider.on("eth_sendTransaction", Ok(json!(HASH)));
        provider.on("eth_getTransactionReceipt", Ok(Value::Null));
        let config = EvmConfig {
            receipt_poll_limit: 5,
            ..EvmConfig::default()
        };
        let sender = TransactionSender::new(&provider, &Immediate, &config);

        let err = block_on(sender.send_native("0x123", "0x456", U256::from(1u64))).unwrap_err();
        assert!(matches!(err, WalletError::Timeout(_)));
        assert_eq!(provider.count("eth_getTransactionReceipt"), 5);
    }

    #[test]
    fn contract_call_marks_up_gas_price() {
        let provider = ScriptedProvider::new();
        provider.on("eth_chainId", Ok(json!("0x1")));
        provider.on("eth_gasPrice", Ok(json!("0x64")));
        mined(&provider);
        let config = EvmConfig::default();
        let sender = TransactionSender::new(&provider, &Immediate, &config);

        let hash = block_on(sender.send_contract_call(
            "0x123",
            "0xcontract",
            "0xa9059cbb".into(),
            Some(U256::from(5u64)),
        ))
        .unwrap();

        assert_eq!(hash, HASH);
        let sent = &provider.calls_to("eth_sendTransaction")[0][0];
        // 100 * 120 / 100
        assert_eq!(sent["gasPrice"], "0x78");
        assert_eq!(sent["data"], "0xa9059cbb");
        assert_eq!(sent["value"], "0x5");
        assert_eq!(sent["to"], "0xcontract");
    }
}
