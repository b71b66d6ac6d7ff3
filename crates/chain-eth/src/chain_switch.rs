//! `wallet_switchEthereumChain` with the recovery paths wallets require.
//!
//! ```text
//!   Requesting ──ok──────────────────────────────▶ Done
//!      │  -32002            4902 / -32603
//!      ▼                          │
//!   AwaitingPending ──match──▶ Done     AddingChain ──ok──▶ Requesting (once)
//!      │ attempts exhausted                │ 4001 / no table entry
//!      ▼                                   ▼
//!    Failed                              Failed
//! ```

use serde_json::{json, Value};
use wallet_api::error::codes;
use wallet_api::{ChainRef, ChainSwitchOutcome, ProviderError, Sleeper, WalletError};

use crate::chains;
use crate::config::EvmConfig;
use crate::provider::{chain_id_hex, parse_quantity, string_list, Eip1193Provider};

pub const SWITCH_REJECTED: &str = "User rejected chain switch";
pub const ADD_REJECTED: &str = "User rejected chain add";
pub const SWITCH_TIMEOUT: &str = "Chain switch timeout";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchState {
    /// Issue the switch call. `retried` is set once a chain add already
    /// happened, so an unknown-chain answer is final.
    Requesting { retried: bool },
    AwaitingPending { attempt: u32, renewals: u32 },
    AddingChain,
    Done,
    Failed(WalletError),
}

pub struct ChainSwitchCoordinator<'a> {
    provider: &'a dyn Eip1193Provider,
    sleeper: &'a dyn Sleeper,
    config: &'a EvmConfig,
}

impl<'a> ChainSwitchCoordinator<'a> {
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

    /// Drives the state machine to a terminal state and, on success, reads
    /// the accounts exposed on the new chain.
    pub async fn switch_to(&self, chain_id: u64) -> Result<ChainSwitchOutcome, WalletError> {
        let mut state = SwitchState::Requesting { retried: false };
        loop {
            tracing::debug!(chain_id, ?state, "chain switch step");
            state = match state {
                SwitchState::Requesting { retried } => self.request(chain_id, retried).await,
                SwitchState::AwaitingPending { attempt, renewals } => {
                    self.poll(chain_id, attempt, renewals).await
                }
                SwitchState::AddingChain => self.add_chain(chain_id).await,
                SwitchState::Done => break,
                SwitchState::Failed(err) => {
                    tracing::warn!(chain_id, error = %err, "chain switch failed");
                    return Err(err);
                }
            };
        }

        let accounts = self
            .provider
            .request("eth_accounts", Value::Null)
            .await
            .map_err(WalletError::from)?;
        Ok(ChainSwitchOutcome {
            chain_id: ChainRef::Id(chain_id),
            accounts: string_list(&accounts),
        })
    }

    async fn request(&self, chain_id: u64, retried: bool) -> SwitchState {
        let params = json!([{ "chainId": chain_id_hex(chain_id) }]);
        match self
            .provider
            .request("wallet_switchEthereumChain", params)
            .await
        {
            Ok(_) => SwitchState::Done,
            Err(err) => self.on_switch_error(err, retried),
        }
    }

    fn on_switch_error(&self, err: ProviderError, retried: bool) -> SwitchState {
        if err.is_user_rejection() {
            return SwitchState::Failed(WalletError::UserRejected(SWITCH_REJECTED.into()));
        }
        match err.code {
            Some(codes::REQUEST_PENDING) => SwitchState::AwaitingPending {
                attempt: 0,
                renewals: 0,
            },
            Some(codes::UNRECOGNIZED_CHAIN | codes::INTERNAL_ERROR) if !retried => {
                SwitchState::AddingChain
            }
            _ => SwitchState::Failed(WalletError::classify(err, SWITCH_REJECTED)),
        }
    }

    async fn poll(&self, chain_id: u64, attempt: u32, renewals: u32) -> SwitchState {
        let next = match self.provider.request("eth_chainId", Value::Null).await {
            Ok(current) => {
                if parse_quantity(&current).ok() == Some(chain_id) {
                    return SwitchState::Done;
                }
                if attempt >= self.config.switch_retries {
                    return SwitchState::Failed(WalletError::Timeout(SWITCH_TIMEOUT.into()));
                }
                SwitchState::AwaitingPending {
                    attempt: attempt + 1,
                    renewals,
                }
            }
            Err(err) if err.has_code(codes::REQUEST_PENDING) => {
                if renewals >= self.config.pending_renewals {
                    return SwitchState::Failed(WalletError::Timeout(SWITCH_TIMEOUT.into()));
                }
                SwitchState::AwaitingPending {
                    attempt,
                    renewals: renewals + 1,
                }
            }
            Err(err) => return SwitchState::Failed(WalletError::classify(err, SWITCH_REJECTED)),
        };
        self.sleeper.sleep(self.config.switch_retry_delay).await;
        next
    }

    async fn add_chain(&self, chain_id: u64) -> SwitchState {
        let Some(chain) = chains::get_chain(chain_id) else {
            return SwitchState::Failed(WalletError::Unsupported(format!(
                "No configuration found for chain {chain_id}"
            )));
        };

        match self
            .provider
            .request("wallet_addEthereumChain", json!([chain.add_chain_params()]))
            .await
        {
            Ok(_) => SwitchState::Requesting { retried: true },
            Err(err) if err.is_user_rejection() => {
                SwitchState::Failed(WalletError::UserRejected(ADD_REJECTED.into()))
            }
            Err(err) => SwitchState::Failed(WalletError::classify(err, ADD_REJECTED)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use futures::executor::block_on;
    use wallet_api::Immediate;

    fn run(provider: &ScriptedProvider, chain_id: u64) -> Result<ChainSwitchOutcome, WalletError> {
        let config = EvmConfig::default();
        block_on(ChainSwitchCoordinator::new(provider, &Immediate, &config).switch_to(chain_id))
    }

    fn accounts(provider: &ScriptedProvider) {
        provider.on("eth_accounts", Ok(json!(["0xabc"])));
    }

    #[test]
    fn direct_switch_succeeds() {
        let provider = ScriptedProvider::new();
        provider.on("wallet_switchEthereumChain", Ok(Value::Null));
        accounts(&provider);

        let outcome = run(&provider, 137).unwrap();
        assert_eq!(outcome.chain_id, ChainRef::Id(137));
        assert_eq!(outcome.accounts, vec!["0xabc"]);
        assert_eq!(
            provider.calls_to("wallet_switchEthereumChain")[0],
            json!([{ "chainId": "0x89" }])
        );
    }

    #[test]
    fn rejection_fails_immediately() {
        let provider = ScriptedProvider::new();
        provider.on(
            "wallet_switchEthereumChain",
            Err(ProviderError::new(4001, "User rejected the request.")),
        );

        let err = run(&provider, 137).unwrap_err();
        assert_eq!(err, WalletError::UserRejected(SWITCH_REJECTED.into()));
        assert_eq!(provider.count("eth_accounts"), 0);
    }

    #[test]
    fn pending_resolves_after_n_polls() {
        let provider = ScriptedProvider::new();
        provider.on(
            "wallet_switchEthereumChain",
            Err(ProviderError::new(-32002, "Request already pending")),
        );
        provider
            .on("eth_chainId", Ok(json!("0x1")))
            .on("eth_chainId", Ok(json!("0x1")))
            .on("eth_chainId", Ok(json!("0x89")));
        accounts(&provider);

        let outcome = run(&provider, 137).unwrap();
        assert_eq!(outcome.chain_id, ChainRef::Id(137));
        assert_eq!(provider.count("eth_chainId"), 3);
    }

    #[test]
    fn pending_times_out_after_retry_budget() {
        let provider = ScriptedProvider::new();
        provider.on(
            "wallet_switchEthereumChain",
            Err(ProviderError::new(-32002, "Request already pending")),
        );
        provider.on("eth_chainId", Ok(json!("0x1")));

        let err = run(&provider, 137).unwrap_err();
        assert_eq!(err, WalletError::Timeout(SWITCH_TIMEOUT.into()));
        // first poll plus three retries
        assert_eq!(provider.count("eth_chainId"), 4);
    }

    #[test]
    fn renewed_pending_does_not_consume_attempts() {
        let provider = ScriptedProvider::new();
        provider.on(
            "wallet_switchEthereumChain",
            Err(ProviderError::new(-32002, "Request already pending")),
        );
        let pending = || Err(ProviderError::new(-32002, "still pending"));
        provider
            .on("eth_chainId", pending())
            .on("eth_chainId", pending())
            .on("eth_chainId", Ok(json!("0x1")))
            .on("eth_chainId", Ok(json!("0x1")))
            .on("eth_chainId", Ok(json!("0x1")))
            .on("eth_chainId", Ok(json!("0x89")));
        accounts(&provider);

        assert!(run(&provider, 137).is_ok());
        assert_eq!(provider.count("eth_chainId"), 6);
    }

    #[test]
    fn endless_pending_is_bounded() {
        let provider = ScriptedProvider::new();
        provider.on(
            "wallet_switchEthereumChain",
            Err(ProviderError::new(-32002, "Request already pending")),
        );
        provider.on("eth_chainId", Err(ProviderError::new(-32002, "still pending")));

        let err = run(&provider, 137).unwrap_err();
        assert_eq!(err, WalletError::Timeout(SWITCH_TIMEOUT.into()));
        assert_eq!(
            provider.count("eth_chainId") as u32,
            EvmConfig::default().pending_renewals + 1
        );
    }

    #[test]
    fn unknown_chain_is_added_then_retried_once() {
        let provider = ScriptedProvider::new();
        provider
            .on(
                "wallet_switchEthereumChain",
                Err(ProviderError::new(4902, "Unrecognized chain ID")),
            )
            .on("wallet_switchEthereumChain", Ok(Value::Null));
        provider.on("wallet_addEthereumChain", Ok(Value::Null));
        accounts(&provider);

        let outcome = run(&provider, 8453).unwrap();
        assert_eq!(outcome.chain_id, ChainRef::Id(8453));
        assert_eq!(provider.count("wallet_switchEthereumChain"), 2);
        let added = &provider.calls_to("wallet_addEthereumChain")[0];
        assert_eq!(added[0]["chainName"], "Base");
    }

    #[test]
    fn internal_error_also_triggers_add() {
        let provider = ScriptedProvider::new();
        provider
            .on(
                "wallet_switchEthereumChain",
                Err(ProviderError::new(-32603, "Internal JSON-RPC error")),
            )
            .on("wallet_switchEthereumChain", Ok(Value::Null));
        provider.on("wallet_addEthereumChain", Ok(Value::Null));
        accounts(&provider);

        assert!(run(&provider, 56).is_ok());
        assert_eq!(provider.count("wallet_addEthereumChain"), 1);
    }

    #[test]
    fn unknown_chain_after_add_fails() {
        let provider = ScriptedProvider::new();
        provider.on(
            "wallet_switchEthereumChain",
            Err(ProviderError::new(4902, "Unrecognized chain ID")),
        );
        provider.on("wallet_addEthereumChain", Ok(Value::Null));

        let err = run(&provider, 10).unwrap_err();
        assert_eq!(err, WalletError::Provider("Unrecognized chain ID".into()));
        assert_eq!(provider.count("wallet_addEthereumChain"), 1);
        assert_eq!(provider.count("wallet_switchEthereumChain"), 2);
    }

    #[test]
    fn missing_chain_configuration() {
        let provider = ScriptedProvider::new();
        provider.on(
            "wallet_switchEthereumChain",
            Err(ProviderError::new(4902, "Unrecognized chain ID")),
        );

        let err = run(&provider, 424242).unwrap_err();
        assert_eq!(
            err,
            WalletError::Unsupported("No configuration found for chain 424242".into())
        );
        assert_eq!(provider.count("wallet_addEthereumChain"), 0);
    }

    #[test]
    fn add_rejection_fails() {
        let provider = ScriptedProvider::new();
        provider.on(
            "wallet_switchEthereumChain",
            Err(ProviderError::new(4902, "Unrecognized chain ID")),
        );
        provider.on(
            "wallet_addEthereumChain",
            Err(ProviderError::new(4001, "User rejected the request.")),
        );

        let err = run(&provider, 137).unwrap_err();
        assert_eq!(err, WalletError::UserRejected(ADD_REJECTED.into()));
        assert_eq!(provider.count("wallet_switchEthereumChain"), 1);
    }

    #[test]
    fn other_errors_are_unclassified() {
        let provider = ScriptedProvider::new();
        provider.on(
            "wallet_switchEthereumChain",
            Err(ProviderError::new(-32000, "wallet locked")),
        );

        let err = run(&provider, 137).unwrap_err();
        assert_eq!(err, WalletError::Provider("wallet locked".into()));
    }
}
