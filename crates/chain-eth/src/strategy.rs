use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;
use wallet_api::units::to_base_units;
use wallet_api::{
    ChainRef, ChainSwitchOutcome, ChainSwitchRequest, ConnectOutcome, DisconnectRequest,
    NativeTransferRequest, NetworkType, ProviderDescriptor, ProviderError, SignRequest, Sleeper,
    SmartContractCall, WalletError, WalletSelection, WalletStrategy,
};

use crate::abi;
use crate::chain_switch::ChainSwitchCoordinator;
use crate::config::EvmConfig;
use crate::discovery::Eip6963Discovery;
use crate::provider::{parse_quantity, string_list, Eip1193Provider};
use crate::signing;
use crate::transaction::{parse_u256, TransactionSender};

const CONNECT_REJECTED: &str = "User rejected the connection request";

/// Strategy for EIP-1193 wallets.
///
/// Holds the provider of the most recent successful connect; every other
/// operation runs against it. A later connect replaces it.
pub struct EvmWalletStrategy {
    discovery: Rc<Eip6963Discovery>,
    sleeper: Rc<dyn Sleeper>,
    config: EvmConfig,
    active: RefCell<Option<Rc<dyn Eip1193Provider>>>,
}

impl EvmWalletStrategy {
    pub fn new(discovery: Rc<Eip6963Discovery>, sleeper: Rc<dyn Sleeper>) -> Self {
        Self {
            discovery,
            sleeper,
            config: EvmConfig::default(),
            active: RefCell::new(None),
        }
    }

    pub fn with_config(mut self, config: EvmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn discovery(&self) -> &Rc<Eip6963Discovery> {
        &self.discovery
    }

    pub fn active_provider(&self) -> Option<Rc<dyn Eip1193Provider>> {
        self.active.borrow().clone()
    }

    /// Announced wallet with a matching name, else `window.ethereum`.
    fn resolve_provider(&self, wallet_name: &str) -> Result<Rc<dyn Eip1193Provider>, WalletError> {
        if wallet_name.trim().is_empty() {
            return Err(WalletError::ProviderUnavailable("Wallet name is required".into()));
        }
        self.discovery
            .find_by_name(wallet_name)
            .or_else(|| self.discovery.default_provider())
            .ok_or_else(|| {
                WalletError::ProviderUnavailable(format!("No provider found for wallet {wallet_name}"))
            })
    }

    fn require_active(&self) -> Result<Rc<dyn Eip1193Provider>, WalletError> {
        self.active_provider()
            .ok_or_else(|| WalletError::ProviderUnavailable("No active EVM provider".into()))
    }

    /// Connects a specific provider, bypassing name resolution.
    pub async fn connect_provider(
        &self,
        provider: Rc<dyn Eip1193Provider>,
        target_chain_id: Option<u64>,
    ) -> Result<ConnectOutcome, WalletError> {
        *self.active.borrow_mut() = Some(Rc::clone(&provider));
        let result = self.establish(provider.as_ref(), target_chain_id).await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "EVM wallet connection failed");
            self.active.borrow_mut().take();
        }
        result
    }

    async fn establish(
        &self,
        provider: &dyn Eip1193Provider,
        target_chain_id: Option<u64>,
    ) -> Result<ConnectOutcome, WalletError> {
        let reject = |e: ProviderError| WalletError::classify(e, CONNECT_REJECTED);

        let existing = provider
            .request("eth_accounts", Value::Null)
            .await
            .map_err(reject)?;
        let mut accounts = string_list(&existing);
        if accounts.is_empty() {
            let granted = provider
                .request("eth_requestAccounts", Value::Null)
                .await
                .map_err(reject)?;
            accounts = string_list(&granted);
        }
        let address = accounts
            .into_iter()
            .next()
            .ok_or_else(|| WalletError::Provider("Wallet returned no accounts".into()))?;

        let mut chain_id = parse_quantity(
            &provider
                .request("eth_chainId", Value::Null)
                .await
                .map_err(reject)?,
        )?;

        if let Some(target) = target_chain_id.filter(|t| *t != 0 && *t != chain_id) {
            ChainSwitchCoordinator::new(provider, self.sleeper.as_ref(), &self.config)
                .switch_to(target)
                .await?;
            chain_id = target;
        }

        tracing::debug!(%address, chain_id, "EVM wallet connected");
        Ok(ConnectOutcome {
            accounts: vec![address],
            chain_id: ChainRef::Id(chain_id),
            is_connected: true,
        })
    }
}

#[async_trait(?Send)]
impl WalletStrategy for EvmWalletStrategy {
    fn network(&self) -> NetworkType {
        NetworkType::Evm
    }

    async fn connect(&self, selection: &WalletSelection) -> Result<ConnectOutcome, WalletError> {
        let provider = self.resolve_provider(&selection.integration_name)?;
        self.connect_provider(provider, selection.target_chain_id).await
    }

    async fn disconnect(&self, _request: &DisconnectRequest) -> Result<(), WalletError> {
        let provider = self.active.borrow_mut().take();
        if let Some(provider) = provider {
            provider.remove_all_listeners();
            tracing::debug!("EVM wallet disconnected");
        }
        Ok(())
    }

    async fn sign_message(&self, request: &SignRequest) -> Result<String, WalletError> {
        let provider = self.require_active()?;
        signing::sign_message(
            provider.as_ref(),
            request.wallet_name.as_deref(),
            &request.address,
            &request.message,
        )
        .await
    }

    async fn switch_chain(
        &self,
        request: &ChainSwitchRequest,
    ) -> Result<ChainSwitchOutcome, WalletError> {
        let provider = self.require_active()?;
        ChainSwitchCoordinator::new(provider.as_ref(), self.sleeper.as_ref(), &self.config)
            .switch_to(request.chain_id)
            .await
    }

    async fn send_native_transfer(
        &self,
        request: &NativeTransferRequest,
    ) -> Result<String, WalletError> {
        let provider = self.require_active()?;
        let value = to_base_units(request.amount, request.decimal_places)?;
        TransactionSender::new(provider.as_ref(), self.sleeper.as_ref(), &self.config)
            .send_native(&request.account, &request.to_address, value)
            .await
    }

    async fn send_smart_contract_interaction(
        &self,
        call: &SmartContractCall,
    ) -> Result<String, WalletError> {
        let provider = self.require_active()?;
        let data = abi::encode_call(&call.abi, &call.function_name, &call.args)?;
        let value = call
            .value
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(parse_u256)
            .transpose()?;
        TransactionSender::new(provider.as_ref(), self.sleeper.as_ref(), &self.config)
            .send_contract_call(&call.account, &call.address, data, value)
            .await
    }

    fn providers(&self) -> Vec<ProviderDescriptor> {
        self.discovery.descriptors()
    }
}
