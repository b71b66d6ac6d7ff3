use async_trait::async_trait;

use crate::error::WalletError;
use crate::types::{
    ChainSwitchOutcome, ChainSwitchRequest, ConnectOutcome, DisconnectRequest,
    NativeTransferRequest, NetworkType, ProviderDescriptor, SignRequest, SmartContractCall,
    WalletSelection,
};

/// One network family's way of talking to injected browser wallets.
///
/// Strategies never panic or leak raw provider failures: every operation
/// resolves to a value or a [`WalletError`]. Browser wallets are
/// single-threaded objects, so the futures are not `Send`.
#[async_trait(?Send)]
pub trait WalletStrategy {
    /// The network family this strategy is registered under.
    fn network(&self) -> NetworkType;

    async fn connect(&self, selection: &WalletSelection) -> Result<ConnectOutcome, WalletError>;

    async fn disconnect(&self, request: &DisconnectRequest) -> Result<(), WalletError>;

    /// Returns the signature in the network's conventional encoding
    /// (`0x` hex for EVM, base58 for Solana).
    async fn sign_message(&self, request: &SignRequest) -> Result<String, WalletError>;

    async fn switch_chain(
        &self,
        request: &ChainSwitchRequest,
    ) -> Result<ChainSwitchOutcome, WalletError>;

    /// Returns the transaction hash or signature.
    async fn send_native_transfer(
        &self,
        request: &NativeTransferRequest,
    ) -> Result<String, WalletError>;

    async fn send_smart_contract_interaction(
        &self,
        call: &SmartContractCall,
    ) -> Result<String, WalletError>;

    /// Wallets currently visible to this strategy.
    fn providers(&self) -> Vec<ProviderDescriptor>;
}
