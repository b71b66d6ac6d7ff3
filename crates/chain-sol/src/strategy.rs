use std::rc::Rc;

use async_trait::async_trait;
use wallet_api::units::to_base_units;
use wallet_api::{
    ChainRef, ChainSwitchOutcome, ChainSwitchRequest, ConnectOutcome, DisconnectRequest,
    NativeTransferRequest, NetworkType, ProviderDescriptor, ProviderError, SignRequest,
    SmartContractCall, WalletError, WalletSelection, WalletStrategy,
};

use crate::config::SolanaConfig;
use crate::discovery::{SolanaDiscovery, SolanaWalletKind};
use crate::error::{classify, is_user_rejection, SolError};
use crate::provider::SolanaProvider;
use crate::rpc::SolanaRpc;
use crate::transaction::{
    build_transfer, fee_payer_signature, normalize_signature, SolTransaction, TransferConfig,
};

const TX_REJECTED: &str = "Transaction was rejected by user";
const SIGN_REJECTED: &str = "User rejected message signing";
const CONNECT_REJECTED: &str = "User rejected the connection request";
const CONTRACT_CALLS_UNSUPPORTED: &str =
    "NOT_IMPLEMENTED: Solana smart contract interactions are not yet supported";

/// Strategy for injected Solana wallets.
///
/// Providers are looked up by wallet name on every call; nothing is cached
/// between operations.
pub struct SolanaWalletStrategy {
    discovery: Rc<SolanaDiscovery>,
    rpc: Rc<dyn SolanaRpc>,
    config: SolanaConfig,
}

impl SolanaWalletStrategy {
    pub fn new(discovery: Rc<SolanaDiscovery>, rpc: Rc<dyn SolanaRpc>) -> Self {
        Self {
            discovery,
            rpc,
            config: SolanaConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SolanaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn discovery(&self) -> &Rc<SolanaDiscovery> {
        &self.discovery
    }

    fn chain_ref(&self) -> ChainRef {
        ChainRef::Name(self.config.chain_id.clone())
    }

    /// Requests without a wallet name fall back to the bare `window.solana`.
    fn provider_for(&self, wallet_name: Option<&str>) -> Result<Rc<dyn SolanaProvider>, WalletError> {
        let name = wallet_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(SolanaWalletKind::Unknown.key());
        self.discovery.get_provider(name)
    }

    /// Trust Wallet only signs; it never broadcasts on the page's behalf.
    fn is_sign_only(provider: &dyn SolanaProvider, wallet_name: Option<&str>) -> bool {
        provider.has_flag("isTrust")
            || provider.has_flag("isTrustWallet")
            || wallet_name.is_some_and(|n| n.to_lowercase().contains("trust"))
    }

    /// Signs in the wallet and broadcasts through the configured RPC endpoint.
    async fn sign_then_broadcast(
        &self,
        provider: &dyn SolanaProvider,
        tx: &SolTransaction,
    ) -> Result<String, WalletError> {
        let signed = provider
            .sign_transaction(tx)
            .await
            .map_err(|e| classify(e, TX_REJECTED))?;
        fee_payer_signature(&signed)?;
        let signature = self.rpc.send_raw_transaction(&signed).await?;
        Ok(normalize_signature(&signature))
    }

    async fn submit(
        &self,
        provider: &dyn SolanaProvider,
        wallet_name: Option<&str>,
        tx: &SolTransaction,
    ) -> Result<String, WalletError> {
        if Self::is_sign_only(provider, wallet_name) || !provider.supports_sign_and_send() {
            return self.sign_then_broadcast(provider, tx).await;
        }

        match provider.sign_and_send_transaction(tx).await {
            Ok(signature) => Ok(normalize_signature(&signature)),
            Err(err) if is_user_rejection(&err) => {
                Err(WalletError::UserRejected(TX_REJECTED.into()))
            }
            Err(err) => {
                tracing::warn!(error = %err, "signAndSendTransaction failed, signing manually");
                self.sign_then_broadcast(provider, tx).await
            }
        }
    }
}

#[async_trait(?Send)]
impl WalletStrategy for SolanaWalletStrategy {
    fn network(&self) -> NetworkType {
        NetworkType::Solana
    }

    async fn connect(&self, selection: &WalletSelection) -> Result<ConnectOutcome, WalletError> {
        let name = &selection.integration_name;
        let provider = self.discovery.get_provider(name)?;

        let response = match provider.connect(true).await {
            Ok(key) => key,
            Err(err) => {
                tracing::debug!(error = %err, "trusted connect declined, prompting");
                provider
                    .connect(false)
                    .await
                    .map_err(|e: ProviderError| classify(e, CONNECT_REJECTED))?
            }
        };

        let public_key = response
            .or_else(|| provider.public_key())
            .ok_or_else(|| {
                WalletError::Provider(format!("{name} connection failed - no public key returned"))
            })?;

        tracing::debug!(wallet = %name, %public_key, "Solana wallet connected");
        Ok(ConnectOutcome {
            accounts: vec![public_key],
            chain_id: self.chain_ref(),
            is_connected: true,
        })
    }

    async fn disconnect(&self, request: &DisconnectRequest) -> Result<(), WalletError> {
        let provider = match self.provider_for(request.wallet_name.as_deref()) {
            Ok(provider) => provider,
            Err(err) => {
                tracing::debug!(error = %err, "nothing to disconnect");
                return Ok(());
            }
        };
        if let Err(err) = provider.disconnect().await {
            tracing::warn!(error = %err, "Solana wallet disconnect failed");
        }
        Ok(())
    }

    async fn sign_message(&self, request: &SignRequest) -> Result<String, WalletError> {
        let provider = self.provider_for(request.wallet_name.as_deref())?;
        let signature = provider
            .sign_message(request.message.as_bytes())
            .await
            .map_err(|e| classify(e, SIGN_REJECTED))?;
        Ok(bs58::encode(signature).into_string())
    }

    async fn switch_chain(
        &self,
        _request: &ChainSwitchRequest,
    ) -> Result<ChainSwitchOutcome, WalletError> {
        Ok(ChainSwitchOutcome {
            chain_id: self.chain_ref(),
            accounts: Vec::new(),
        })
    }

    async fn send_native_transfer(
        &self,
        request: &NativeTransferRequest,
    ) -> Result<String, WalletError> {
        let wallet_name = request.wallet_name.as_deref();
        let provider = self.provider_for(wallet_name)?;

        let lamports = to_base_units(request.amount, request.decimal_places)?;
        let lamports = u64::try_from(lamports).map_err(|_| {
            SolError::TransactionBuildError(format!("amount {} exceeds u64 lamports", request.amount))
        })?;

        let tx = build_transfer(&TransferConfig {
            from_address: &request.account,
            to_address: &request.to_address,
            lamports,
            blockhash: request.blockhash.as_deref().unwrap_or_default(),
        })?;

        self.submit(provider.as_ref(), wallet_name, &tx).await
    }

    async fn send_smart_contract_interaction(
        &self,
        _call: &SmartContractCall,
    ) -> Result<String, WalletError> {
        Err(WalletError::Unsupported(CONTRACT_CALLS_UNSUPPORTED.into()))
    }

    fn providers(&self) -> Vec<ProviderDescriptor> {
        self.discovery.descriptors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::bytes_to_address;
    use crate::testing::{MemoryGlobals, RecordingRpc, ScriptedSolanaProvider};
    use futures::executor::block_on;

    struct Fixture {
        wallet: Rc<ScriptedSolanaProvider>,
        rpc: Rc<RecordingRpc>,
        strategy: SolanaWalletStrategy,
    }

    fn fixture(path: &[&str], wallet: ScriptedSolanaProvider) -> Fixture {
        let wallet = Rc::new(wallet);
        let rpc = Rc::new(RecordingRpc::new());
        let globals = MemoryGlobals::new().with_rc(path, wallet.clone());
        let strategy = SolanaWalletStrategy::new(
            Rc::new(SolanaDiscovery::new(Rc::new(globals))),
            rpc.clone(),
        );
        Fixture {
            wallet,
            rpc,
            strategy,
        }
    }

    fn phantom() -> Fixture {
        fixture(&["phantom", "solana"], ScriptedSolanaProvider::new())
    }

    fn transfer(wallet_name: &str) -> NativeTransferRequest {
        NativeTransferRequest {
            to_address: bytes_to_address(&[2u8; 32]),
            amount: 0.5,
            decimal_places: 9,
            chain_id: 101,
            account: bytes_to_address(&[1u8; 32]),
            network: "solana".into(),
            blockhash: Some(bytes_to_address(&[9u8; 32])),
            wallet_name: Some(wallet_name.into()),
        }
    }

    #[test]
    fn connect_trusted() {
        let f = phantom();
        f.wallet.on_connect(Ok(Some("PubKey111".into())));

        let outcome = block_on(f.strategy.connect(&WalletSelection::named("Phantom"))).unwrap();
        assert_eq!(outcome.accounts, vec!["PubKey111"]);
        assert_eq!(outcome.chain_id, ChainRef::Name("101".into()));
        assert!(outcome.is_connected);
        assert_eq!(f.wallet.calls(), vec!["connect_trusted"]);
    }

    #[test]
    fn connect_falls_back_to_interactive_and_provider_key() {
        let f = fixture(
            &["solflare"],
            ScriptedSolanaProvider::new().with_public_key("FromProvider"),
        );
        f.wallet
            .on_connect(Err(ProviderError::message("not trusted")))
            .on_connect(Ok(None));

        let outcome = block_on(f.strategy.connect(&WalletSelection::named("Solflare"))).unwrap();
        assert_eq!(outcome.accounts, vec!["FromProvider"]);
        assert_eq!(f.wallet.calls(), vec!["connect_trusted", "connect"]);
    }

    #[test]
    fn connect_without_public_key() {
        let f = phantom();
        f.wallet.on_connect(Ok(None));
        let err = block_on(f.strategy.connect(&WalletSelection::named("Phantom"))).unwrap_err();
        assert_eq!(
            err,
            WalletError::Provider("Phantom connection failed - no public key returned".into())
        );
    }

    #[test]
    fn connect_rejected() {
        let f = phantom();
        f.wallet
            .on_connect(Err(ProviderError::message("not trusted")))
            .on_connect(Err(ProviderError::new(4001, "User rejected the request.")));
        let err = block_on(f.strategy.connect(&WalletSelection::named("Phantom"))).unwrap_err();
        assert!(err.is_user_rejection());
    }

    #[test]
    fn sign_message_returns_base58() {
        let f = phantom();
        f.wallet.on_sign_message(Ok(vec![0u8, 0, 1]));
        let sig = block_on(f.strategy.sign_message(&SignRequest {
            address: "PubKey111".into(),
            message: "hello".into(),
            wallet_name: Some("Phantom".into()),
            network_type: Some("solana".into()),
        }))
        .unwrap();
        assert_eq!(sig, bs58::encode([0u8, 0, 1]).into_string());
    }

    #[test]
    fn switch_chain_is_fixed() {
        let f = phantom();
        let outcome = block_on(f.strategy.switch_chain(&ChainSwitchRequest {
            chain_id: 1,
            network_type: None,
            wallet_name: None,
        }))
        .unwrap();
        assert_eq!(outcome.chain_id, ChainRef::Name("101".into()));
        assert!(outcome.accounts.is_empty());
    }

    #[test]
    fn transfer_through_sign_and_send() {
        let f = phantom();
        f.wallet.on_sign_and_send(Ok("5xSig".into()));
        let sig = block_on(f.strategy.send_native_transfer(&transfer("Phantom"))).unwrap();
        assert_eq!(sig, "5xSig");
        assert!(f.rpc.sent().is_empty());
    }

    #[test]
    fn transfer_rejection_is_not_retried() {
        let f = phantom();
        f.wallet
            .on_sign_and_send(Err(ProviderError::message("User rejected the request.")));
        let err = block_on(f.strategy.send_native_transfer(&transfer("Phantom"))).unwrap_err();
        assert_eq!(err, WalletError::UserRejected(TX_REJECTED.into()));
        assert_eq!(f.wallet.count("sign_transaction"), 0);
    }

    #[test]
    fn transfer_falls_back_to_manual_broadcast() {
        let f = phantom();
        f.wallet
            .on_sign_and_send(Err(ProviderError::message("method not implemented")));
        f.rpc.respond(Ok("RpcSig"));

        let sig = block_on(f.strategy.send_native_transfer(&transfer("Phantom"))).unwrap();
        assert_eq!(sig, "RpcSig");
        assert_eq!(f.wallet.calls(), vec!["sign_and_send", "sign_transaction"]);
        assert_eq!(f.rpc.sent().len(), 1);
    }

    #[test]
    fn trust_wallet_always_signs_manually() {
        let f = fixture(
            &["trustwallet", "solana"],
            ScriptedSolanaProvider::new().with_flag("isTrust", true),
        );
        f.wallet.on_sign_and_send(Ok("never".into()));
        f.rpc.respond(Ok("TrustSig"));

        let sig = block_on(f.strategy.send_native_transfer(&transfer("Trust Wallet"))).unwrap();
        assert_eq!(sig, "TrustSig");
        assert_eq!(f.wallet.count("sign_and_send"), 0);

        let wire = &f.rpc.sent()[0];
        assert!(wire[1..65].iter().all(|b| *b == 0x11));
    }

    #[test]
    fn manual_path_rejects_unsigned_result() {
        let f = fixture(&["trustwallet", "solana"], ScriptedSolanaProvider::new());
        let mut unsigned = vec![0u8; 80];
        unsigned[0] = 1;
        f.wallet.on_sign_transaction(Ok(unsigned));
        let err = block_on(f.strategy.send_native_transfer(&transfer("Trust Wallet"))).unwrap_err();
        assert!(err.to_string().contains("unsigned transaction"));
        assert!(f.rpc.sent().is_empty());
    }

    #[test]
    fn rpc_failure_is_reported() {
        let f = fixture(&["trustwallet", "solana"], ScriptedSolanaProvider::new());
        f.rpc.respond(Err("Blockhash not found"));
        let err = block_on(f.strategy.send_native_transfer(&transfer("Trust Wallet"))).unwrap_err();
        assert_eq!(err, WalletError::Provider("rpc error: Blockhash not found".into()));
    }

    #[test]
    fn transfer_requires_blockhash() {
        let f = phantom();
        let mut request = transfer("Phantom");
        request.blockhash = None;
        let err = block_on(f.strategy.send_native_transfer(&request)).unwrap_err();
        assert!(err.to_string().contains("missing recent blockhash"));
    }

    #[test]
    fn smart_contract_calls_unsupported() {
        let f = phantom();
        let err = block_on(f.strategy.send_smart_contract_interaction(&SmartContractCall {
            address: "x".into(),
            abi: "[]".into(),
            function_name: "f".into(),
            args: Vec::new(),
            account: "y".into(),
            value: None,
        }))
        .unwrap_err();
        assert_eq!(err, WalletError::Unsupported(CONTRACT_CALLS_UNSUPPORTED.into()));
    }

    #[test]
    fn disconnect_is_best_effort() {
        let f = phantom();
        f.wallet.on_disconnect(Err(ProviderError::message("already disconnected")));
        let request = DisconnectRequest {
            network_type: Some("solana".into()),
            wallet_name: Some("Phantom".into()),
        };
        assert!(block_on(f.strategy.disconnect(&request)).is_ok());
        assert_eq!(f.wallet.count("disconnect"), 1);

        let missing = DisconnectRequest {
            network_type: None,
            wallet_name: Some("Backpack".into()),
        };
        assert!(block_on(f.strategy.disconnect(&missing)).is_ok());
    }

    #[test]
    fn providers_list_detected_wallets() {
        let f = phantom();
        let ids: Vec<String> = f.strategy.providers().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["phantom"]);
    }
}
