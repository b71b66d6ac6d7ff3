use std::collections::BTreeMap;
use std::rc::Rc;

use async_trait::async_trait;
use wallet_api::ProviderError;

use crate::transaction::SolTransaction;

/// An injected Solana wallet (`window.phantom.solana`, `window.solflare`, ...).
#[async_trait(?Send)]
pub trait SolanaProvider {
    /// Boolean `is*` properties (`isPhantom`, `isTrust`, ...).
    fn flags(&self) -> BTreeMap<String, bool> {
        BTreeMap::new()
    }

    /// `provider.connect({ onlyIfTrusted })`. Returns the public key when the
    /// wallet includes it in the response.
    async fn connect(&self, only_if_trusted: bool) -> Result<Option<String>, ProviderError>;

    /// `provider.publicKey`, for wallets that only update the property.
    fn public_key(&self) -> Option<String>;

    async fn disconnect(&self) -> Result<(), ProviderError>;

    /// Signs raw bytes and returns the 64-byte signature.
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, ProviderError>;

    /// Signs without broadcasting and returns the signed wire transaction.
    async fn sign_transaction(&self, tx: &SolTransaction) -> Result<Vec<u8>, ProviderError>;

    fn supports_sign_and_send(&self) -> bool {
        false
    }

    /// Signs and broadcasts in the wallet; returns the Base58 signature.
    async fn sign_and_send_transaction(&self, tx: &SolTransaction) -> Result<String, ProviderError> {
        let _ = tx;
        Err(ProviderError::message("signAndSendTransaction is not supported"))
    }

    fn has_flag(&self, name: &str) -> bool {
        self.flags().get(name).copied().unwrap_or(false)
    }
}

/// Read access to the page's global objects.
pub trait SolanaGlobals {
    /// Resolves a property path below `window`, e.g. `["phantom", "solana"]`.
    fn lookup(&self, path: &[&str]) -> Option<Rc<dyn SolanaProvider>>;
}
