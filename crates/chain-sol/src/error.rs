use thiserror::Error;
use wallet_api::error::codes;
use wallet_api::{ProviderError, WalletError};

/// Solana wallets word a declined prompt more loosely than EIP-1193 ones.
const REJECTION_MARKERS: &[&str] = &["user rejected", "declined", "cancelled", "denied"];

pub fn is_user_rejection(err: &ProviderError) -> bool {
    if err.has_code(codes::USER_REJECTED) {
        return true;
    }
    let message = err.message.to_lowercase();
    REJECTION_MARKERS.iter().any(|m| message.contains(m))
}

/// [`WalletError::classify`] with the Solana rejection wording.
pub fn classify(err: ProviderError, rejection_message: &str) -> WalletError {
    if is_user_rejection(&err) {
        return WalletError::UserRejected(rejection_message.to_string());
    }
    WalletError::classify(err, rejection_message)
}

/// Solana-side failures that are not raw wallet errors.
#[derive(Debug, Error)]
pub enum SolError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid blockhash: {0}")]
    InvalidBlockhash(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("rpc error: {0}")]
    Rpc(String),
}

impl From<SolError> for WalletError {
    fn from(err: SolError) -> Self {
        WalletError::Provider(err.to_string())
    }
}
