use serde::Serialize;
use thiserror::Error;

/// EIP-1193 provider error codes the strategies branch on.
pub mod codes {
    /// The user rejected the request.
    pub const USER_REJECTED: i64 = 4001;
    /// The requested chain has not been added to the wallet.
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    /// A request of the same kind is already awaiting user action.
    pub const REQUEST_PENDING: i64 = -32002;
    /// Generic internal error; several wallets use it for unknown chains.
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Message fragments EIP-1193 wallets use when the user declines a prompt.
///
/// Only user-qualified wording counts; a bare "denied" also shows up in
/// contract revert reasons.
const REJECTION_MARKERS: &[&str] = &["user rejected", "user denied", "user cancelled", "declined"];

/// Returns `true` when a wallet failure means the user declined the prompt.
///
/// Wallets disagree on how they report this, so both the standard code and
/// a set of message fragments are checked.
pub fn is_user_rejection(code: Option<i64>, message: &str) -> bool {
    if code == Some(codes::USER_REJECTED) {
        return true;
    }
    let message = message.to_lowercase();
    REJECTION_MARKERS.iter().any(|m| message.contains(m))
}

/// Raw failure reported by an injected wallet provider.
///
/// EIP-1193 providers reject with `{ code, message }`; most Solana wallets
/// only carry a message, so the code is optional.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// A failure without a numeric code.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn has_code(&self, code: i64) -> bool {
        self.code == Some(code)
    }

    pub fn is_user_rejection(&self) -> bool {
        is_user_rejection(self.code, &self.message)
    }
}

/// Coarse classification of a [`WalletError`], useful for hosts that branch
/// on the failure family rather than the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    UserRejected,
    ProviderUnavailable,
    NetworkChanged,
    Timeout,
    Unsupported,
    Unclassified,
}

/// Normalized failure of a wallet operation.
///
/// Strategies never let a raw provider error escape; everything is mapped
/// into one of these variants and returned as a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// The wallet explicitly declined the request.
    #[error("{0}")]
    UserRejected(String),

    /// No injected wallet matched the requested name or network.
    #[error("{0}")]
    ProviderUnavailable(String),

    /// The active chain changed between preparing and submitting a transaction.
    #[error("Network changed during transaction. Please try again.")]
    NetworkChanged,

    /// A bounded wait (chain switch, receipt) ran out of attempts.
    #[error("{0}")]
    Timeout(String),

    /// The operation has no meaning for this network family.
    #[error("{0}")]
    Unsupported(String),

    /// Any other provider or library failure.
    #[error("{0}")]
    Provider(String),
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::UserRejected(_) => ErrorKind::UserRejected,
            WalletError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            WalletError::NetworkChanged => ErrorKind::NetworkChanged,
            WalletError::Timeout(_) => ErrorKind::Timeout,
            WalletError::Unsupported(_) => ErrorKind::Unsupported,
            WalletError::Provider(_) => ErrorKind::Unclassified,
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, WalletError::UserRejected(_))
    }

    /// Classifies a raw provider failure, replacing the wallet's own wording
    /// with `rejection_message` when the user declined.
    pub fn classify(err: ProviderError, rejection_message: &str) -> Self {
        if err.is_user_rejection() {
            return WalletError::UserRejected(rejection_message.to_string());
        }
        if err.message.to_lowercase().contains("network changed") {
            return WalletError::NetworkChanged;
        }
        WalletError::Provider(err.message)
    }
}

impl From<ProviderError> for WalletError {
    fn from(err: ProviderError) -> Self {
        WalletError::classify(err, "User rejected the request")
    }
}

impl From<crate::units::UnitsError> for WalletError {
    fn from(err: crate::units::UnitsError) -> Self {
        WalletError::Provider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_by_code() {
        assert!(is_user_rejection(Some(4001), "anything"));
        assert!(!is_user_rejection(Some(-32603), "internal error"));
    }

    #[test]
    fn rejection_by_message() {
        assert!(is_user_rejection(None, "MetaMask Tx Signature: User denied transaction signature."));
        assert!(is_user_rejection(None, "User rejected the request."));
        assert!(is_user_rejection(None, "User cancelled the request"));
        assert!(is_user_rejection(None, "Transaction declined"));
        assert!(!is_user_rejection(None, "insufficient funds for gas"));
    }

    #[test]
    fn revert_reason_is_not_a_rejection() {
        let err: WalletError =
            ProviderError::new(-32000, "execution reverted: access denied for caller").into();
        assert_eq!(
            err,
            WalletError::Provider("execution reverted: access denied for caller".into())
        );
        assert_eq!(err.kind(), ErrorKind::Unclassified);
        assert!(!is_user_rejection(None, "Request was cancelled"));
    }

    #[test]
    fn classify_rejection_replaces_message() {
        let err = WalletError::classify(
            ProviderError::new(4001, "User rejected the request."),
            "Transaction was rejected by user",
        );
        assert_eq!(
            err,
            WalletError::UserRejected("Transaction was rejected by user".into())
        );
        assert_eq!(err.kind(), ErrorKind::UserRejected);
    }

    #[test]
    fn classify_network_change() {
        let err: WalletError = ProviderError::message("network changed: 1 => 137").into();
        assert_eq!(err, WalletError::NetworkChanged);
        assert_eq!(
            err.to_string(),
            "Network changed during transaction. Please try again."
        );
    }

    #[test]
    fn classify_other_failures_as_unclassified() {
        let err: WalletError = ProviderError::new(-32000, "insufficient funds").into();
        assert_eq!(err, WalletError::Provider("insufficient funds".into()));
        assert_eq!(err.kind(), ErrorKind::Unclassified);
    }

    #[test]
    fn provider_error_display_is_message() {
        let err = ProviderError::new(-32002, "Request already pending");
        assert_eq!(err.to_string(), "Request already pending");
        assert!(err.has_code(-32002));
    }

    #[test]
    fn error_kind_serializes_camel_case() {
        let json = serde_json::to_string(&ErrorKind::ProviderUnavailable).unwrap();
        assert_eq!(json, "\"providerUnavailable\"");
    }
}
