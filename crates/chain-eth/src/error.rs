use thiserror::Error;
use wallet_api::WalletError;

/// EVM-side failures that are not raw provider errors.
#[derive(Debug, Error)]
pub enum EthError {
    #[error("invalid ABI: {0}")]
    InvalidAbi(String),

    #[error("function {0} not found in ABI")]
    UnknownFunction(String),

    #[error("argument encoding error: {0}")]
    EncodingError(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("unexpected provider response: {0}")]
    UnexpectedResponse(String),

    #[error("transaction {0} reverted")]
    Reverted(String),
}

impl From<EthError> for WalletError {
    fn from(err: EthError) -> Self {
        WalletError::Provider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_abi() {
        let err = EthError::InvalidAbi("expected value at line 1".into());
        assert_eq!(err.to_string(), "invalid ABI: expected value at line 1");
    }

    #[test]
    fn display_unknown_function() {
        let err = EthError::UnknownFunction("deposit".into());
        assert_eq!(err.to_string(), "function deposit not found in ABI");
    }

    #[test]
    fn display_invalid_quantity() {
        let err = EthError::InvalidQuantity("0xzz".into());
        assert_eq!(err.to_string(), "invalid quantity: 0xzz");
    }

    #[test]
    fn display_reverted() {
        let err = EthError::Reverted("0xabc".into());
        assert_eq!(err.to_string(), "transaction 0xabc reverted");
    }

    #[test]
    fn converts_into_unclassified_wallet_error() {
        let err: WalletError = EthError::EncodingError("bad uint".into()).into();
        assert_eq!(err, WalletError::Provider("argument encoding error: bad uint".into()));
    }

    #[test]
    fn error_trait_is_implemented() {
        let err: Box<dyn std::error::Error> = Box::new(EthError::InvalidAddress("0x12".into()));
        assert!(err.to_string().contains("0x12"));
    }
}
