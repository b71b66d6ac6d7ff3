//! # wallet-api
//!
//! The contract shared by every injected-wallet strategy: the request and
//! result payloads exchanged with the embedded Link surface, the normalized
//! error taxonomy, decimal amount conversion, and the timer abstraction used
//! by retry loops.

pub mod error;
pub mod strategy;
pub mod timer;
pub mod types;
pub mod units;

pub use error::{is_user_rejection, ErrorKind, ProviderError, WalletError};
pub use strategy::WalletStrategy;
pub use timer::{Immediate, Sleeper};
pub use types::{
    ChainRef, ChainSwitchOutcome, ChainSwitchRequest, ConnectOutcome, DisconnectRequest,
    NativeTransferRequest, NetworkType, ProviderDescriptor, SignRequest, SmartContractCall,
    TransferBalanceRequest, WalletSelection,
};
