//! EVM wallet support for the Link bridge.
//!
//! This crate provides:
//! - EIP-6963 provider discovery with a `window.ethereum` fallback
//! - The `wallet_switchEthereumChain` state machine, including adding unknown chains
//! - Native transfers and ABI-encoded contract calls submitted through the wallet
//! - `personal_sign` message signing
//! - [`EvmWalletStrategy`], tying the above to the shared strategy contract

pub mod abi;
pub mod chain_switch;
pub mod chains;
pub mod config;
pub mod discovery;
pub mod error;
pub mod provider;
pub mod signing;
pub mod strategy;
pub mod transaction;

#[cfg(target_arch = "wasm32")]
pub mod browser;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::EvmConfig;
pub use discovery::Eip6963Discovery;
pub use error::EthError;
pub use provider::Eip1193Provider;
pub use strategy::EvmWalletStrategy;
