//! Solana wallet support for the Link bridge.
//!
//! Wallets are found by probing well-known page globals. Native transfers are
//! compiled here into the legacy wire format without `solana-sdk`; the wallet
//! signs them and either broadcasts itself or hands the signed bytes back for
//! a JSON-RPC `sendTransaction`.

pub mod address;
pub mod config;
pub mod discovery;
pub mod error;
pub mod provider;
pub mod rpc;
pub mod strategy;
pub mod transaction;

#[cfg(target_arch = "wasm32")]
pub mod browser;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::SolanaConfig;
pub use discovery::{SolanaDiscovery, SolanaWalletKind};
pub use error::SolError;
pub use provider::{SolanaGlobals, SolanaProvider};
pub use rpc::{JsonRpcClient, SolanaRpc};
pub use strategy::SolanaWalletStrategy;
