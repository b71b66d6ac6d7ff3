/// Mainnet-beta public endpoint.
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Chain identifier reported for Solana; there is no chain switching.
pub const MAINNET_CHAIN_ID: &str = "101";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolanaConfig {
    /// Endpoint used to broadcast transactions signed by sign-only wallets.
    pub rpc_url: String,
    pub chain_id: String,
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: MAINNET_CHAIN_ID.to_string(),
        }
    }
}
