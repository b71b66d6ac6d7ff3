use serde::Serialize;
use serde_json::{json, Value};

use crate::provider::chain_id_hex;

/// Native currency block of `wallet_addEthereumChain`.
#[derive(Debug, Clone, Serialize)]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

/// Metadata a wallet needs to add an EVM network it does not know yet.
#[derive(Debug, Clone, Serialize)]
pub struct EvmChain {
    pub chain_id: u64,
    pub name: &'static str,
    pub native_currency: NativeCurrency,
    pub rpc_urls: &'static [&'static str],
    pub explorer_name: &'static str,
    pub explorer_url: &'static str,
}

impl EvmChain {
    /// The single parameter object of `wallet_addEthereumChain`.
    pub fn add_chain_params(&self) -> Value {
        json!({
            "chainId": chain_id_hex(self.chain_id),
            "chainName": self.name,
            "nativeCurrency": self.native_currency,
            "rpcUrls": self.rpc_urls,
            "blockExplorerUrls": [self.explorer_url],
        })
    }
}

const ETHER: NativeCurrency = NativeCurrency {
    name: "Ether",
    symbol: "ETH",
    decimals: 18,
};

/// Avalanche C-Chain (chain ID 43114).
pub const AVALANCHE: EvmChain = EvmChain {
    chain_id: 43114,
    name: "Avalanche",
    native_currency: NativeCurrency {
        name: "Avalanche",
        symbol: "AVAX",
        decimals: 18,
    },
    rpc_urls: &["https://avalanche-mainnet.infura.io"],
    explorer_name: "SnowTrace",
    explorer_url: "https://snowtrace.io",
};

/// Arbitrum One (chain ID 42161).
pub const ARBITRUM: EvmChain = EvmChain {
    chain_id: 42161,
    name: "Arbitrum One",
    native_currency: ETHER,
    rpc_urls: &["https://arb1.arbitrum.io/rpc"],
    explorer_name: "Arbiscan",
    explorer_url: "https://arbiscan.io",
};

/// OP Mainnet (chain ID 10).
pub const OPTIMISM: EvmChain = EvmChain {
    chain_id: 10,
    name: "OP Mainnet",
    native_currency: ETHER,
    rpc_urls: &["https://mainnet.optimism.io"],
    explorer_name: "Optimism Explorer",
    explorer_url: "https://optimistic.etherscan.io",
};

/// Base (chain ID 8453).
pub const BASE: EvmChain = EvmChain {
    chain_id: 8453,
    name: "Base",
    native_currency: ETHER,
    rpc_urls: &["https://mainnet.base.org"],
    explorer_name: "Basescan",
    explorer_url: "https://basescan.org",
};

/// Polygon PoS (chain ID 137).
pub const POLYGON: EvmChain = EvmChain {
    chain_id: 137,
    name: "Polygon",
    native_currency: NativeCurrency {
        name: "MATIC",
        symbol: "MATIC",
        decimals: 18,
    },
    rpc_urls: &["https://polygon-rpc.com"],
    explorer_name: "PolygonScan",
    explorer_url: "https://polygonscan.com",
};

/// BNB Smart Chain (chain ID 56).
pub const BSC: EvmChain = EvmChain {
    chain_id: 56,
    name: "BNB Smart Chain",
    native_currency: NativeCurrency {
        name: "BNB",
        symbol: "BNB",
        decimals: 18,
    },
    rpc_urls: &["https://rpc.ankr.com/bsc"],
    explorer_name: "BscScan",
    explorer_url: "https://bscscan.com",
};

/// Chains the bridge can ask a wallet to add. Ethereum mainnet is absent
/// because every wallet ships with it.
const ALL_CHAINS: &[&EvmChain] = &[&AVALANCHE, &ARBITRUM, &OPTIMISM, &BASE, &POLYGON, &BSC];

/// Returns the add-chain metadata for a chain ID, or `None` if unknown.
pub fn get_chain(chain_id: u64) -> Option<&'static EvmChain> {
    ALL_CHAINS
        .iter()
        .find(|c| c.chain_id == chain_id)
        .copied()
}

pub fn supported_chains() -> Vec<&'static EvmChain> {
    ALL_CHAINS.to_vec()
}
