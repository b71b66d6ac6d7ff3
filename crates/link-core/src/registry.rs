use std::collections::BTreeMap;
use std::rc::Rc;

use wallet_api::{NetworkType, ProviderDescriptor, WalletError, WalletStrategy};

/// Strategies keyed by the network family they serve. Built by the host and
/// handed to each session; there is no process-wide instance.
#[derive(Default)]
pub struct WalletStrategyRegistry {
    strategies: BTreeMap<NetworkType, Rc<dyn WalletStrategy>>,
}

impl WalletStrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers under the strategy's own network, replacing any previous one.
    pub fn register(&mut self, strategy: Rc<dyn WalletStrategy>) {
        self.strategies.insert(strategy.network(), strategy);
    }

    pub fn with(mut self, strategy: Rc<dyn WalletStrategy>) -> Self {
        self.register(strategy);
        self
    }

    pub fn get(&self, network: NetworkType) -> Result<Rc<dyn WalletStrategy>, WalletError> {
        self.strategies.get(&network).cloned().ok_or_else(|| {
            WalletError::Unsupported(format!("No strategy found for network type: {network}"))
        })
    }

    pub fn all(&self) -> impl Iterator<Item = &Rc<dyn WalletStrategy>> {
        self.strategies.values()
    }

    /// Every provider visible to any strategy.
    pub fn all_providers(&self) -> Vec<ProviderDescriptor> {
        self.all().flat_map(|s| s.providers()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_eth::{Eip6963Discovery, EvmWalletStrategy};
    use chain_sol::testing::MemoryGlobals;
    use chain_sol::{SolanaDiscovery, SolanaWalletStrategy};
    use wallet_api::Immediate;

    fn sol_strategy() -> Rc<dyn WalletStrategy> {
        let discovery = Rc::new(SolanaDiscovery::new(Rc::new(MemoryGlobals::new())));
        Rc::new(SolanaWalletStrategy::new(
            discovery,
            Rc::new(chain_sol::testing::RecordingRpc::new()),
        ))
    }

    #[test]
    fn lookup_by_network() {
        let registry = WalletStrategyRegistry::new()
            .with(Rc::new(EvmWalletStrategy::new(
                Rc::new(Eip6963Discovery::new()),
                Rc::new(Immediate),
            )))
            .with(sol_strategy());

        assert_eq!(registry.get(NetworkType::Evm).unwrap().network(), NetworkType::Evm);
        assert_eq!(registry.get(NetworkType::Solana).unwrap().network(), NetworkType::Solana);
        assert_eq!(registry.all().count(), 2);
    }

    #[test]
    fn missing_strategy_is_unsupported() {
        let registry = WalletStrategyRegistry::new().with(sol_strategy());
        let err = registry.get(NetworkType::Evm).err().unwrap();
        assert_eq!(
            err,
            WalletError::Unsupported("No strategy found for network type: evm".into())
        );
    }
}
