//! EIP-6963 multi-wallet discovery.
//!
//! Wallets announce themselves with `eip6963:announceProvider` after the page
//! dispatches `eip6963:requestProvider`. The browser glue forwards each
//! announcement into [`Eip6963Discovery::announce`]; everything else here is
//! plain bookkeeping so it can be exercised without a DOM.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;
use wallet_api::{NetworkType, ProviderDescriptor};

use crate::provider::Eip1193Provider;

/// `detail.info` of an EIP-6963 announcement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderInfo {
    pub uuid: String,
    pub name: String,
    pub icon: String,
    pub rdns: String,
}

#[derive(Clone)]
pub struct ProviderDetail {
    pub info: ProviderInfo,
    pub provider: Rc<dyn Eip1193Provider>,
}

impl fmt::Debug for ProviderDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDetail")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Announced wallets plus the legacy `window.ethereum` fallback.
#[derive(Default)]
pub struct Eip6963Discovery {
    announced: RefCell<Vec<ProviderDetail>>,
    default_provider: RefCell<Option<Rc<dyn Eip1193Provider>>>,
}

impl Eip6963Discovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an announcement. Wallets re-announce on every request event,
    /// so a repeated uuid replaces the earlier entry.
    pub fn announce(&self, detail: ProviderDetail) {
        let mut announced = self.announced.borrow_mut();
        match announced.iter_mut().find(|d| d.info.uuid == detail.info.uuid) {
            Some(existing) => *existing = detail,
            None => {
                tracing::debug!(name = %detail.info.name, rdns = %detail.info.rdns, "EVM wallet announced");
                announced.push(detail);
            }
        }
    }

    /// Sets the provider found at `window.ethereum`.
    pub fn set_default(&self, provider: Option<Rc<dyn Eip1193Provider>>) {
        *self.default_provider.borrow_mut() = provider;
    }

    pub fn default_provider(&self) -> Option<Rc<dyn Eip1193Provider>> {
        self.default_provider.borrow().clone()
    }

    /// Case-insensitive match on the announced wallet name.
    pub fn find_by_name(&self, name: &str) -> Option<Rc<dyn Eip1193Provider>> {
        self.announced
            .borrow()
            .iter()
            .find(|d| d.info.name.eq_ignore_ascii_case(name))
            .map(|d| Rc::clone(&d.provider))
    }

    pub fn announced(&self) -> Vec<ProviderDetail> {
        self.announced.borrow().clone()
    }

    /// Descriptors for every announced wallet, carrying its `is*` flags.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.announced
            .borrow()
            .iter()
            .map(|d| ProviderDescriptor {
                id: d.info.uuid.clone(),
                name: Some(d.info.name.clone()),
                icon: Some(d.info.icon.clone()),
                network: NetworkType::Evm,
                flags: d
                    .provider
                    .flags()
                    .into_iter()
                    .filter(|(k, _)| k.starts_with("is"))
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    fn detail(uuid: &str, name: &str, provider: Rc<ScriptedProvider>) -> ProviderDetail {
        ProviderDetail {
            info: ProviderInfo {
                uuid: uuid.into(),
                name: name.into(),
                icon: "data:image/svg+xml;base64,AA==".into(),
                rdns: format!("io.{}", name.to_lowercase()),
            },
            provider,
        }
    }

    #[test]
    fn find_by_name_is_case_insensitive() {
        let discovery = Eip6963Discovery::new();
        discovery.announce(detail("1", "MetaMask", Rc::new(ScriptedProvider::new())));
        assert!(discovery.find_by_name("metamask").is_some());
        assert!(discovery.find_by_name("METAMASK").is_some());
        assert!(discovery.find_by_name("Rabby").is_none());
    }

    #[test]
    fn reannouncement_replaces_entry() {
        let discovery = Eip6963Discovery::new();
        discovery.announce(detail("1", "MetaMask", Rc::new(ScriptedProvider::new())));
        discovery.announce(detail("1", "MetaMask", Rc::new(ScriptedProvider::new())));
        discovery.announce(detail("2", "Rabby", Rc::new(ScriptedProvider::new())));
        assert_eq!(discovery.announced().len(), 2);
    }

    #[test]
    fn descriptors_copy_is_flags_only() {
        let provider = Rc::new(
            ScriptedProvider::new()
                .with_flag("isMetaMask", true)
                .with_flag("isRabby", false)
                .with_flag("connected", true),
        );
        let discovery = Eip6963Discovery::new();
        discovery.announce(detail("uuid-mm", "MetaMask", provider));

        let descriptors = discovery.descriptors();
        assert_eq!(descriptors.len(), 1);
        let d = &descriptors[0];
        assert_eq!(d.id, "uuid-mm");
        assert_eq!(d.name.as_deref(), Some("MetaMask"));
        assert_eq!(d.network, NetworkType::Evm);
        assert_eq!(d.flags.get("isMetaMask"), Some(&true));
        assert_eq!(d.flags.get("isRabby"), Some(&false));
        assert!(!d.flags.contains_key("connected"));
    }

    #[test]
    fn default_provider_round_trip() {
        let discovery = Eip6963Discovery::new();
        assert!(discovery.default_provider().is_none());
        discovery.set_default(Some(Rc::new(ScriptedProvider::new())));
        assert!(discovery.default_provider().is_some());
    }
}
