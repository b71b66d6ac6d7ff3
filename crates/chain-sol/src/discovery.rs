//! Probing of well-known Solana wallet globals.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use wallet_api::{NetworkType, ProviderDescriptor, WalletError};

use crate::provider::{SolanaGlobals, SolanaProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SolanaWalletKind {
    Phantom,
    Solflare,
    Trust,
    Exodus,
    Unknown,
}

impl SolanaWalletKind {
    pub const ALL: [SolanaWalletKind; 5] = [
        SolanaWalletKind::Phantom,
        SolanaWalletKind::Solflare,
        SolanaWalletKind::Trust,
        SolanaWalletKind::Exodus,
        SolanaWalletKind::Unknown,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SolanaWalletKind::Phantom => "phantom",
            SolanaWalletKind::Solflare => "solflare",
            SolanaWalletKind::Trust => "trustwallet",
            SolanaWalletKind::Exodus => "exodus",
            SolanaWalletKind::Unknown => "unknown",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }

    fn known_path(self) -> &'static [&'static str] {
        match self {
            SolanaWalletKind::Phantom => &["phantom", "solana"],
            SolanaWalletKind::Solflare => &["solflare"],
            SolanaWalletKind::Trust => &["trustwallet", "solana"],
            SolanaWalletKind::Exodus => &["exodus", "solana"],
            SolanaWalletKind::Unknown => &["solana"],
        }
    }

    /// Identifies a provider from its `is*` flags.
    pub fn identify(flags: &BTreeMap<String, bool>) -> Self {
        let set = |name: &str| flags.get(name).copied().unwrap_or(false);
        if set("isPhantom") {
            SolanaWalletKind::Phantom
        } else if set("isSolflare") {
            SolanaWalletKind::Solflare
        } else if set("isTrust") || set("isTrustWallet") {
            SolanaWalletKind::Trust
        } else if set("isExodus") {
            SolanaWalletKind::Exodus
        } else {
            SolanaWalletKind::Unknown
        }
    }
}

impl fmt::Display for SolanaWalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Lowercases and strips whitespace: `"Trust Wallet"` becomes `"trustwallet"`.
pub fn normalize_wallet_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

pub struct SolanaDiscovery {
    globals: Rc<dyn SolanaGlobals>,
}

impl SolanaDiscovery {
    pub fn new(globals: Rc<dyn SolanaGlobals>) -> Self {
        Self { globals }
    }

    /// `window[name].solana`, which newer wallets inject under their own key.
    fn dynamic(&self, name: &str) -> Option<Rc<dyn SolanaProvider>> {
        self.globals.lookup(&[name, "solana"])
    }

    fn by_kind(&self, kind: SolanaWalletKind) -> Option<Rc<dyn SolanaProvider>> {
        self.dynamic(kind.key())
            .or_else(|| self.globals.lookup(kind.known_path()))
    }

    /// Well-known wallets present on the page.
    pub fn available(&self) -> Vec<SolanaWalletKind> {
        let mut found: Vec<SolanaWalletKind> = SolanaWalletKind::ALL
            .into_iter()
            .filter(|kind| self.by_kind(*kind).is_some())
            .collect();

        if found.is_empty() {
            if let Some(provider) = self.globals.lookup(&["solana"]) {
                found.push(SolanaWalletKind::identify(&provider.flags()));
            }
        }
        found
    }

    /// Resolves a wallet by display name.
    ///
    /// Tries the well-known locations first, then `window[name].solana`, and
    /// finally `window.solana` when its flags identify the same wallet.
    pub fn get_provider(&self, wallet_name: &str) -> Result<Rc<dyn SolanaProvider>, WalletError> {
        let normalized = normalize_wallet_name(wallet_name);

        if let Some(kind) = SolanaWalletKind::from_key(&normalized) {
            if self.available().contains(&kind) {
                if let Some(provider) = self.by_kind(kind) {
                    return Ok(provider);
                }
            }
        }

        if let Some(provider) = self.dynamic(&normalized) {
            return Ok(provider);
        }

        if let Some(provider) = self.globals.lookup(&["solana"]) {
            let detected = SolanaWalletKind::identify(&provider.flags());
            if detected.key() == normalized || normalized == SolanaWalletKind::Unknown.key() {
                return Ok(provider);
            }
        }

        tracing::debug!(wallet = wallet_name, "no Solana provider found");
        Err(WalletError::ProviderUnavailable(format!(
            "Provider not found for wallet: {wallet_name}"
        )))
    }

    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.available()
            .into_iter()
            .map(|kind| ProviderDescriptor::new(kind.key(), NetworkType::Solana))
            .collect()
    }
}
