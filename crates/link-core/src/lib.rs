//! # link-core
//!
//! Embeds the Mesh Link surface in a host page and bridges it to the
//! browser's injected wallets.
//!
//! A [`LinkSession`] shows the Link popup for a base64 link token and
//! listens for the surface's messages. Reporting events reach the host's
//! [`LinkOptions`] callbacks; wallet requests are dispatched to the
//! [`WalletStrategy`](wallet_api::WalletStrategy) registered for the target
//! network and answered with a typed reply.
//!
//! The page itself is abstracted behind [`LinkHost`], so the whole flow runs
//! against [`host::memory::MemoryHost`] outside a browser. On `wasm32` the
//! `browser` module provides the DOM host and the `createLink` export.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod host;
pub mod message;
pub mod popup;
pub mod registry;
pub mod router;
pub mod session;
pub mod style;
pub mod wallet_events;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use config::{IntegrationAccessToken, LinkOptions, SdkSpecs};
pub use context::SessionContext;
pub use error::LinkError;
pub use events::{LinkEvent, LinkPayload, SessionSummary, TransferFinishedPayload};
pub use host::{DocumentHost, LinkHost};
pub use message::OutboundMessage;
pub use popup::PopupManager;
pub use registry::WalletStrategyRegistry;
pub use router::MessageRouter;
pub use session::LinkSession;
pub use wallet_events::WalletBrowserEvent;
