use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::LinkOptions;
use crate::error::LinkError;
use crate::host::LinkHost;
use crate::message::OutboundMessage;
use crate::popup::IFRAME_ID;

/// Origins the embedded surface is served from before any link is opened.
pub const DEFAULT_ORIGINS: [&str; 2] = [
    "https://web.meshconnect.com",
    "https://dev-web.meshconnect.com",
];

/// State shared by every session created on a page: the options of the most
/// recently opened session, the origin allow-list and the listener flag.
#[derive(Debug)]
pub struct SessionContext {
    current: RefCell<Option<Rc<LinkOptions>>>,
    origins: RefCell<Vec<String>>,
    listening: Cell<bool>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            current: RefCell::new(None),
            origins: RefCell::new(DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect()),
            listening: Cell::new(false),
        }
    }

    pub fn options(&self) -> Option<Rc<LinkOptions>> {
        self.current.borrow().clone()
    }

    pub fn set_options(&self, options: Rc<LinkOptions>) {
        *self.current.borrow_mut() = Some(options);
    }

    /// Adds `origin` to the allow-list. The list only grows.
    pub fn allow_origin(&self, origin: &str) -> bool {
        let mut origins = self.origins.borrow_mut();
        if origins.iter().any(|o| o == origin) {
            return false;
        }
        tracing::debug!(%origin, "origin allowed");
        origins.push(origin.to_string());
        true
    }

    pub fn is_trusted(&self, origin: &str) -> bool {
        self.origins.borrow().iter().any(|o| o == origin)
    }

    pub fn origins(&self) -> Vec<String> {
        self.origins.borrow().clone()
    }

    pub fn is_listening(&self) -> bool {
        self.listening.get()
    }

    pub(crate) fn set_listening(&self, listening: bool) {
        self.listening.set(listening);
    }

    /// Posts `message` into the iframe once per allowed origin. The browser
    /// only delivers the copy whose origin matches the frame.
    pub fn broadcast(&self, host: &dyn LinkHost, message: &OutboundMessage) {
        let value = message.to_value();
        for origin in self.origins() {
            match host.post_to_frame(IFRAME_ID, &value, &origin) {
                Ok(()) => {}
                Err(LinkError::MissingElement(_)) => {
                    tracing::warn!(
                        kind = %message.kind,
                        "Failed to deliver message to the iframe - no iframe element found"
                    );
                    return;
                }
                Err(err) => {
                    tracing::error!(kind = %message.kind, %origin, error = %err, "Failed to deliver message to the iframe");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use crate::popup::PopupManager;

    #[test]
    fn starts_with_default_origins() {
        let ctx = SessionContext::new();
        assert_eq!(ctx.origins(), DEFAULT_ORIGINS.to_vec());
        assert!(ctx.is_trusted("https://web.meshconnect.com"));
        assert!(!ctx.is_trusted("https://evil.example"));
    }

    #[test]
    fn allow_list_only_grows() {
        let ctx = SessionContext::new();
        assert!(ctx.allow_origin("http://localhost"));
        assert!(!ctx.allow_origin("http://localhost"));
        assert_eq!(ctx.origins().len(), 3);
    }

    #[test]
    fn broadcast_posts_once_per_origin() {
        let ctx = SessionContext::new();
        ctx.allow_origin("http://localhost");
        let host = MemoryHost::new("http://localhost");
        PopupManager.show(&host, "http://localhost/1").unwrap();

        ctx.broadcast(&host, &OutboundMessage::bare("SDKdisconnectSuccess"));

        let targets: Vec<String> = host.posted().into_iter().map(|(o, _)| o).collect();
        assert_eq!(targets, ctx.origins());
    }

    #[test]
    fn broadcast_without_iframe_is_dropped() {
        let ctx = SessionContext::new();
        let host = MemoryHost::new("http://localhost");
        ctx.broadcast(&host, &OutboundMessage::bare("SDKdisconnectSuccess"));
        assert!(host.posted().is_empty());
    }
}
