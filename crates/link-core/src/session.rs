use std::rc::Rc;

use base64::Engine;
use serde_json::Value;
use url::Url;

use crate::config::LinkOptions;
use crate::context::SessionContext;
use crate::error::LinkError;
use crate::host::LinkHost;
use crate::popup::PopupManager;
use crate::registry::WalletStrategyRegistry;
use crate::router::MessageRouter;
use crate::style::BASE64_LENIENT;

pub const INVALID_LINK_TOKEN: &str = "Invalid link token!";

/// A link token decoded to the URL the iframe loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub url: String,
    /// `None` for opaque origins such as `data:` URLs.
    pub origin: Option<String>,
}

/// Decodes a base64 link token.
pub fn decode_link_token(token: &str) -> Result<LinkTarget, LinkError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(LinkError::InvalidToken("empty token".into()));
    }
    let bytes = BASE64_LENIENT
        .decode(token)
        .map_err(|e| LinkError::InvalidToken(e.to_string()))?;
    let url = String::from_utf8(bytes).map_err(|e| LinkError::InvalidToken(e.to_string()))?;
    let parsed = Url::parse(&url).map_err(|e| LinkError::InvalidToken(e.to_string()))?;

    let origin = parsed.origin();
    Ok(LinkTarget {
        origin: origin.is_tuple().then(|| origin.ascii_serialization()),
        url,
    })
}

/// One host-facing Link session: opens the popup for a token, listens for
/// the surface's messages and closes again.
pub struct LinkSession {
    options: Rc<LinkOptions>,
    context: Rc<SessionContext>,
    host: Rc<dyn LinkHost>,
    router: MessageRouter,
}

impl LinkSession {
    pub fn new(
        options: LinkOptions,
        host: Rc<dyn LinkHost>,
        registry: Rc<WalletStrategyRegistry>,
    ) -> Self {
        Self::sharing(options, Rc::new(SessionContext::new()), host, registry)
    }

    /// A session sharing `context` with others on the same page. Opening any
    /// of them makes its options the ones callbacks go to.
    pub fn sharing(
        options: LinkOptions,
        context: Rc<SessionContext>,
        host: Rc<dyn LinkHost>,
        registry: Rc<WalletStrategyRegistry>,
    ) -> Self {
        let router = MessageRouter::new(Rc::clone(&context), Rc::clone(&host), registry);
        Self {
            options: Rc::new(options),
            context,
            host,
            router,
        }
    }

    pub fn context(&self) -> &Rc<SessionContext> {
        &self.context
    }

    /// Shows the popup for `token` and starts listening.
    ///
    /// An empty or undecodable token calls `on_exit("Invalid link token!")`
    /// and creates nothing.
    pub fn open(&self, token: &str) -> Result<(), LinkError> {
        let target = match decode_link_token(token) {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!(error = %err, "refusing to open Link");
                self.options.exit(Some(INVALID_LINK_TOKEN), None);
                return Err(err);
            }
        };

        self.context.set_options(Rc::clone(&self.options));
        if let Some(origin) = &target.origin {
            self.context.allow_origin(origin);
        }

        self.host.unlisten();
        self.context.set_listening(false);
        PopupManager.show(self.host.as_ref(), &target.url)?;
        self.host.listen();
        self.context.set_listening(true);
        tracing::debug!(url = %target.url, "Link opened");
        Ok(())
    }

    /// Removes the popup, stops listening and calls `on_exit` with nothing.
    pub fn close(&self) {
        if let Err(err) = PopupManager.hide(self.host.as_ref()) {
            tracing::error!(error = %err, "failed to remove Link popup");
        }
        self.host.unlisten();
        self.context.set_listening(false);
        self.options.exit(None, None);
    }

    /// Entry point for the window `message` listener.
    pub async fn handle_message(&self, origin: &str, data: &Value) {
        if !self.context.is_listening() {
            tracing::debug!("message received while closed");
            return;
        }
        self.router.handle_message(origin, data).await;
    }
}
