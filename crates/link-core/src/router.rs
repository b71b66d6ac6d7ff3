//! Classifies inbound frame messages and routes them to wallet dispatch or
//! to the host callbacks.

use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::{LinkOptions, SdkSpecs};
use crate::context::SessionContext;
use crate::dispatch::dispatch;
use crate::error::LinkError;
use crate::events::{
    is_link_event_type, AccessTokenPayload, DelayedAuthPayload, LinkEvent, LinkPayload,
    SessionSummary, TransferFinishedPayload,
};
use crate::host::LinkHost;
use crate::message::OutboundMessage;
use crate::popup::PopupManager;
use crate::registry::WalletStrategyRegistry;
use crate::wallet_events::{is_wallet_browser_event_type, reply_type, WalletBrowserEvent};

/// Tags the surface uses for session control rather than reporting events.
mod tag {
    pub const ACCESS_TOKEN: &str = "brokerageAccountAccessToken";
    pub const DELAYED_AUTH: &str = "delayedAuthentication";
    pub const TRANSFER_FINISHED: &str = "transferFinished";
    pub const CLOSE: &str = "close";
    pub const DONE: &str = "done";
    pub const LOADED: &str = "loaded";
}

/// Messages posted to the surface once it reports `loaded`.
mod outbound {
    pub const SDK_SPECS: &str = "meshSDKSpecs";
    pub const WALLET_PROVIDERS: &str = "SDKinjectedWalletProviders";
    pub const ACCESS_TOKENS: &str = "frontAccessTokens";
    pub const DESTINATION_TOKENS: &str = "frontTransferDestinationTokens";
}

#[derive(Clone)]
pub struct MessageRouter {
    context: Rc<SessionContext>,
    host: Rc<dyn LinkHost>,
    registry: Rc<WalletStrategyRegistry>,
}

impl MessageRouter {
    pub fn new(
        context: Rc<SessionContext>,
        host: Rc<dyn LinkHost>,
        registry: Rc<WalletStrategyRegistry>,
    ) -> Self {
        Self {
            context,
            host,
            registry,
        }
    }

    /// Handles one `{type, payload?}` message received from `origin`.
    ///
    /// The origin check is advisory: untrusted senders are logged and the
    /// message is still classified.
    pub async fn handle_message(&self, origin: &str, data: &Value) {
        if !self.context.is_trusted(origin) {
            tracing::warn!(%origin, "Received message from untrusted origin");
        }
        let Some(kind) = data.get("type").and_then(Value::as_str) else {
            tracing::debug!("message without a type ignored");
            return;
        };
        let payload = data.get("payload");

        if is_wallet_browser_event_type(kind) {
            self.handle_wallet_event(kind, payload).await;
        } else {
            self.handle_link_event(kind, payload);
        }
    }

    async fn handle_wallet_event(&self, kind: &str, payload: Option<&Value>) {
        let event = match WalletBrowserEvent::parse(kind, payload) {
            Ok(event) => event,
            Err(err) => {
                let err = LinkError::InvalidPayload {
                    tag: kind.to_string(),
                    reason: err.to_string(),
                };
                tracing::warn!(error = %err, "rejecting wallet request");
                if let Some(reply) = reply_type(kind) {
                    self.send(&OutboundMessage::error(reply, err.to_string()));
                }
                return;
            }
        };

        if let Some(reply) = dispatch(&self.registry, &event).await {
            self.send(&reply);
        }
    }

    fn handle_link_event(&self, kind: &str, payload: Option<&Value>) {
        let options = self.context.options();

        match kind {
            tag::ACCESS_TOKEN => {
                if let Some(access_token) = decode::<AccessTokenPayload>(kind, payload) {
                    self.integration_connected(
                        options.as_deref(),
                        LinkPayload {
                            access_token: Some(access_token),
                            delayed_auth: None,
                        },
                    );
                }
            }
            tag::DELAYED_AUTH => {
                if let Some(delayed_auth) = decode::<DelayedAuthPayload>(kind, payload) {
                    self.integration_connected(
                        options.as_deref(),
                        LinkPayload {
                            access_token: None,
                            delayed_auth: Some(delayed_auth),
                        },
                    );
                }
            }
            tag::TRANSFER_FINISHED => {
                let Some(transfer) = decode::<TransferFinishedPayload>(kind, payload) else {
                    return;
                };
                if let Some(options) = options.as_deref() {
                    options.event(&LinkEvent::TransferCompleted(transfer.clone()));
                    if let Some(on_transfer_finished) = &options.on_transfer_finished {
                        on_transfer_finished(&transfer);
                    }
                }
            }
            tag::CLOSE | tag::DONE => {
                let summary = payload
                    .filter(|p| !p.is_null())
                    .and_then(|p| decode::<SessionSummary>(kind, Some(p)))
                    .unwrap_or_default();
                if let Err(err) = PopupManager.hide(self.host.as_ref()) {
                    tracing::error!(error = %err, "failed to remove Link popup");
                }
                if let Some(options) = options.as_deref() {
                    options.exit(summary.error_message.as_deref(), Some(&summary));
                }
            }
            tag::LOADED => self.on_loaded(options.as_deref()),
            _ if is_link_event_type(kind) => match LinkEvent::parse(kind, payload) {
                Ok(event) => {
                    if let Some(options) = options.as_deref() {
                        options.event(&event);
                    }
                }
                Err(err) => tracing::warn!(%kind, error = %err, "malformed Link event dropped"),
            },
            _ => tracing::debug!(%kind, "unrecognized message dropped"),
        }
    }

    fn integration_connected(&self, options: Option<&LinkOptions>, payload: LinkPayload) {
        let Some(options) = options else {
            return;
        };
        options.event(&LinkEvent::IntegrationConnected(payload.clone()));
        (options.on_integration_connected)(&payload);
    }

    fn on_loaded(&self, options: Option<&LinkOptions>) {
        self.post(outbound::SDK_SPECS, &SdkSpecs::new(self.host.page_origin()));
        self.post(outbound::WALLET_PROVIDERS, &self.registry.all_providers());

        let Some(options) = options else {
            return;
        };
        if let Some(tokens) = &options.access_tokens {
            self.post(outbound::ACCESS_TOKENS, tokens);
        }
        if let Some(tokens) = &options.transfer_destination_tokens {
            self.post(outbound::DESTINATION_TOKENS, tokens);
        }
        options.event(&LinkEvent::PageLoaded);
    }

    fn post<T: Serialize + ?Sized>(&self, kind: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(payload) => self.send(&OutboundMessage::new(kind, payload)),
            Err(err) => tracing::error!(%kind, error = %LinkError::from(err), "dropping message"),
        }
    }

    fn send(&self, message: &OutboundMessage) {
        self.context.broadcast(self.host.as_ref(), message);
    }
}

fn decode<T: DeserializeOwned>(kind: &str, payload: Option<&Value>) -> Option<T> {
    let raw = payload.cloned().unwrap_or(Value::Null);
    match serde_json::from_value(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(%kind, error = %err, "malformed payload dropped");
            None
        }
    }
}
