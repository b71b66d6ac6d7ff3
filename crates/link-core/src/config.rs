//! Per-session configuration supplied by the host page.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::events::{LinkEvent, LinkPayload, SessionSummary, TransferFinishedPayload};

pub type IntegrationConnectedFn = Rc<dyn Fn(&LinkPayload)>;
pub type ExitFn = Rc<dyn Fn(Option<&str>, Option<&SessionSummary>)>;
pub type TransferFinishedFn = Rc<dyn Fn(&TransferFinishedPayload)>;
pub type EventFn = Rc<dyn Fn(&LinkEvent)>;

/// Pre-authorized integration token handed to the surface on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationAccessToken {
    pub account_id: String,
    pub account_name: String,
    pub access_token: String,
    pub broker_type: String,
    pub broker_name: String,
}

/// Callbacks and tokens for a Link session.
///
/// Built once and handed to the session; each `open` makes these the
/// current options, replacing whatever a previous session installed.
#[derive(Clone)]
pub struct LinkOptions {
    pub client_id: Option<String>,
    pub on_integration_connected: IntegrationConnectedFn,
    pub on_exit: Option<ExitFn>,
    pub on_transfer_finished: Option<TransferFinishedFn>,
    pub on_event: Option<EventFn>,
    pub access_tokens: Option<Vec<IntegrationAccessToken>>,
    pub transfer_destination_tokens: Option<Vec<IntegrationAccessToken>>,
}

impl LinkOptions {
    pub fn new(on_integration_connected: impl Fn(&LinkPayload) + 'static) -> Self {
        Self {
            client_id: None,
            on_integration_connected: Rc::new(on_integration_connected),
            on_exit: None,
            on_transfer_finished: None,
            on_event: None,
            access_tokens: None,
            transfer_destination_tokens: None,
        }
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn on_exit(mut self, f: impl Fn(Option<&str>, Option<&SessionSummary>) + 'static) -> Self {
        self.on_exit = Some(Rc::new(f));
        self
    }

    pub fn on_transfer_finished(mut self, f: impl Fn(&TransferFinishedPayload) + 'static) -> Self {
        self.on_transfer_finished = Some(Rc::new(f));
        self
    }

    pub fn on_event(mut self, f: impl Fn(&LinkEvent) + 'static) -> Self {
        self.on_event = Some(Rc::new(f));
        self
    }

    pub fn access_tokens(mut self, tokens: Vec<IntegrationAccessToken>) -> Self {
        self.access_tokens = Some(tokens);
        self
    }

    pub fn transfer_destination_tokens(mut self, tokens: Vec<IntegrationAccessToken>) -> Self {
        self.transfer_destination_tokens = Some(tokens);
        self
    }

    pub(crate) fn exit(&self, error: Option<&str>, summary: Option<&SessionSummary>) {
        if let Some(on_exit) = &self.on_exit {
            on_exit(error, summary);
        }
    }

    pub(crate) fn event(&self, event: &LinkEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }
}

impl fmt::Debug for LinkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkOptions")
            .field("client_id", &self.client_id)
            .field("on_exit", &self.on_exit.is_some())
            .field("on_transfer_finished", &self.on_transfer_finished.is_some())
            .field("on_event", &self.on_event.is_some())
            .field("access_tokens", &self.access_tokens.as_ref().map(Vec::len))
            .field(
                "transfer_destination_tokens",
                &self.transfer_destination_tokens.as_ref().map(Vec::len),
            )
            .finish()
    }
}

/// SDK metadata sent to the surface as `meshSDKSpecs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SdkSpecs {
    pub platform: &'static str,
    pub version: &'static str,
    pub origin: String,
}

impl SdkSpecs {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            platform: "web",
            version: env!("CARGO_PKG_VERSION"),
            origin: origin.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn builder_sets_callbacks() {
        let exits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&exits);
        let options = LinkOptions::new(|_| {})
            .client_id("client")
            .on_exit(move |_, _| counter.set(counter.get() + 1));

        options.exit(Some("boom"), None);
        assert_eq!(exits.get(), 1);
        assert_eq!(options.client_id.as_deref(), Some("client"));
    }

    #[test]
    fn missing_callbacks_are_noops() {
        let options = LinkOptions::new(|_| {});
        options.exit(None, None);
        options.event(&LinkEvent::PageLoaded);
    }

    #[test]
    fn debug_hides_closures() {
        let options = LinkOptions::new(|_| {}).access_tokens(Vec::new());
        let debug = format!("{options:?}");
        assert!(debug.contains("access_tokens: Some(0)"));
    }

    #[test]
    fn sdk_specs_shape() {
        let specs = serde_json::to_value(SdkSpecs::new("http://localhost")).unwrap();
        assert_eq!(specs["platform"], "web");
        assert_eq!(specs["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(specs["origin"], "http://localhost");
    }

    #[test]
    fn access_token_wire_names() {
        let token: IntegrationAccessToken = serde_json::from_value(serde_json::json!({
            "accountId": "a1",
            "accountName": "Main",
            "accessToken": "tok",
            "brokerType": "robinhood",
            "brokerName": "Robinhood"
        }))
        .unwrap();
        assert_eq!(token.account_id, "a1");
        assert_eq!(token.broker_type, "robinhood");
    }
}
