//! Events the embedded surface reports to the host page.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Every tag accepted as a [`LinkEvent`].
pub const LINK_EVENT_TYPES: [&str; 33] = [
    "integrationConnected",
    "integrationConnectionError",
    "integrationMfaRequired",
    "integrationMfaEntered",
    "integrationOAuthStarted",
    "integrationAccountSelectionRequired",
    "transferCompleted",
    "integrationSelected",
    "credentialsEntered",
    "transferStarted",
    "transferPreviewed",
    "transferPreviewError",
    "transferExecutionError",
    "pageLoaded",
    "transferAssetSelected",
    "transferNetworkSelected",
    "transferAmountEntered",
    "transferMfaRequired",
    "transferMfaEntered",
    "transferKycRequired",
    "transferExecuted",
    "transferInitiated",
    "transferNoEligibleAssets",
    "walletMessageSigned",
    "verifyDonePage",
    "verifyWalletRejected",
    "connectionDeclined",
    "transferConfigureError",
    "connectionUnavailable",
    "transferDeclined",
    "done",
    "close",
    "SDKinjectedWalletProviders",
];

pub fn is_link_event_type(tag: &str) -> bool {
    LINK_EVENT_TYPES.contains(&tag)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum LinkEvent {
    IntegrationConnected(LinkPayload),
    IntegrationConnectionError(ErrorMessagePayload),
    IntegrationMfaRequired,
    IntegrationMfaEntered,
    IntegrationOAuthStarted,
    IntegrationAccountSelectionRequired,
    TransferCompleted(TransferFinishedPayload),
    IntegrationSelected(IntegrationSelectedPayload),
    CredentialsEntered,
    TransferStarted,
    TransferPreviewed(TransferPreviewedPayload),
    TransferPreviewError(ErrorMessagePayload),
    TransferExecutionError(ErrorMessagePayload),
    PageLoaded,
    TransferAssetSelected(TransferAssetSelectedPayload),
    TransferNetworkSelected(TransferNetworkSelectedPayload),
    TransferAmountEntered,
    TransferMfaRequired,
    TransferMfaEntered,
    TransferKycRequired,
    TransferExecuted(TransferExecutedPayload),
    TransferInitiated(TransferInitiatedPayload),
    TransferNoEligibleAssets(TransferNoEligibleAssetsPayload),
    WalletMessageSigned(WalletMessageSignedPayload),
    VerifyDonePage,
    VerifyWalletRejected,
    ConnectionDeclined(Value),
    TransferConfigureError(Value),
    ConnectionUnavailable(Value),
    TransferDeclined(Value),
    Done(SessionSummary),
    Close(SessionSummary),
    #[serde(rename = "SDKinjectedWalletProviders")]
    SdkInjectedWalletProviders(Vec<InjectedWalletProvider>),
}

impl LinkEvent {
    /// Decodes a tagged message. Payload-less tags are accepted with or
    /// without a payload, and a missing payload is read as `{}`.
    pub fn parse(tag: &str, payload: Option<&Value>) -> Result<Self, serde_json::Error> {
        let with_payload = json!({
            "type": tag,
            "payload": payload.cloned().unwrap_or_else(|| json!({})),
        });
        serde_json::from_value(with_payload)
            .or_else(|err| serde_json::from_value(json!({ "type": tag })).map_err(|_| err))
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// `integrationConnected`: exactly one of the two is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<AccessTokenPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delayed_auth: Option<DelayedAuthPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenPayload {
    #[serde(default)]
    pub account_tokens: Vec<AccountToken>,
    pub broker_brand_info: BrandInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires_in_seconds: Option<u64>,
    pub broker_type: String,
    pub broker_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayedAuthPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires_in_seconds: Option<u64>,
    pub broker_type: String,
    pub refresh_token: String,
    pub broker_name: String,
    pub broker_brand_info: BrandInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountToken {
    pub account: Account,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
    pub account_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fund: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_reconnected: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandInfo {
    pub broker_logo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_primary_color: Option<String>,
}

/// `transferFinished` from the surface, re-emitted as `transferCompleted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFinishedPayload {
    pub status: String,
    pub tx_id: String,
    pub from_address: String,
    pub to_address: String,
    pub symbol: String,
    pub amount: f64,
    pub network_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_in_fiat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount_in_fiat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessagePayload {
    pub error_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationSelectedPayload {
    pub integration_type: String,
    pub integration_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInitiatedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_type: Option<String>,
    pub integration_name: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferExecutedPayload {
    pub status: String,
    pub tx_id: String,
    pub from_address: String,
    pub to_address: String,
    pub symbol: String,
    pub amount: f64,
    pub network_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferNoEligibleAssetsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_type: Option<String>,
    pub integration_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_assets_type: Option<String>,
    #[serde(default)]
    pub array_of_tokens_held: Vec<TokenHeld>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHeld {
    pub symbol: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_in_fiat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ineligibility_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPreviewedPayload {
    pub amount: f64,
    pub symbol: String,
    pub to_address: String,
    pub network_id: String,
    pub preview_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_in_fiat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_network_gas_fee: Option<GasFee>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasFee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_in_fiat: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferAssetSelectedPayload {
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferNetworkSelectedPayload {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletMessageSignedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_message_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub address: String,
    pub time_stamp: f64,
    pub is_verified: bool,
}

/// Where the user was in the embedded flow when it ended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Current page, e.g. `integrationsCatalogPage` or `transferExecutedPage`.
    #[serde(default)]
    pub page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_integration: Option<SelectedIntegration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedIntegration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_in_fiat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectedWalletProvider {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_membership() {
        assert!(is_link_event_type("transferExecuted"));
        assert!(is_link_event_type("SDKinjectedWalletProviders"));
        assert!(is_link_event_type("done"));
        assert!(!is_link_event_type("loaded"));
        assert!(!is_link_event_type("walletBrowserSignRequest"));
        assert!(!is_link_event_type("TransferExecuted"));
    }

    #[test]
    fn every_listed_tag_parses() {
        // Unit tags parse bare; payload tags at least resolve to their variant
        // when given a minimal payload.
        for tag in LINK_EVENT_TYPES {
            let parsed = LinkEvent::parse(tag, None);
            let needs_payload = matches!(
                tag,
                "integrationConnectionError"
                    | "transferCompleted"
                    | "integrationSelected"
                    | "transferPreviewed"
                    | "transferPreviewError"
                    | "transferExecutionError"
                    | "transferAssetSelected"
                    | "transferNetworkSelected"
                    | "transferExecuted"
                    | "transferInitiated"
                    | "transferNoEligibleAssets"
                    | "walletMessageSigned"
                    | "SDKinjectedWalletProviders"
            );
            assert_eq!(parsed.is_err(), needs_payload, "tag {tag}");
        }
    }

    #[test]
    fn unit_event_round_trips_without_payload() {
        let value = serde_json::to_value(LinkEvent::PageLoaded).unwrap();
        assert_eq!(value, json!({"type": "pageLoaded"}));
        assert_eq!(
            LinkEvent::parse("integrationOAuthStarted", Some(&json!({"extra": 1}))).unwrap(),
            LinkEvent::IntegrationOAuthStarted
        );
    }

    #[test]
    fn integration_connected_wire_shape() {
        let event = LinkEvent::IntegrationConnected(LinkPayload {
            access_token: Some(AccessTokenPayload {
                account_tokens: Vec::new(),
                broker_brand_info: BrandInfo {
                    broker_logo: String::new(),
                    broker_primary_color: None,
                },
                expires_in_seconds: None,
                refresh_token_expires_in_seconds: None,
                broker_type: "robinhood".into(),
                broker_name: "R".into(),
            }),
            delayed_auth: None,
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "integrationConnected",
                "payload": {"accessToken": {
                    "accountTokens": [],
                    "brokerBrandInfo": {"brokerLogo": ""},
                    "brokerType": "robinhood",
                    "brokerName": "R"
                }}
            })
        );
    }

    #[test]
    fn transfer_executed_payload() {
        let event = LinkEvent::parse(
            "transferExecuted",
            Some(&json!({
                "status": "success",
                "txId": "t1",
                "fromAddress": "a",
                "toAddress": "b",
                "symbol": "ETH",
                "amount": 0.5,
                "networkId": "n1"
            })),
        )
        .unwrap();
        let LinkEvent::TransferExecuted(payload) = event else {
            panic!("wrong variant");
        };
        assert_eq!(payload.tx_id, "t1");
        assert_eq!(payload.amount, 0.5);
    }

    #[test]
    fn session_summary_is_lenient() {
        let summary: SessionSummary = serde_json::from_value(json!({
            "page": "transferPreviewPage",
            "transfer": {"symbol": "USDC", "amount": 10.0},
            "errorMessage": "declined"
        }))
        .unwrap();
        assert_eq!(summary.error_message.as_deref(), Some("declined"));
        assert_eq!(summary.transfer.unwrap().symbol.as_deref(), Some("USDC"));

        assert_eq!(
            LinkEvent::parse("close", None).unwrap(),
            LinkEvent::Close(SessionSummary::default())
        );
    }

    #[test]
    fn undeclared_payload_tags_keep_raw_payload() {
        let event = LinkEvent::parse("transferDeclined", Some(&json!({"reason": "x"}))).unwrap();
        assert_eq!(event, LinkEvent::TransferDeclined(json!({"reason": "x"})));
    }
}
