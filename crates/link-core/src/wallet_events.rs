//! Wallet operations the embedded surface asks the host page to perform.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wallet_api::{
    ChainSwitchRequest, DisconnectRequest, NativeTransferRequest, SignRequest, SmartContractCall,
    TransferBalanceRequest, WalletSelection,
};

pub const WALLET_BROWSER_EVENT_TYPES: [&str; 9] = [
    "walletBrowserInjectedWalletSelected",
    "walletBrowserSignRequest",
    "walletBrowserChainSwitchRequest",
    "walletBrowserTransferBalanceRequest",
    "walletBrowserNativeTransferRequest",
    "walletBrowserNonNativeTransferRequest",
    "walletBrowserNativeSmartDeposit",
    "walletBrowserNonNativeSmartDeposit",
    "walletBrowserDisconnect",
];

pub fn is_wallet_browser_event_type(tag: &str) -> bool {
    WALLET_BROWSER_EVENT_TYPES.contains(&tag)
}

/// Reply message types posted back to the surface.
pub mod reply {
    pub const CONNECTION_COMPLETED: &str = "SDKinjectedConnectionCompleted";
    pub const SIGN_COMPLETED: &str = "SDKsignRequestCompleted";
    pub const SWITCH_CHAIN_COMPLETED: &str = "SDKswitchChainCompleted";
    pub const NATIVE_TRANSFER_COMPLETED: &str = "SDKnativeTransferCompleted";
    pub const NON_NATIVE_TRANSFER_COMPLETED: &str = "SDKnonNativeTransferCompleted";
    pub const NATIVE_SMART_DEPOSIT_COMPLETED: &str = "SDKnativeSmartDepositCompleted";
    pub const NON_NATIVE_SMART_DEPOSIT_COMPLETED: &str = "SDKnonNativeSmartDepositCompleted";
    pub const DISCONNECT_SUCCESS: &str = "SDKdisconnectSuccess";
}

/// Reply type for a wallet tag; `None` for tags that are never answered.
pub fn reply_type(tag: &str) -> Option<&'static str> {
    Some(match tag {
        "walletBrowserInjectedWalletSelected" => reply::CONNECTION_COMPLETED,
        "walletBrowserSignRequest" => reply::SIGN_COMPLETED,
        "walletBrowserChainSwitchRequest" => reply::SWITCH_CHAIN_COMPLETED,
        "walletBrowserNativeTransferRequest" => reply::NATIVE_TRANSFER_COMPLETED,
        "walletBrowserNonNativeTransferRequest" => reply::NON_NATIVE_TRANSFER_COMPLETED,
        "walletBrowserNativeSmartDeposit" => reply::NATIVE_SMART_DEPOSIT_COMPLETED,
        "walletBrowserNonNativeSmartDeposit" => reply::NON_NATIVE_SMART_DEPOSIT_COMPLETED,
        "walletBrowserDisconnect" => reply::DISCONNECT_SUCCESS,
        _ => return None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WalletBrowserEvent {
    #[serde(rename = "walletBrowserInjectedWalletSelected")]
    InjectedWalletSelected(WalletSelection),
    #[serde(rename = "walletBrowserSignRequest")]
    SignRequest(SignRequest),
    #[serde(rename = "walletBrowserChainSwitchRequest")]
    ChainSwitchRequest(ChainSwitchRequest),
    #[serde(rename = "walletBrowserTransferBalanceRequest")]
    TransferBalanceRequest(TransferBalanceRequest),
    #[serde(rename = "walletBrowserNativeTransferRequest")]
    NativeTransferRequest(NativeTransferRequest),
    #[serde(rename = "walletBrowserNonNativeTransferRequest")]
    NonNativeTransferRequest(SmartContractCall),
    #[serde(rename = "walletBrowserNativeSmartDeposit")]
    NativeSmartDeposit(SmartContractCall),
    #[serde(rename = "walletBrowserNonNativeSmartDeposit")]
    NonNativeSmartDeposit(SmartContractCall),
    #[serde(rename = "walletBrowserDisconnect")]
    Disconnect(DisconnectRequest),
}

impl WalletBrowserEvent {
    /// Decodes a tagged message; a missing or `null` payload is read as `{}`.
    pub fn parse(tag: &str, payload: Option<&Value>) -> Result<Self, serde_json::Error> {
        let payload = payload
            .filter(|p| !p.is_null())
            .cloned()
            .unwrap_or_else(|| json!({}));
        serde_json::from_value(json!({ "type": tag, "payload": payload }))
    }

    pub fn reply_type(&self) -> Option<&'static str> {
        match self {
            WalletBrowserEvent::InjectedWalletSelected(_) => Some(reply::CONNECTION_COMPLETED),
            WalletBrowserEvent::SignRequest(_) => Some(reply::SIGN_COMPLETED),
            WalletBrowserEvent::ChainSwitchRequest(_) => Some(reply::SWITCH_CHAIN_COMPLETED),
            WalletBrowserEvent::TransferBalanceRequest(_) => None,
            WalletBrowserEvent::NativeTransferRequest(_) => Some(reply::NATIVE_TRANSFER_COMPLETED),
            WalletBrowserEvent::NonNativeTransferRequest(_) => {
                Some(reply::NON_NATIVE_TRANSFER_COMPLETED)
            }
            WalletBrowserEvent::NativeSmartDeposit(_) => Some(reply::NATIVE_SMART_DEPOSIT_COMPLETED),
            WalletBrowserEvent::NonNativeSmartDeposit(_) => {
                Some(reply::NON_NATIVE_SMART_DEPOSIT_COMPLETED)
            }
            WalletBrowserEvent::Disconnect(_) => Some(reply::DISCONNECT_SUCCESS),
        }
    }
}
