//! Runs wallet operations requested by the embedded surface and builds the
//! reply for each one.
//!
//! Every recognized request except balance queries yields exactly one reply:
//! the success payload, or `{error}` under the same message type. Strategy
//! failures never escape this module.

use futures::future::join_all;
use serde_json::{json, Value};
use wallet_api::{
    ChainSwitchRequest, DisconnectRequest, NativeTransferRequest, NetworkType, SignRequest,
    SmartContractCall, WalletError, WalletSelection,
};

use crate::message::OutboundMessage;
use crate::registry::WalletStrategyRegistry;
use crate::wallet_events::WalletBrowserEvent;

/// Network a request targets. Smart contract calls only exist on EVM.
pub fn resolve_network(event: &WalletBrowserEvent) -> Option<NetworkType> {
    match event {
        WalletBrowserEvent::InjectedWalletSelected(selection) => {
            Some(NetworkType::resolve(selection.network_type.as_deref()))
        }
        WalletBrowserEvent::SignRequest(request) => Some(
            request
                .network_type
                .as_deref()
                .and_then(NetworkType::from_hint)
                .unwrap_or_else(|| NetworkType::infer_from_address(&request.address)),
        ),
        WalletBrowserEvent::ChainSwitchRequest(request) => {
            Some(NetworkType::resolve(request.network_type.as_deref()))
        }
        WalletBrowserEvent::NativeTransferRequest(request) => {
            Some(NetworkType::from_hint(&request.network).unwrap_or(NetworkType::Evm))
        }
        WalletBrowserEvent::NonNativeTransferRequest(_)
        | WalletBrowserEvent::NativeSmartDeposit(_)
        | WalletBrowserEvent::NonNativeSmartDeposit(_) => Some(NetworkType::Evm),
        WalletBrowserEvent::Disconnect(request) => request
            .network_type
            .as_deref()
            .map(|hint| NetworkType::resolve(Some(hint))),
        WalletBrowserEvent::TransferBalanceRequest(_) => None,
    }
}

/// Performs the operation behind `event`; `None` when nothing is answered.
pub async fn dispatch(
    registry: &WalletStrategyRegistry,
    event: &WalletBrowserEvent,
) -> Option<OutboundMessage> {
    let Some(reply) = event.reply_type() else {
        tracing::debug!("balance request has no wallet operation");
        return None;
    };

    let result = match event {
        WalletBrowserEvent::InjectedWalletSelected(selection) => {
            connect(registry, selection).await
        }
        WalletBrowserEvent::SignRequest(request) => sign(registry, event, request).await,
        WalletBrowserEvent::ChainSwitchRequest(request) => {
            switch_chain(registry, event, request).await
        }
        WalletBrowserEvent::NativeTransferRequest(request) => {
            native_transfer(registry, event, request).await
        }
        WalletBrowserEvent::NonNativeTransferRequest(call)
        | WalletBrowserEvent::NativeSmartDeposit(call)
        | WalletBrowserEvent::NonNativeSmartDeposit(call) => contract_call(registry, call).await,
        WalletBrowserEvent::Disconnect(request) => disconnect(registry, event, request).await,
        WalletBrowserEvent::TransferBalanceRequest(_) => return None,
    };

    Some(match result {
        Ok(Some(payload)) => OutboundMessage::new(reply, payload),
        Ok(None) => OutboundMessage::bare(reply),
        Err(err) => {
            tracing::error!(reply, kind = ?err.kind(), error = %err, "wallet operation failed");
            OutboundMessage::error(reply, err.to_string())
        }
    })
}

type Reply = Result<Option<Value>, WalletError>;

async fn connect(registry: &WalletStrategyRegistry, selection: &WalletSelection) -> Reply {
    let network = NetworkType::resolve(selection.network_type.as_deref());
    let outcome = registry.get(network)?.connect(selection).await?;
    Ok(Some(json!({
        "accounts": outcome.accounts,
        "chainId": outcome.chain_id,
        "networkType": network,
    })))
}

async fn sign(
    registry: &WalletStrategyRegistry,
    event: &WalletBrowserEvent,
    request: &SignRequest,
) -> Reply {
    let network = network_of(event);
    let signature = registry.get(network)?.sign_message(request).await?;
    Ok(Some(Value::String(signature)))
}

async fn switch_chain(
    registry: &WalletStrategyRegistry,
    event: &WalletBrowserEvent,
    request: &ChainSwitchRequest,
) -> Reply {
    let network = network_of(event);
    let outcome = registry.get(network)?.switch_chain(request).await?;
    Ok(Some(json!({
        "chainId": outcome.chain_id,
        "accounts": outcome.accounts,
        "networkType": network,
    })))
}

async fn native_transfer(
    registry: &WalletStrategyRegistry,
    event: &WalletBrowserEvent,
    request: &NativeTransferRequest,
) -> Reply {
    let hash = registry
        .get(network_of(event))?
        .send_native_transfer(request)
        .await?;
    Ok(Some(Value::String(hash)))
}

async fn contract_call(registry: &WalletStrategyRegistry, call: &SmartContractCall) -> Reply {
    let hash = registry
        .get(NetworkType::Evm)?
        .send_smart_contract_interaction(call)
        .await?;
    Ok(Some(json!({ "txHash": hash })))
}

/// Without a network type every registered strategy is disconnected
/// concurrently; the first failure wins once all have finished.
async fn disconnect(
    registry: &WalletStrategyRegistry,
    event: &WalletBrowserEvent,
    request: &DisconnectRequest,
) -> Reply {
    match resolve_network(event) {
        Some(network) => registry.get(network)?.disconnect(request).await?,
        None => {
            let results = join_all(registry.all().map(|s| s.disconnect(request))).await;
            results.into_iter().collect::<Result<Vec<()>, _>>()?;
        }
    }
    Ok(None)
}

fn network_of(event: &WalletBrowserEvent) -> NetworkType {
    resolve_network(event).unwrap_or(NetworkType::Evm)
}
