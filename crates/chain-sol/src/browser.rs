//! Browser bindings for injected Solana wallets.

use std::collections::BTreeMap;
use std::rc::Rc;

use async_trait::async_trait;
use wallet_api::ProviderError;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use crate::provider::{SolanaGlobals, SolanaProvider};
use crate::transaction::{serialize_message, serialize_unsigned, SolTransaction};

fn get_prop(target: &JsValue, key: &str) -> JsValue {
    js_sys::Reflect::get(target, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

fn is_missing(value: &JsValue) -> bool {
    value.is_null() || value.is_undefined()
}

fn provider_error(err: JsValue) -> ProviderError {
    let code = get_prop(&err, "code").as_f64().map(|c| c as i64);
    let message = get_prop(&err, "message")
        .as_string()
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    ProviderError { code, message }
}

/// `value.toString()`, used for `PublicKey` objects.
fn js_to_string(value: &JsValue) -> Option<String> {
    if is_missing(value) {
        return None;
    }
    value
        .dyn_ref::<js_sys::Object>()
        .map(|o| String::from(o.to_string()))
        .or_else(|| value.as_string())
}

fn bytes_of(value: &JsValue) -> Option<Vec<u8>> {
    value
        .dyn_ref::<js_sys::Uint8Array>()
        .map(js_sys::Uint8Array::to_vec)
}

/// Wraps bytes in a zero-argument JS function returning a fresh `Uint8Array`.
fn bytes_fn(bytes: Vec<u8>) -> JsValue {
    Closure::<dyn Fn() -> JsValue>::new(move || js_sys::Uint8Array::from(bytes.as_slice()).into())
        .into_js_value()
}

/// Duck-typed transaction object exposing the `serialize` and
/// `serializeMessage` methods injected wallets call.
fn transaction_object(tx: &SolTransaction) -> Result<JsValue, ProviderError> {
    let object = js_sys::Object::new();
    let set = |key: &str, value: JsValue| {
        js_sys::Reflect::set(&object, &JsValue::from_str(key), &value)
            .map(|_| ())
            .map_err(provider_error)
    };
    set("serialize", bytes_fn(serialize_unsigned(tx)))?;
    set("serializeMessage", bytes_fn(serialize_message(tx)))?;
    Ok(object.into())
}

pub struct JsSolanaProvider {
    inner: JsValue,
}

impl JsSolanaProvider {
    pub fn new(inner: JsValue) -> Option<Self> {
        (!is_missing(&inner)).then_some(Self { inner })
    }

    async fn call(&self, method: &str, args: &[JsValue]) -> Result<JsValue, ProviderError> {
        let function = get_prop(&self.inner, method)
            .dyn_into::<js_sys::Function>()
            .map_err(|_| ProviderError::message(format!("provider.{method} is unavailable")))?;
        let array: js_sys::Array = args.iter().collect();
        let result = function
            .apply(&self.inner, &array)
            .map_err(provider_error)?;
        match result.dyn_into::<js_sys::Promise>() {
            Ok(promise) => wasm_bindgen_futures::JsFuture::from(promise)
                .await
                .map_err(provider_error),
            Err(value) => Ok(value),
        }
    }
}

#[async_trait(?Send)]
impl SolanaProvider for JsSolanaProvider {
    fn flags(&self) -> BTreeMap<String, bool> {
        ["isPhantom", "isSolflare", "isTrust", "isTrustWallet", "isExodus"]
            .into_iter()
            .filter_map(|name| {
                get_prop(&self.inner, name)
                    .as_bool()
                    .map(|flag| (name.to_string(), flag))
            })
            .collect()
    }

    async fn connect(&self, only_if_trusted: bool) -> Result<Option<String>, ProviderError> {
        let response = if only_if_trusted {
            let options = js_sys::Object::new();
            js_sys::Reflect::set(&options, &"onlyIfTrusted".into(), &JsValue::TRUE)
                .map_err(provider_error)?;
            self.call("connect", &[options.into()]).await?
        } else {
            self.call("connect", &[]).await?
        };
        if is_missing(&response) {
            return Ok(None);
        }
        Ok(js_to_string(&get_prop(&response, "publicKey")))
    }

    fn public_key(&self) -> Option<String> {
        js_to_string(&get_prop(&self.inner, "publicKey"))
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.call("disconnect", &[]).await.map(|_| ())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .call("signMessage", &[js_sys::Uint8Array::from(message).into()])
            .await?;
        bytes_of(&get_prop(&response, "signature"))
            .or_else(|| bytes_of(&response))
            .ok_or_else(|| ProviderError::message("signMessage returned no signature"))
    }

    async fn sign_transaction(&self, tx: &SolTransaction) -> Result<Vec<u8>, ProviderError> {
        let signed = self.call("signTransaction", &[transaction_object(tx)?]).await?;
        if let Some(bytes) = bytes_of(&signed) {
            return Ok(bytes);
        }
        let serialized = self_call(&signed, "serialize")?;
        bytes_of(&serialized)
            .ok_or_else(|| ProviderError::message("signTransaction returned no serialized bytes"))
    }

    fn supports_sign_and_send(&self) -> bool {
        get_prop(&self.inner, "signAndSendTransaction").is_function()
    }

    async fn sign_and_send_transaction(&self, tx: &SolTransaction) -> Result<String, ProviderError> {
        let response = self
            .call("signAndSendTransaction", &[transaction_object(tx)?])
            .await?;
        let signature = get_prop(&response, "signature");
        signature
            .as_string()
            .or_else(|| bytes_of(&signature).map(|b| bs58::encode(b).into_string()))
            .ok_or_else(|| ProviderError::message("signAndSendTransaction returned no signature"))
    }
}

fn self_call(target: &JsValue, method: &str) -> Result<JsValue, ProviderError> {
    get_prop(target, method)
        .dyn_into::<js_sys::Function>()
        .map_err(|_| ProviderError::message(format!("{method} is unavailable")))?
        .call0(target)
        .map_err(provider_error)
}

/// Resolves providers from `window`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowGlobals;

impl SolanaGlobals for WindowGlobals {
    fn lookup(&self, path: &[&str]) -> Option<Rc<dyn SolanaProvider>> {
        let window: JsValue = web_sys::window()?.into();
        let target = path.iter().try_fold(window, |node, key| {
            let next = get_prop(&node, key);
            (!is_missing(&next)).then_some(next)
        })?;
        JsSolanaProvider::new(target).map(|p| Rc::new(p) as Rc<dyn SolanaProvider>)
    }
}
