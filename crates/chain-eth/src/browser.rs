//! Browser bindings: injected EIP-1193 objects and EIP-6963 announcements.

use std::collections::BTreeMap;
use std::rc::Rc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use wallet_api::ProviderError;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use crate::discovery::{Eip6963Discovery, ProviderDetail, ProviderInfo};
use crate::provider::Eip1193Provider;

const ANNOUNCE_EVENT: &str = "eip6963:announceProvider";
const REQUEST_EVENT: &str = "eip6963:requestProvider";

fn get_prop(target: &JsValue, key: &str) -> JsValue {
    js_sys::Reflect::get(target, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

fn is_missing(value: &JsValue) -> bool {
    value.is_null() || value.is_undefined()
}

/// Converts a rejected provider promise into a [`ProviderError`].
pub(crate) fn provider_error(err: JsValue) -> ProviderError {
    let code = get_prop(&err, "code").as_f64().map(|c| c as i64);
    let message = get_prop(&err, "message")
        .as_string()
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    ProviderError { code, message }
}

/// An injected provider object such as `window.ethereum`.
pub struct JsEip1193Provider {
    inner: JsValue,
}

impl JsEip1193Provider {
    pub fn new(inner: JsValue) -> Option<Self> {
        (!is_missing(&inner)).then_some(Self { inner })
    }

    /// `window.ethereum`, when a wallet injected one.
    pub fn from_window() -> Option<Self> {
        let window = web_sys::window()?;
        Self::new(get_prop(&window.into(), "ethereum"))
    }
}

#[async_trait(?Send)]
impl Eip1193Provider for JsEip1193Provider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let request_fn = get_prop(&self.inner, "request")
            .dyn_into::<js_sys::Function>()
            .map_err(|_| ProviderError::message("provider.request is unavailable"))?;

        let mut args = json!({ "method": method });
        if !params.is_null() {
            args["params"] = params;
        }
        let args = args
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| ProviderError::message(format!("failed to encode request: {e}")))?;

        let promise = request_fn
            .call1(&self.inner, &args)
            .map_err(provider_error)?
            .dyn_into::<js_sys::Promise>()
            .map_err(|_| ProviderError::message("provider.request did not return a Promise"))?;
        let result = wasm_bindgen_futures::JsFuture::from(promise)
            .await
            .map_err(provider_error)?;
        if is_missing(&result) {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(result)
            .map_err(|e| ProviderError::message(format!("failed to decode response: {e}")))
    }

    /// Boolean `is*` properties, including inherited ones.
    fn flags(&self) -> BTreeMap<String, bool> {
        let mut flags = BTreeMap::new();
        let Some(mut level) = self.inner.dyn_ref::<js_sys::Object>().cloned() else {
            return flags;
        };
        loop {
            for name in js_sys::Object::get_own_property_names(&level).iter() {
                let Some(name) = name.as_string() else { continue };
                if !name.starts_with("is") || flags.contains_key(&name) {
                    continue;
                }
                if let Some(flag) = get_prop(&self.inner, &name).as_bool() {
                    flags.insert(name, flag);
                }
            }
            let proto = js_sys::Object::get_prototype_of(&level);
            if is_missing(&proto) {
                break;
            }
            level = proto;
        }
        flags
    }

    fn remove_all_listeners(&self) {
        if let Ok(remove) = get_prop(&self.inner, "removeAllListeners").dyn_into::<js_sys::Function>() {
            if let Err(err) = remove.call0(&self.inner) {
                tracing::debug!(?err, "removeAllListeners failed");
            }
        }
    }
}

/// Keeps the `eip6963:announceProvider` listener alive; removes it on drop.
pub struct AnnouncementListener {
    window: web_sys::Window,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl Drop for AnnouncementListener {
    fn drop(&mut self) {
        let _ = self.window.remove_event_listener_with_callback(
            ANNOUNCE_EVENT,
            self.callback.as_ref().unchecked_ref(),
        );
    }
}

/// Starts collecting EIP-6963 announcements into `discovery`, records
/// `window.ethereum` as the fallback and asks wallets to announce.
pub fn start_discovery(discovery: Rc<Eip6963Discovery>) -> Result<AnnouncementListener, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("missing window"))?;

    discovery.set_default(
        JsEip1193Provider::from_window().map(|p| Rc::new(p) as Rc<dyn Eip1193Provider>),
    );

    let sink = Rc::clone(&discovery);
    let callback = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        let Some(event) = event.dyn_ref::<web_sys::CustomEvent>() else {
            return;
        };
        let detail = event.detail();
        let info: ProviderInfo = match serde_wasm_bindgen::from_value(get_prop(&detail, "info")) {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(%err, "ignoring malformed EIP-6963 announcement");
                return;
            }
        };
        let Some(provider) = JsEip1193Provider::new(get_prop(&detail, "provider")) else {
            return;
        };
        sink.announce(ProviderDetail {
            info,
            provider: Rc::new(provider),
        });
    });

    window.add_event_listener_with_callback(ANNOUNCE_EVENT, callback.as_ref().unchecked_ref())?;
    window.dispatch_event(&web_sys::Event::new(REQUEST_EVENT)?)?;

    Ok(AnnouncementListener { window, callback })
}
