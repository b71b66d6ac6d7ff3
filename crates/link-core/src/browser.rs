//! Browser glue: the DOM-backed host, a `setTimeout` sleeper and the
//! `createLink` export.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use chain_eth::browser::{start_discovery, AnnouncementListener};
use chain_eth::{Eip6963Discovery, EvmWalletStrategy};
use chain_sol::browser::WindowGlobals;
use chain_sol::{JsonRpcClient, SolanaConfig, SolanaDiscovery, SolanaWalletStrategy};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use wallet_api::Sleeper;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::config::LinkOptions;
use crate::context::SessionContext;
use crate::error::LinkError;
use crate::host::{DocumentHost, LinkHost};
use crate::popup::PopupElements;
use crate::registry::WalletStrategyRegistry;
use crate::session::LinkSession;

fn host_error(err: JsValue) -> LinkError {
    LinkError::Host(
        err.as_string()
            .or_else(|| {
                js_sys::Reflect::get(&err, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{err:?}")),
    )
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::UNDEFINED)
}

/// Resolves after `duration` through `window.setTimeout`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeoutSleeper;

impl Sleeper for TimeoutSleeper {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window().map(|w| {
                w.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
            });
            if !matches!(scheduled, Some(Ok(_))) {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        async move {
            let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
        }
        .boxed_local()
    }
}

type MessageCallback = Closure<dyn FnMut(web_sys::MessageEvent)>;

/// The real page: DOM mutations through `web_sys`, iframe `postMessage`
/// and one window `message` listener.
pub struct WebHost {
    window: web_sys::Window,
    document: web_sys::Document,
    listener: RefCell<Option<MessageCallback>>,
    attached: Cell<bool>,
}

impl WebHost {
    pub fn new() -> Result<Self, LinkError> {
        let window = web_sys::window().ok_or_else(|| LinkError::Host("missing window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| LinkError::Host("missing document".into()))?;
        Ok(Self {
            window,
            document,
            listener: RefCell::new(None),
            attached: Cell::new(false),
        })
    }

    /// Installs the callback run for every window `message` event.
    pub fn set_handler(&self, handler: impl FnMut(web_sys::MessageEvent) + 'static) {
        self.unlisten();
        *self.listener.borrow_mut() = Some(Closure::new(handler));
    }

    fn create(&self, tag: &str, id: &str) -> Result<web_sys::Element, LinkError> {
        let element = self.document.create_element(tag).map_err(host_error)?;
        element.set_id(id);
        Ok(element)
    }
}

impl DocumentHost for WebHost {
    fn has_element(&self, id: &str) -> bool {
        self.document.get_element_by_id(id).is_some()
    }

    fn remove_element(&self, id: &str) -> Result<bool, LinkError> {
        match self.document.get_element_by_id(id) {
            Some(element) => {
                element.remove();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn append_stylesheet(&self, id: &str, css: &str) -> Result<(), LinkError> {
        let style = self.create("style", id)?;
        style.set_text_content(Some(css));
        let head = self
            .document
            .head()
            .ok_or_else(|| LinkError::MissingElement("head".into()))?;
        head.append_child(&style).map_err(host_error)?;
        Ok(())
    }

    fn append_popup(&self, popup: &PopupElements) -> Result<(), LinkError> {
        let root = self.create("div", popup.root_id)?;
        let backdrop = self.create("div", popup.backdrop_id)?;
        let content = self.create("div", popup.content_id)?;

        let iframe = self
            .create("iframe", popup.iframe_id)?
            .dyn_into::<web_sys::HtmlIFrameElement>()
            .map_err(|_| LinkError::Host("iframe element has the wrong type".into()))?;
        iframe.set_src(&popup.iframe_src);
        iframe
            .set_attribute("allow", popup.iframe_allow)
            .map_err(host_error)?;

        content.append_child(&iframe).map_err(host_error)?;
        root.append_child(&backdrop).map_err(host_error)?;
        root.append_child(&content).map_err(host_error)?;

        let body = self
            .document
            .body()
            .ok_or_else(|| LinkError::MissingElement("body".into()))?;
        body.append_child(&root).map_err(host_error)?;
        Ok(())
    }
}

impl LinkHost for WebHost {
    fn page_origin(&self) -> String {
        self.window.location().origin().unwrap_or_default()
    }

    fn post_to_frame(
        &self,
        frame_id: &str,
        message: &Value,
        target_origin: &str,
    ) -> Result<(), LinkError> {
        let frame = self
            .document
            .get_element_by_id(frame_id)
            .and_then(|e| e.dyn_into::<web_sys::HtmlIFrameElement>().ok())
            .ok_or_else(|| LinkError::MissingElement(frame_id.to_string()))?;
        let Some(target) = frame.content_window() else {
            return Err(LinkError::Host("iframe has no content window".into()));
        };
        target
            .post_message(&to_js(message), target_origin)
            .map_err(host_error)
    }

    fn listen(&self) {
        let listener = self.listener.borrow();
        let Some(callback) = listener.as_ref() else {
            tracing::warn!("no message handler installed");
            return;
        };
        if self.attached.get() {
            return;
        }
        match self
            .window
            .add_event_listener_with_callback("message", callback.as_ref().unchecked_ref())
        {
            Ok(()) => self.attached.set(true),
            Err(err) => tracing::error!(error = %host_error(err), "failed to attach message listener"),
        }
    }

    fn unlisten(&self) {
        if !self.attached.get() {
            return;
        }
        if let Some(callback) = self.listener.borrow().as_ref() {
            let _ = self
                .window
                .remove_event_listener_with_callback("message", callback.as_ref().unchecked_ref());
        }
        self.attached.set(false);
    }
}

// ---------------------------------------------------------------------------
// createLink
// ---------------------------------------------------------------------------

/// Page-wide state shared by every `createLink` handle: one context, one
/// host and window listener, one EIP-6963 listener and one set of wallet
/// strategies. Messages go to the most recently opened session.
struct Page {
    context: Rc<SessionContext>,
    host: Rc<WebHost>,
    registry: Rc<WalletStrategyRegistry>,
    active: RefCell<Weak<LinkSession>>,
    _announcements: AnnouncementListener,
}

thread_local! {
    static PAGE: RefCell<Option<Rc<Page>>> = const { RefCell::new(None) };
}

fn page() -> Result<Rc<Page>, LinkError> {
    if let Some(page) = PAGE.with(|slot| slot.borrow().clone()) {
        return Ok(page);
    }
    let evm_discovery = Rc::new(Eip6963Discovery::new());
    let announcements = start_discovery(Rc::clone(&evm_discovery)).map_err(host_error)?;
    let page = Rc::new(Page {
        context: Rc::new(SessionContext::new()),
        host: Rc::new(WebHost::new()?),
        registry: Rc::new(registry(evm_discovery)),
        active: RefCell::new(Weak::new()),
        _announcements: announcements,
    });
    page.host.set_handler(message_handler(Rc::downgrade(&page)));
    PAGE.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&page)));
    Ok(page)
}

fn js_function(options: &JsValue, key: &str) -> Option<js_sys::Function> {
    js_sys::Reflect::get(options, &JsValue::from_str(key))
        .ok()
        .and_then(|f| f.dyn_into::<js_sys::Function>().ok())
}

fn js_field<T: DeserializeOwned>(options: &JsValue, key: &str) -> Option<T> {
    let value = js_sys::Reflect::get(options, &JsValue::from_str(key)).ok()?;
    if value.is_null() || value.is_undefined() {
        return None;
    }
    match serde_wasm_bindgen::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::warn!(%key, %err, "ignoring malformed Link option");
            None
        }
    }
}

fn report(result: Result<JsValue, JsValue>, callback: &str) {
    if let Err(err) = result {
        tracing::error!(%callback, error = %host_error(err), "host callback threw");
    }
}

fn link_options(js: &JsValue) -> LinkOptions {
    let connected = js_function(js, "onIntegrationConnected");
    let mut options = LinkOptions::new(move |payload| {
        if let Some(f) = &connected {
            report(f.call1(&JsValue::NULL, &to_js(payload)), "onIntegrationConnected");
        }
    });

    if let Some(client_id) = js_field::<String>(js, "clientId") {
        options = options.client_id(client_id);
    }
    if let Some(f) = js_function(js, "onExit") {
        options = options.on_exit(move |error, summary| {
            let error = error.map(JsValue::from_str).unwrap_or(JsValue::UNDEFINED);
            let summary = summary.map(to_js).unwrap_or(JsValue::UNDEFINED);
            report(f.call2(&JsValue::NULL, &error, &summary), "onExit");
        });
    }
    if let Some(f) = js_function(js, "onTransferFinished") {
        options = options.on_transfer_finished(move |payload| {
            report(f.call1(&JsValue::NULL, &to_js(payload)), "onTransferFinished");
        });
    }
    if let Some(f) = js_function(js, "onEvent") {
        options = options.on_event(move |event| {
            report(f.call1(&JsValue::NULL, &to_js(event)), "onEvent");
        });
    }
    if let Some(tokens) = js_field(js, "accessTokens") {
        options = options.access_tokens(tokens);
    }
    if let Some(tokens) = js_field(js, "transferDestinationTokens") {
        options = options.transfer_destination_tokens(tokens);
    }
    options
}

fn registry(evm_discovery: Rc<Eip6963Discovery>) -> WalletStrategyRegistry {
    let solana_config = SolanaConfig::default();
    let rpc = Rc::new(JsonRpcClient::new(solana_config.rpc_url.clone()));
    let solana = SolanaWalletStrategy::new(
        Rc::new(SolanaDiscovery::new(Rc::new(WindowGlobals))),
        rpc,
    )
    .with_config(solana_config);

    WalletStrategyRegistry::new()
        .with(Rc::new(EvmWalletStrategy::new(evm_discovery, Rc::new(TimeoutSleeper))))
        .with(Rc::new(solana))
}

fn message_handler(page: Weak<Page>) -> impl FnMut(web_sys::MessageEvent) {
    move |event: web_sys::MessageEvent| {
        let Some(page) = page.upgrade() else {
            return;
        };
        let Some(session) = page.active.borrow().upgrade() else {
            return;
        };
        let origin = event.origin();
        let data: Value = match serde_wasm_bindgen::from_value(event.data()) {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(%origin, %err, "ignoring non-JSON message");
                return;
            }
        };
        wasm_bindgen_futures::spawn_local(async move {
            session.handle_message(&origin, &data).await;
        });
    }
}

/// Handle returned to JavaScript by `createLink`.
#[wasm_bindgen]
pub struct Link {
    page: Rc<Page>,
    session: Rc<LinkSession>,
}

#[wasm_bindgen]
impl Link {
    #[wasm_bindgen(js_name = openLink)]
    pub fn open_link(&self, link_token: &str) {
        match self.session.open(link_token) {
            Ok(()) => *self.page.active.borrow_mut() = Rc::downgrade(&self.session),
            Err(err) => tracing::warn!(error = %err, "openLink failed"),
        }
    }

    #[wasm_bindgen(js_name = closeLink)]
    pub fn close_link(&self) {
        self.session.close();
    }
}

#[wasm_bindgen(js_name = createLink)]
pub fn create_link(options: JsValue) -> Result<Link, JsValue> {
    let page = page().map_err(|e| JsValue::from_str(&e.to_string()))?;
    let session = Rc::new(LinkSession::sharing(
        link_options(&options),
        Rc::clone(&page.context),
        Rc::clone(&page.host) as Rc<dyn LinkHost>,
        Rc::clone(&page.registry),
    ));
    Ok(Link { page, session })
}
