//! WebAssembly bindings: content script, background worker and options helpers
//!
//! Chrome APIs are reached through `Reflect` on the global `chrome` object and
//! values cross the boundary as JSON, so the Rust side only ever sees the
//! serde models.

use crate::config::{IndicatorConfig, Timings};
use crate::controller::{FollowUp, MessageOutcome, PageController, SharedPage, OBSERVER_TARGETS};
use crate::coordinator::{
    ExtensionHost, InstallReason, MessageSender, TabCoordinator, TabId, TabInfo, TabStatus,
    SYNC_AREA,
};
use crate::editor::{apply_import, export_settings as settings_export, validate_account_number};
use crate::error::{IndicatorError, Result};
use crate::models::{
    Badge, DomChild, DomNode, PageCapture, Request, Response, RoleContext, SettingsChange,
    StoredSettings, StoredSettingsPatch,
};
use crate::overlay::position::{decode_position, encode_position};
use crate::overlay::{
    OverlayChange, OverlaySurface, Position, PositionCache, Size, Viewport, WatermarkStyle,
};
use js_sys::{Array, Function, Reflect};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, spawn_local, JsFuture};
use web_sys::{
    Document, Element, HtmlElement, MouseEvent, MutationObserver, MutationObserverInit, Node, Window,
};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

macro_rules! console_log {
    ($($t:tt)*) => (log(&format_args!($($t)*).to_string()))
}

/// Class of the watermark element; its subtree is left out of captures
const WATERMARK_CLASS: &str = "aws-account-watermark";

/// Elements whose text never carries identity
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

// ---------------------------------------------------------------------------
// JS interop helpers

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn to_js<T: Serialize>(value: &T) -> std::result::Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(js_error)?;
    js_sys::JSON::parse(&json)
}

fn from_js<T: DeserializeOwned>(value: &JsValue) -> std::result::Result<T, JsValue> {
    let json = js_sys::JSON::stringify(value)?
        .as_string()
        .unwrap_or_else(|| "null".to_string());
    serde_json::from_str(&json).map_err(js_error)
}

/// `chrome.<path>`, failing when any segment is missing
fn chrome(path: &[&str]) -> std::result::Result<JsValue, JsValue> {
    let mut value = Reflect::get(&js_sys::global(), &"chrome".into())?;
    for key in path {
        if value.is_undefined() || value.is_null() {
            break;
        }
        value = Reflect::get(&value, &(*key).into())?;
    }
    if value.is_undefined() || value.is_null() {
        return Err(JsValue::from_str(&format!("chrome.{} is unavailable", path.join("."))));
    }
    Ok(value)
}

/// Call `target[method](...args)` and await the result when it is a promise
async fn call_async(target: &JsValue, method: &str, args: &[JsValue]) -> std::result::Result<JsValue, JsValue> {
    let function: Function = Reflect::get(target, &method.into())?.dyn_into()?;
    let args: Array = args.iter().collect();
    let result = function.apply(target, &args)?;
    match result.dyn_into::<js_sys::Promise>() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(value) => Ok(value),
    }
}

fn add_chrome_listener(path: &[&str], callback: &JsValue) -> std::result::Result<(), JsValue> {
    let event = chrome(path)?;
    let add: Function = Reflect::get(&event, &"addListener".into())?.dyn_into()?;
    add.call1(&event, callback)?;
    Ok(())
}

fn set_timeout(ms: u64, f: impl FnOnce() + 'static) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let callback = Closure::once_into_js(f);
    let delay = i32::try_from(ms).unwrap_or(i32::MAX);
    if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay) {
        console_log!("[AWS Account Indicator] setTimeout failed: {}", describe(&e));
    }
}

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

fn viewport(window: &Window) -> Viewport {
    let dimension = |value: std::result::Result<JsValue, JsValue>| {
        value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as i32
    };
    Size::new(dimension(window.inner_width()), dimension(window.inner_height()))
}

/// `{ awsAccountSettings, roleSettings, globalSettings }` keys present in a
/// `storage.onChanged` payload
fn change_from_keys(changes: &JsValue) -> SettingsChange {
    let has = |key: &str| Reflect::has(changes, &key.into()).unwrap_or(false);
    SettingsChange {
        accounts: has("awsAccountSettings"),
        roles: has("roleSettings"),
        global: has("globalSettings"),
    }
}

// ---------------------------------------------------------------------------
// Page capture

fn capture_element(element: &Element) -> DomNode {
    let mut node = DomNode::element(element.tag_name());
    for name in element.get_attribute_names().iter() {
        if let Some(name) = name.as_string() {
            if let Some(value) = element.get_attribute(&name) {
                node = node.with_attr(name, value);
            }
        }
    }

    // Layout-less elements report no offsetParent; the document root and
    // body never have one
    if let Some(html) = element.dyn_ref::<HtmlElement>() {
        let always_visible = matches!(node.tag.as_str(), "html" | "body");
        if !always_visible && html.offset_parent().is_none() {
            node.visible = false;
        }
    }

    let children = element.child_nodes();
    for i in 0..children.length() {
        let Some(child) = children.item(i) else {
            continue;
        };
        match child.node_type() {
            Node::TEXT_NODE => {
                if let Some(text) = child.text_content() {
                    node.children.push(DomChild::Text(text));
                }
            }
            Node::ELEMENT_NODE => {
                let Some(child) = child.dyn_ref::<Element>() else {
                    continue;
                };
                let tag = child.tag_name().to_ascii_lowercase();
                if SKIPPED_TAGS.contains(&tag.as_str()) || child.class_list().contains(WATERMARK_CLASS) {
                    continue;
                }
                node.children.push(DomChild::Element(capture_element(child)));
            }
            _ => {}
        }
    }
    node
}

/// Snapshot the live document for the detectors
pub fn capture_page() -> std::result::Result<PageCapture, JsValue> {
    let window = web_sys::window().ok_or_else(|| js_error("no window"))?;
    let document = window.document().ok_or_else(|| js_error("no document"))?;
    let root = document
        .document_element()
        .ok_or_else(|| js_error("document has no root element"))?;
    let url = window.location().href()?;
    Ok(PageCapture::new(url, capture_element(&root)))
}

/// Capture the current page as JSON, for saving fixtures
#[wasm_bindgen]
pub fn capture_page_json() -> std::result::Result<String, JsValue> {
    serde_json::to_string(&capture_page()?).map_err(js_error)
}

/// Run detection on the live page and return the identity as JSON
#[wasm_bindgen]
pub fn detect_page() -> std::result::Result<String, JsValue> {
    let capture = capture_page()?;
    let detection = crate::detector::detect_capture(&capture);
    serde_json::to_string(&detection).map_err(js_error)
}

// ---------------------------------------------------------------------------
// Browser-backed surfaces and stores

/// The watermark `<div>` appended to `document.body`
pub struct DomSurface {
    document: Document,
    element: Option<HtmlElement>,
}

impl DomSurface {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            element: None,
        }
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.element
            .as_ref()
            .map(|element| element.contains(Some(node)))
            .unwrap_or(false)
    }

    fn set_style(element: &HtmlElement, property: &str, value: &str) {
        if let Err(e) = element.style().set_property(property, value) {
            console_log!("[AWS Account Indicator] failed to set {}: {}", property, describe(&e));
        }
    }
}

impl OverlaySurface for DomSurface {
    fn is_attached(&self) -> bool {
        self.element
            .as_ref()
            .map(|element| element.is_connected())
            .unwrap_or(false)
    }

    fn mount(&mut self, style: &WatermarkStyle, position: Position) {
        self.unmount();

        let element = match self
            .document
            .create_element("div")
            .and_then(|element| element.dyn_into::<HtmlElement>().map_err(JsValue::from))
        {
            Ok(element) => element,
            Err(e) => {
                console_log!("[AWS Account Indicator] failed to create watermark: {}", describe(&e));
                return;
            }
        };
        element.set_class_name(WATERMARK_CLASS);
        element.set_text_content(Some(&style.text));
        element.style().set_css_text(&style.css_text(position));

        let Some(body) = self.document.body() else {
            return;
        };
        if let Err(e) = body.append_child(&element) {
            console_log!("[AWS Account Indicator] failed to attach watermark: {}", describe(&e));
            return;
        }
        self.element = Some(element);
    }

    fn restyle(&mut self, style: &WatermarkStyle) {
        let Some(element) = self.element.as_ref() else {
            return;
        };
        element.set_text_content(Some(&style.text));
        Self::set_style(element, "background", &style.background);
        Self::set_style(element, "color", &style.color);
        Self::set_style(element, "font-size", &format!("{}px", style.font_size_px));
    }

    fn move_to(&mut self, position: Position) {
        let Some(element) = self.element.as_ref() else {
            return;
        };
        Self::set_style(element, "left", &format!("{}px", position.x));
        Self::set_style(element, "top", &format!("{}px", position.y));
    }

    fn unmount(&mut self) {
        if let Some(element) = self.element.take() {
            element.remove();
        }
    }

    fn element_size(&self) -> Size {
        self.element
            .as_ref()
            .map(|element| Size::new(element.offset_width(), element.offset_height()))
            .unwrap_or(Size::new(0, 0))
    }
}

/// Watermark position in `localStorage`
pub struct LocalStoragePositionCache {
    key: String,
}

impl LocalStoragePositionCache {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn storage() -> Result<web_sys::Storage> {
        web_sys::window()
            .and_then(|window| window.local_storage().ok().flatten())
            .ok_or_else(|| IndicatorError::PositionCache("localStorage unavailable".into()))
    }
}

impl PositionCache for LocalStoragePositionCache {
    fn load(&self) -> Result<Option<Position>> {
        let raw = Self::storage()?
            .get_item(&self.key)
            .map_err(|e| IndicatorError::PositionCache(describe(&e)))?;
        raw.as_deref().map(decode_position).transpose()
    }

    fn save(&mut self, position: Position) -> Result<()> {
        let raw = encode_position(position)?;
        Self::storage()?
            .set_item(&self.key, &raw)
            .map_err(|e| IndicatorError::PositionCache(describe(&e)))
    }
}

/// `chrome.storage.sync`
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncSettingsStore;

fn store_error(e: JsValue) -> IndicatorError {
    IndicatorError::StoreAccess(describe(&e))
}

impl crate::store::SettingsStore for SyncSettingsStore {
    async fn load_keys(&self) -> Result<StoredSettingsPatch> {
        let area = chrome(&["storage", SYNC_AREA]).map_err(store_error)?;
        let items = call_async(&area, "get", &[JsValue::NULL]).await.map_err(store_error)?;
        from_js(&items).map_err(store_error)
    }

    async fn save(&self, settings: &StoredSettings) -> Result<()> {
        let area = chrome(&["storage", SYNC_AREA]).map_err(store_error)?;
        let items = to_js(settings).map_err(store_error)?;
        call_async(&area, "set", &[items]).await.map_err(store_error)?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let area = chrome(&["storage", SYNC_AREA]).map_err(store_error)?;
        call_async(&area, "clear", &[]).await.map_err(store_error)?;
        Ok(())
    }
}

/// Tabs, scripting and action APIs
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeHost;

fn messaging_error(e: JsValue) -> IndicatorError {
    IndicatorError::Messaging(describe(&e))
}

impl ExtensionHost for ChromeHost {
    async fn send_to_tab(&self, tab: TabId, request: &Request) -> Result<Response> {
        let tabs = chrome(&["tabs"]).map_err(messaging_error)?;
        let message = to_js(request).map_err(messaging_error)?;
        let reply = call_async(&tabs, "sendMessage", &[JsValue::from(tab), message])
            .await
            .map_err(messaging_error)?;
        from_js(&reply).map_err(messaging_error)
    }

    async fn inject_indicator(&self, tab: TabId) -> Result<()> {
        let scripting = chrome(&["scripting"]).map_err(messaging_error)?;
        let script = to_js(&serde_json::json!({ "target": { "tabId": tab }, "files": ["content.js"] }))
            .map_err(messaging_error)?;
        call_async(&scripting, "executeScript", &[script]).await.map_err(messaging_error)?;
        let css = to_js(&serde_json::json!({ "target": { "tabId": tab }, "files": ["content.css"] }))
            .map_err(messaging_error)?;
        call_async(&scripting, "insertCSS", &[css]).await.map_err(messaging_error)?;
        Ok(())
    }

    async fn list_tabs(&self) -> Result<Vec<TabInfo>> {
        let tabs = chrome(&["tabs"]).map_err(messaging_error)?;
        let query = js_sys::Object::new();
        let found = call_async(&tabs, "query", &[query.into()]).await.map_err(messaging_error)?;
        let raw: Vec<serde_json::Value> = from_js(&found).map_err(messaging_error)?;
        // Tabs without an id (devtools windows) are skipped
        Ok(raw
            .into_iter()
            .filter_map(|tab| serde_json::from_value(tab).ok())
            .collect())
    }

    async fn set_badge(&self, tab: TabId, badge: &Badge) -> Result<()> {
        let action = chrome(&["action"]).map_err(messaging_error)?;

        // 1. Text
        let text = to_js(&serde_json::json!({ "text": badge.text, "tabId": tab })).map_err(messaging_error)?;
        call_async(&action, "setBadgeText", &[text]).await.map_err(messaging_error)?;

        // 2. Color, only when there is something to show
        if let Some(color) = &badge.color {
            let color = to_js(&serde_json::json!({ "color": color, "tabId": tab })).map_err(messaging_error)?;
            call_async(&action, "setBadgeBackgroundColor", &[color])
                .await
                .map_err(messaging_error)?;
        }

        // 3. Tooltip
        let title = to_js(&serde_json::json!({ "title": badge.title, "tabId": tab })).map_err(messaging_error)?;
        call_async(&action, "setTitle", &[title]).await.map_err(messaging_error)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Content script

type DomPage = SharedPage<DomSurface, LocalStoragePositionCache>;

struct ContentScript {
    page: DomPage,
    store: SyncSettingsStore,
    timings: Timings,
}

fn schedule_adjust(script: &Rc<ContentScript>) {
    let script = script.clone();
    set_timeout(script.timings.post_create_adjust_ms, move || {
        script.page.page().borrow_mut().adjust_overlay();
    });
}

fn run_pass(script: &Rc<ContentScript>, force: bool) {
    let capture = match capture_page() {
        Ok(capture) => capture,
        Err(e) => {
            console_log!("[AWS Account Indicator] capture failed: {}", describe(&e));
            return;
        }
    };
    let outcome = {
        let mut page = script.page.page().borrow_mut();
        if force {
            page.refresh(&capture)
        } else {
            page.detect_pass(&capture)
        }
    };
    if outcome.state_changed {
        console_log!("[AWS Account Indicator] account state changed");
    }
    if outcome.overlay == OverlayChange::Created {
        schedule_adjust(script);
    }
}

fn first_pass(script: &Rc<ContentScript>) {
    let capture = match capture_page() {
        Ok(capture) => capture,
        Err(e) => {
            console_log!("[AWS Account Indicator] capture failed: {}", describe(&e));
            return;
        }
    };
    let (retry, visible) = {
        let mut page = script.page.page().borrow_mut();
        let retry = page.initial_pass(&capture);
        (retry, page.overlay().is_visible())
    };
    if visible {
        schedule_adjust(script);
    }
    if let Some(delay) = retry {
        let script = script.clone();
        set_timeout(delay.as_millis() as u64, move || run_pass(&script, false));
    }
}

fn reload_settings(script: &Rc<ContentScript>, change: SettingsChange) {
    let script = script.clone();
    spawn_local(async move {
        script.page.sync_settings(&script.store, change).await;
    });
}

/// Run whatever a debouncer says is due
fn tick(script: &Rc<ContentScript>) {
    let due = script.page.page().borrow_mut().tick(now_ms());
    if due {
        run_pass(script, false);
    }
}

fn check_url(script: &Rc<ContentScript>) {
    let Some(href) = web_sys::window().and_then(|w| w.location().href().ok()) else {
        return;
    };
    let changed = script.page.page().borrow_mut().url_observed(&href);
    if changed {
        run_pass(script, false);
    }
}

fn listen_for_messages(script: &Rc<ContentScript>) -> std::result::Result<(), JsValue> {
    let script = script.clone();
    let callback = Closure::wrap(Box::new(
        move |message: JsValue, _sender: JsValue, send_response: Function| -> JsValue {
            let outcome = match from_js::<Request>(&message) {
                Ok(request) => script.page.page().borrow().handle_message(&request),
                Err(_) => MessageOutcome::reply(Response::unknown_action()),
            };
            if let Ok(reply) = to_js(&outcome.response) {
                let _ = send_response.call1(&JsValue::UNDEFINED, &reply);
            }
            match outcome.follow_up {
                Some(FollowUp::Redetect) => run_pass(&script, true),
                Some(FollowUp::ReloadSettings(change)) => reload_settings(&script, change),
                None => {}
            }
            JsValue::FALSE
        },
    ) as Box<dyn FnMut(JsValue, JsValue, Function) -> JsValue>);

    add_chrome_listener(&["runtime", "onMessage"], callback.as_ref())?;
    callback.forget();
    Ok(())
}

fn listen_for_storage(script: &Rc<ContentScript>) -> std::result::Result<(), JsValue> {
    let script = script.clone();
    let callback = Closure::wrap(Box::new(move |changes: JsValue, area: JsValue| {
        if area.as_string().as_deref() != Some(SYNC_AREA) {
            return;
        }
        let change = change_from_keys(&changes);
        if !change.is_empty() {
            reload_settings(&script, change);
        }
    }) as Box<dyn FnMut(JsValue, JsValue)>);

    add_chrome_listener(&["storage", "onChanged"], callback.as_ref())?;
    callback.forget();
    Ok(())
}

fn listen_for_resize(window: &Window, script: &Rc<ContentScript>) -> std::result::Result<(), JsValue> {
    let script = script.clone();
    let callback = Closure::wrap(Box::new(move || {
        let Some(window) = web_sys::window() else {
            return;
        };
        script.page.page().borrow_mut().viewport_resized(viewport(&window), now_ms());
        let script = script.clone();
        set_timeout(script.timings.resize_debounce_ms, move || tick(&script));
    }) as Box<dyn FnMut()>);

    window.add_event_listener_with_callback("resize", callback.as_ref().unchecked_ref())?;
    callback.forget();
    Ok(())
}

fn listen_for_pointer(document: &Document, script: &Rc<ContentScript>) -> std::result::Result<(), JsValue> {
    let down = {
        let script = script.clone();
        Closure::wrap(Box::new(move |event: MouseEvent| {
            let on_watermark = event
                .target()
                .and_then(|target| target.dyn_into::<Node>().ok())
                .map(|node| script.page.page().borrow().overlay().surface().contains(&node))
                .unwrap_or(false);
            if !on_watermark {
                return;
            }
            let pointer = Position::new(event.client_x(), event.client_y());
            if script.page.page().borrow_mut().pointer_down(pointer) {
                event.prevent_default();
            }
        }) as Box<dyn FnMut(MouseEvent)>)
    };
    let moved = {
        let script = script.clone();
        Closure::wrap(Box::new(move |event: MouseEvent| {
            let mut page = script.page.page().borrow_mut();
            if page.overlay().is_dragging() {
                page.pointer_move(Position::new(event.client_x(), event.client_y()));
            }
        }) as Box<dyn FnMut(MouseEvent)>)
    };
    let up = {
        let script = script.clone();
        Closure::wrap(Box::new(move |_event: MouseEvent| {
            script.page.page().borrow_mut().pointer_up();
        }) as Box<dyn FnMut(MouseEvent)>)
    };

    document.add_event_listener_with_callback("mousedown", down.as_ref().unchecked_ref())?;
    document.add_event_listener_with_callback("mousemove", moved.as_ref().unchecked_ref())?;
    document.add_event_listener_with_callback("mouseup", up.as_ref().unchecked_ref())?;
    down.forget();
    moved.forget();
    up.forget();
    Ok(())
}

/// Wrap `history[method]` so SPA navigations are noticed immediately
fn hook_history(window: &Window, method: &str, script: &Rc<ContentScript>) -> std::result::Result<(), JsValue> {
    let history: JsValue = window.history()?.into();
    let original: Function = Reflect::get(&history, &method.into())?.dyn_into()?;

    let script = script.clone();
    let target = history.clone();
    let hook = Closure::wrap(Box::new(move |state: JsValue, unused: JsValue, url: JsValue| -> JsValue {
        let result = original
            .call3(&target, &state, &unused, &url)
            .unwrap_or(JsValue::UNDEFINED);
        check_url(&script);
        result
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);

    Reflect::set(&history, &method.into(), hook.as_ref())?;
    hook.forget();
    Ok(())
}

fn watch_navigation(window: &Window, script: &Rc<ContentScript>) -> std::result::Result<(), JsValue> {
    // 1. Back/forward
    let popstate = {
        let script = script.clone();
        Closure::wrap(Box::new(move || check_url(&script)) as Box<dyn FnMut()>)
    };
    window.add_event_listener_with_callback("popstate", popstate.as_ref().unchecked_ref())?;
    popstate.forget();

    // 2. pushState / replaceState
    hook_history(window, "pushState", script)?;
    hook_history(window, "replaceState", script)?;

    // 3. Poll as a fallback
    let poll = {
        let script = script.clone();
        Closure::wrap(Box::new(move || check_url(&script)) as Box<dyn FnMut()>)
    };
    let interval = i32::try_from(script.timings.url_poll_ms).unwrap_or(i32::MAX);
    window.set_interval_with_callback_and_timeout_and_arguments_0(poll.as_ref().unchecked_ref(), interval)?;
    poll.forget();
    Ok(())
}

fn observe_dom(script: &Rc<ContentScript>) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };

    let callback = {
        let script = script.clone();
        Closure::wrap(Box::new(move |_records: JsValue, _observer: JsValue| {
            script.page.page().borrow_mut().dom_mutated(now_ms());
            let script = script.clone();
            set_timeout(script.timings.dom_debounce_ms, move || tick(&script));
        }) as Box<dyn FnMut(JsValue, JsValue)>)
    };

    let observer = match MutationObserver::new(callback.as_ref().unchecked_ref()) {
        Ok(observer) => observer,
        Err(e) => {
            console_log!("[AWS Account Indicator] MutationObserver unavailable: {}", describe(&e));
            return;
        }
    };
    callback.forget();

    let options = MutationObserverInit::new();
    let header = OBSERVER_TARGETS
        .iter()
        .find_map(|selector| document.query_selector(selector).ok().flatten());
    let target: Option<Node> = match header {
        Some(element) => {
            options.set_child_list(true);
            options.set_subtree(true);
            options.set_character_data(true);
            Some(element.into())
        }
        None => {
            // Body only, without descending into the page
            options.set_child_list(true);
            document.body().map(Node::from)
        }
    };

    let Some(target) = target else {
        return;
    };
    if let Err(e) = observer.observe_with_options(&target, &options) {
        console_log!("[AWS Account Indicator] failed to observe DOM: {}", describe(&e));
    }
}

/// Start the indicator on the current page. `config_json` is an optional
/// JSON5 [`IndicatorConfig`].
#[wasm_bindgen]
pub fn start_content_script(config_json: Option<String>) -> std::result::Result<(), JsValue> {
    let config = match config_json {
        Some(json) => IndicatorConfig::from_json5(&json).map_err(js_error)?,
        None => IndicatorConfig::default(),
    };
    let window = web_sys::window().ok_or_else(|| js_error("no window"))?;
    let document = window.document().ok_or_else(|| js_error("no document"))?;
    let url = window.location().href()?;

    let controller = PageController::new(
        DomSurface::new(document.clone()),
        LocalStoragePositionCache::new(config.overlay.position_cache_key.clone()),
        &config,
        viewport(&window),
        &url,
    );
    let script = Rc::new(ContentScript {
        page: SharedPage::new(controller),
        store: SyncSettingsStore,
        timings: config.timings,
    });

    listen_for_messages(&script)?;
    listen_for_storage(&script)?;
    listen_for_resize(&window, &script)?;
    listen_for_pointer(&document, &script)?;
    watch_navigation(&window, &script)?;

    // Settings first, then the delayed first detection
    {
        let script = script.clone();
        spawn_local(async move {
            script.page.sync_settings(&script.store, SettingsChange::all()).await;
            let delay = script.timings.initial_delay_ms;
            set_timeout(delay, move || first_pass(&script));
        });
    }

    {
        let observed = script.clone();
        set_timeout(script.timings.observer_start_ms, move || observe_dom(&observed));
    }

    console_log!("[AWS Account Indicator] started on {}", url);
    Ok(())
}

// ---------------------------------------------------------------------------
// Background worker

type Coordinator = TabCoordinator<ChromeHost, SyncSettingsStore>;

fn coordinator() -> Coordinator {
    TabCoordinator::new(ChromeHost, SyncSettingsStore)
}

/// Register the background listeners
#[wasm_bindgen]
pub fn start_background() -> std::result::Result<(), JsValue> {
    let coordinator = Rc::new(coordinator());

    // 1. Install / update
    let installed = {
        let coordinator = coordinator.clone();
        Closure::wrap(Box::new(move |details: JsValue| {
            let reason = Reflect::get(&details, &"reason".into())
                .ok()
                .and_then(|reason| from_js::<InstallReason>(&reason).ok())
                .unwrap_or(InstallReason::Other);
            let coordinator = coordinator.clone();
            spawn_local(async move {
                coordinator.on_installed(reason).await;
            });
        }) as Box<dyn FnMut(JsValue)>)
    };
    add_chrome_listener(&["runtime", "onInstalled"], installed.as_ref())?;
    installed.forget();

    // 2. Finished tab loads
    let updated = {
        let coordinator = coordinator.clone();
        Closure::wrap(Box::new(move |_tab_id: JsValue, change_info: JsValue, tab: JsValue| {
            let status = Reflect::get(&change_info, &"status".into())
                .ok()
                .and_then(|status| from_js::<TabStatus>(&status).ok());
            let (Some(status), Ok(tab)) = (status, from_js::<TabInfo>(&tab)) else {
                return;
            };
            let coordinator = coordinator.clone();
            spawn_local(async move {
                coordinator.on_tab_updated(&tab, status).await;
            });
        }) as Box<dyn FnMut(JsValue, JsValue, JsValue)>)
    };
    add_chrome_listener(&["tabs", "onUpdated"], updated.as_ref())?;
    updated.forget();

    // 3. Settings changes
    let changed = {
        let coordinator = coordinator.clone();
        Closure::wrap(Box::new(move |changes: JsValue, area: JsValue| {
            let area = area.as_string().unwrap_or_default();
            let change = change_from_keys(&changes);
            let coordinator = coordinator.clone();
            spawn_local(async move {
                coordinator.on_storage_changed(&area, change).await;
            });
        }) as Box<dyn FnMut(JsValue, JsValue)>)
    };
    add_chrome_listener(&["storage", "onChanged"], changed.as_ref())?;
    changed.forget();

    // 4. Runtime messages, answered asynchronously
    let messages = {
        let coordinator = coordinator.clone();
        Closure::wrap(Box::new(
            move |message: JsValue, sender: JsValue, send_response: Function| -> JsValue {
                let tab = Reflect::get(&sender, &"tab".into())
                    .ok()
                    .filter(|tab| !tab.is_undefined())
                    .and_then(|tab| Reflect::get(&tab, &"id".into()).ok())
                    .and_then(|id| id.as_f64())
                    .map(|id| id as TabId);
                let request = from_js::<Request>(&message);
                let coordinator = coordinator.clone();
                spawn_local(async move {
                    let response = match request {
                        Ok(request) => coordinator.handle_message(&request, MessageSender { tab }).await,
                        Err(_) => Response::unknown_action(),
                    };
                    if let Ok(reply) = to_js(&response) {
                        let _ = send_response.call1(&JsValue::UNDEFINED, &reply);
                    }
                });
                JsValue::TRUE
            },
        ) as Box<dyn FnMut(JsValue, JsValue, Function) -> JsValue>)
    };
    add_chrome_listener(&["runtime", "onMessage"], messages.as_ref())?;
    messages.forget();

    console_log!("[AWS Account Indicator] background started");
    Ok(())
}

/// Ask every AWS tab to re-detect. Resolves to the number of tabs reached.
#[wasm_bindgen]
pub fn refresh_all_tabs() -> js_sys::Promise {
    future_to_promise(async move {
        let delivered = coordinator().refresh_all_tabs().await;
        Ok(JsValue::from(delivered as u32))
    })
}

// ---------------------------------------------------------------------------
// Options page helpers

/// Identity in the first AWS tab that reports one, for the quick config
/// form. Resolves to `null` when no tab does.
#[wasm_bindgen]
pub fn quick_config_account() -> js_sys::Promise {
    future_to_promise(async move {
        match coordinator().current_account().await {
            Some(info) => to_js(&info),
            None => Ok(JsValue::NULL),
        }
    })
}

/// Normalised 12-digit account number, or the validation message
#[wasm_bindgen]
pub fn normalize_account_number(input: &str) -> std::result::Result<String, JsValue> {
    validate_account_number(input)
        .map(|account| account.as_str().to_string())
        .map_err(js_error)
}

/// Resolve the watermark for an account. `role_json` is a serialized
/// [`RoleContext`] or empty for no role.
#[wasm_bindgen]
pub fn resolve_display(account: &str, role_json: &str, settings_json: &str) -> std::result::Result<String, JsValue> {
    let account = validate_account_number(account).map_err(js_error)?;
    let role: RoleContext = if role_json.trim().is_empty() {
        RoleContext::not_switched()
    } else {
        serde_json::from_str(role_json).map_err(js_error)?
    };
    let settings: StoredSettings = serde_json::from_str(settings_json).map_err(js_error)?;
    serde_json::to_string(&crate::resolver::resolve(&account, &role, &settings)).map_err(js_error)
}

/// `[fileName, json]` for a download
#[wasm_bindgen]
pub fn export_settings(settings_json: &str) -> std::result::Result<Array, JsValue> {
    let settings: StoredSettings = serde_json::from_str(settings_json).map_err(js_error)?;
    let (file_name, json) = settings_export(&settings, chrono::Utc::now()).map_err(js_error)?;
    Ok(Array::of2(&file_name.into(), &json.into()))
}

/// Validate an export file against the current settings. Returns
/// `{ settings, accounts, roles }` without writing anything.
#[wasm_bindgen]
pub fn import_settings(json: &str, current_json: &str) -> std::result::Result<String, JsValue> {
    let current: StoredSettings = serde_json::from_str(current_json).map_err(js_error)?;
    let (settings, summary) = apply_import(json, &current).map_err(js_error)?;
    serde_json::to_string(&serde_json::json!({
        "settings": settings,
        "accounts": summary.accounts,
        "roles": summary.roles,
    }))
    .map_err(js_error)
}
