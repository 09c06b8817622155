/// Typed access to the `chrome.*` extension APIs.
///
/// Everything here goes through `js_sys::Reflect` against the global
/// `chrome` object rather than static bindings: when the extension is
/// reloaded while a content script is still attached to an old page, the
/// whole tree simply disappears, and every operation has to notice that and
/// abort quietly instead of throwing into the host page.
use gloo_timers::callback::Timeout;
use js_sys::{Array, Function, Object, Promise, Reflect};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::settings::SettingsMap;

#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    #[error("extension runtime is unavailable")]
    EnvironmentUnavailable,
    #[error("storage operation failed: {0}")]
    Store(String),
    #[error("message round-trip failed: {0}")]
    Messaging(String),
    #[error("chrome API call failed: {0}")]
    Js(String),
}

fn js_text(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

fn chrome() -> Result<JsValue, BridgeError> {
    let chrome = Reflect::get(&js_sys::global(), &"chrome".into())
        .map_err(|_| BridgeError::EnvironmentUnavailable)?;
    if chrome.is_undefined() || chrome.is_null() {
        return Err(BridgeError::EnvironmentUnavailable);
    }
    Ok(chrome)
}

/// Walk `chrome.<path...>`, failing if any segment is missing.
fn chrome_path(path: &[&str]) -> Result<JsValue, BridgeError> {
    let mut current = chrome()?;
    for segment in path {
        current = Reflect::get(&current, &(*segment).into())
            .map_err(|err| BridgeError::Js(js_text(&err)))?;
        if current.is_undefined() || current.is_null() {
            return Err(BridgeError::EnvironmentUnavailable);
        }
    }
    Ok(current)
}

/// Resolve `chrome.<path...>` as a bound method: `(receiver, function)`.
fn method(path: &[&str]) -> Result<(JsValue, Function), BridgeError> {
    let receiver = chrome_path(&path[..path.len() - 1])?;
    let function = Reflect::get(&receiver, &path[path.len() - 1].into())
        .map_err(|err| BridgeError::Js(js_text(&err)))?;
    let function: Function = function
        .dyn_into()
        .map_err(|_| BridgeError::EnvironmentUnavailable)?;
    Ok((receiver, function))
}

/// Call a promise-returning chrome API and await its settlement.
async fn call_async(path: &[&str], args: &Array) -> Result<JsValue, BridgeError> {
    let (receiver, function) = method(path)?;
    let returned = function
        .apply(&receiver, args)
        .map_err(|err| BridgeError::Js(js_text(&err)))?;
    let promise: Promise = returned
        .dyn_into()
        .map_err(|_| BridgeError::Js(format!("chrome.{} did not return a promise", path.join("."))))?;
    JsFuture::from(promise)
        .await
        .map_err(|err| BridgeError::Js(js_text(&err)))
}

fn as_store_error(err: BridgeError) -> BridgeError {
    match err {
        BridgeError::Js(text) => BridgeError::Store(text),
        other => other,
    }
}

fn as_messaging_error(err: BridgeError) -> BridgeError {
    match err {
        BridgeError::Js(text) => BridgeError::Messaging(text),
        other => other,
    }
}

/// True while the extension context behind this page is still alive.
pub fn runtime_available() -> bool {
    chrome_path(&["runtime", "id"])
        .map(|id| id.as_string().is_some())
        .unwrap_or(false)
}

/// Serialize into a plain JS object (not an ES `Map`), which is what the
/// storage and messaging APIs expect.
pub fn to_js<T: Serialize>(value: &T) -> Result<JsValue, BridgeError> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value
        .serialize(&serializer)
        .map_err(|err| BridgeError::Js(err.to_string()))
}

pub fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, BridgeError> {
    serde_wasm_bindgen::from_value(value).map_err(|err| BridgeError::Js(err.to_string()))
}

// --- storage ---------------------------------------------------------------

pub async fn storage_sync_get(keys: &[&str]) -> Result<JsValue, BridgeError> {
    let key_list = Array::new();
    for key in keys {
        key_list.push(&JsValue::from_str(key));
    }
    call_async(&["storage", "sync", "get"], &Array::of1(&key_list))
        .await
        .map_err(as_store_error)
}

pub async fn storage_sync_set(items: &JsValue) -> Result<(), BridgeError> {
    call_async(&["storage", "sync", "set"], &Array::of1(items))
        .await
        .map(|_| ())
        .map_err(as_store_error)
}

/// Read a set of keys as a typed settings mapping. Absent keys are simply
/// absent from the result; the hidden default is applied by the caller.
pub async fn read_settings(keys: &[&str]) -> Result<SettingsMap, BridgeError> {
    let raw = storage_sync_get(keys).await?;
    serde_wasm_bindgen::from_value(raw).map_err(|err| BridgeError::Store(err.to_string()))
}

pub async fn write_settings(settings: &SettingsMap) -> Result<(), BridgeError> {
    let items = to_js(settings).map_err(as_store_error)?;
    storage_sync_set(&items).await
}

// --- messaging -------------------------------------------------------------

pub async fn send_runtime_message(message: &JsValue) -> Result<JsValue, BridgeError> {
    call_async(&["runtime", "sendMessage"], &Array::of1(message))
        .await
        .map_err(as_messaging_error)
}

/// Send a runtime message racing against a deadline, mirroring the popup's
/// resilience contract: a hung background round-trip degrades into the
/// caller's local fallback instead of a spinner.
pub async fn send_runtime_message_with_timeout(
    message: &JsValue,
    timeout_ms: u32,
) -> Result<JsValue, BridgeError> {
    let (receiver, function) = method(&["runtime", "sendMessage"])?;
    let returned = function
        .call1(&receiver, message)
        .map_err(|err| BridgeError::Messaging(js_text(&err)))?;
    let request: Promise = returned
        .dyn_into()
        .map_err(|_| BridgeError::Messaging("sendMessage did not return a promise".into()))?;

    let deadline = Promise::new(&mut |_resolve, reject| {
        Timeout::new(timeout_ms, move || {
            let _ = reject.call1(
                &JsValue::UNDEFINED,
                &JsValue::from_str("background round-trip timed out"),
            );
        })
        .forget();
    });

    let race = Promise::race(&Array::of2(&request, &deadline));
    JsFuture::from(race)
        .await
        .map_err(|err| BridgeError::Messaging(js_text(&err)))
}

pub async fn send_tab_message(tab_id: f64, message: &JsValue) -> Result<JsValue, BridgeError> {
    call_async(
        &["tabs", "sendMessage"],
        &Array::of2(&JsValue::from_f64(tab_id), message),
    )
    .await
    .map_err(as_messaging_error)
}

// --- tabs ------------------------------------------------------------------

/// The slice of a `chrome.tabs.Tab` the extension cares about.
#[derive(Debug, Clone)]
pub struct TabHandle {
    pub id: Option<f64>,
    pub url: Option<String>,
}

/// The active tab of the current window, if there is one.
pub async fn active_tab() -> Result<Option<TabHandle>, BridgeError> {
    let query = Object::new();
    Reflect::set(&query, &"active".into(), &JsValue::TRUE)
        .map_err(|err| BridgeError::Js(js_text(&err)))?;
    Reflect::set(&query, &"currentWindow".into(), &JsValue::TRUE)
        .map_err(|err| BridgeError::Js(js_text(&err)))?;

    let tabs = call_async(&["tabs", "query"], &Array::of1(&query)).await?;
    let tabs: Array = tabs
        .dyn_into()
        .map_err(|_| BridgeError::Js("tabs.query did not return an array".into()))?;
    if tabs.length() == 0 {
        return Ok(None);
    }

    let tab = tabs.get(0);
    let id = Reflect::get(&tab, &"id".into()).ok().and_then(|v| v.as_f64());
    let url = Reflect::get(&tab, &"url".into())
        .ok()
        .and_then(|v| v.as_string());
    Ok(Some(TabHandle { id, url }))
}

pub async fn reload_tab(tab_id: f64) -> Result<(), BridgeError> {
    call_async(&["tabs", "reload"], &Array::of1(&JsValue::from_f64(tab_id)))
        .await
        .map(|_| ())
}

// --- listeners -------------------------------------------------------------

/// Register a `chrome.runtime.onMessage` listener. The handler receives
/// `(message, sender, sendResponse)` and must return `JsValue::TRUE` to keep
/// the response channel open for an async reply.
pub fn on_runtime_message<F>(handler: F) -> Result<(), BridgeError>
where
    F: FnMut(JsValue, JsValue, Function) -> JsValue + 'static,
{
    let (receiver, add_listener) = method(&["runtime", "onMessage", "addListener"])?;
    let callback = Closure::wrap(
        Box::new(handler) as Box<dyn FnMut(JsValue, JsValue, Function) -> JsValue>
    );
    add_listener
        .call1(&receiver, callback.as_ref())
        .map_err(|err| BridgeError::Js(js_text(&err)))?;
    // The listener lives for the rest of the context's lifetime.
    callback.forget();
    Ok(())
}

pub fn on_installed<F>(handler: F) -> Result<(), BridgeError>
where
    F: FnMut() + 'static,
{
    let (receiver, add_listener) = method(&["runtime", "onInstalled", "addListener"])?;
    let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut()>);
    add_listener
        .call1(&receiver, callback.as_ref())
        .map_err(|err| BridgeError::Js(js_text(&err)))?;
    callback.forget();
    Ok(())
}
