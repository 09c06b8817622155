/// Background coordinator: the sole owner of cross-context messaging.
/// Resolves the active tab to a supported site, proxies settings reads and
/// writes, forwards update notifications to the active tab, and seeds
/// defaults on install.
use js_sys::{Function, Reflect};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::bridge;
use crate::config;
use crate::messages::{CurrentWebsiteResponse, Message, UpdateAck};
use crate::settings::SettingsMap;

pub fn run() {
    if let Err(err) = bridge::on_runtime_message(handle_message) {
        log::error!("could not attach background message listener: {err}");
    }
    if let Err(err) = bridge::on_installed(|| spawn_local(seed_default_settings())) {
        log::error!("could not attach install listener: {err}");
    }
    log::info!("background coordinator ready");
}

fn handle_message(message: JsValue, sender: JsValue, send_response: Function) -> JsValue {
    let Ok(message) = bridge::from_js::<Message>(message) else {
        return JsValue::FALSE;
    };

    match message {
        Message::GetCurrentWebsite => {
            spawn_local(async move {
                respond(&send_response, &current_website().await);
            });
            JsValue::TRUE
        }
        Message::GetWebsiteSettings { website } => {
            spawn_local(async move {
                respond(&send_response, &website_settings(&website).await);
            });
            JsValue::TRUE
        }
        Message::UpdateWebsiteSettings { website, settings } => {
            spawn_local(async move {
                respond(&send_response, &update_website_settings(&website, settings).await);
            });
            JsValue::TRUE
        }
        Message::RequestReload => {
            let tab_id = sender_tab_id(&sender);
            spawn_local(async move {
                reload_requesting_tab(tab_id).await;
            });
            JsValue::FALSE
        }
        // Content-script-bound messages are not ours to answer.
        _ => JsValue::FALSE,
    }
}

fn respond<T: Serialize>(send_response: &Function, payload: &T) {
    match bridge::to_js(payload) {
        Ok(value) => {
            let _ = send_response.call1(&JsValue::UNDEFINED, &value);
        }
        Err(err) => log::error!("could not serialize response: {err}"),
    }
}

async fn current_website() -> CurrentWebsiteResponse {
    let tab = match bridge::active_tab().await {
        Ok(Some(tab)) => tab,
        Ok(None) => {
            log::warn!("no active tab found");
            return CurrentWebsiteResponse::unsupported();
        }
        Err(err) => {
            log::error!("could not query active tab: {err}");
            return CurrentWebsiteResponse::unsupported();
        }
    };

    match tab.url.as_deref().and_then(config::website_from_url) {
        Some(site) => CurrentWebsiteResponse {
            website: Some(site.id().to_string()),
            config: Some(site.into()),
        },
        None => CurrentWebsiteResponse::unsupported(),
    }
}

/// Stored flags for one site, restricted to that site's configured keys.
async fn website_settings(website: &str) -> SettingsMap {
    let Some(site) = config::site_from_id(website) else {
        return SettingsMap::new();
    };
    let keys = site.setting_keys();
    match bridge::read_settings(&keys).await {
        Ok(settings) => settings.filtered(&keys),
        Err(err) => {
            log::warn!("could not read settings for {website}: {err}");
            SettingsMap::new()
        }
    }
}

/// Write through to the store, then best-effort push the new flags to the
/// active tab. A failed push is normal (the tab may have no content script)
/// and never turns a successful write into a failed ack.
async fn update_website_settings(website: &str, settings: SettingsMap) -> UpdateAck {
    if let Err(err) = bridge::write_settings(&settings).await {
        log::error!("could not persist settings for {website}: {err}");
        return UpdateAck { success: false };
    }

    if config::site_from_id(website).is_some() {
        notify_active_tab(settings).await;
    }
    UpdateAck { success: true }
}

async fn notify_active_tab(settings: SettingsMap) {
    let tab = match bridge::active_tab().await {
        Ok(Some(tab)) => tab,
        Ok(None) => return,
        Err(err) => {
            log::warn!("could not find a tab to notify: {err}");
            return;
        }
    };
    let Some(tab_id) = tab.id else {
        return;
    };
    let push = Message::UpdateSettings { settings };
    match bridge::to_js(&push) {
        Ok(message) => {
            if let Err(err) = bridge::send_tab_message(tab_id, &message).await {
                log::debug!("active tab has no content script: {err}");
            }
        }
        Err(err) => log::warn!("could not serialize settings push: {err}"),
    }
}

fn sender_tab_id(sender: &JsValue) -> Option<f64> {
    let tab = Reflect::get(sender, &"tab".into()).ok()?;
    Reflect::get(&tab, &"id".into()).ok()?.as_f64()
}

async fn reload_requesting_tab(tab_id: Option<f64>) {
    // Fall back to the active tab when the sender carried no tab, which
    // happens for messages relayed through another extension context.
    let tab_id = match tab_id {
        Some(id) => Some(id),
        None => match bridge::active_tab().await {
            Ok(Some(tab)) => tab.id,
            _ => None,
        },
    };
    let Some(tab_id) = tab_id else {
        log::warn!("reload requested but no tab to reload");
        return;
    };
    if let Err(err) = bridge::reload_tab(tab_id).await {
        log::warn!("could not reload tab: {err}");
    }
}

/// First-install seeding: every known key that is entirely absent from the
/// store starts out hidden. Existing values are never overwritten.
async fn seed_default_settings() {
    let keys = config::all_setting_keys();
    let existing = match bridge::read_settings(&keys).await {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("could not read settings for seeding: {err}");
            return;
        }
    };
    let missing = SettingsMap::missing_defaults(&existing, &keys);
    if missing.is_empty() {
        return;
    }
    match bridge::write_settings(&missing).await {
        Ok(()) => log::info!("seeded {} default settings", missing.len()),
        Err(err) => log::error!("could not seed default settings: {err}"),
    }
}
