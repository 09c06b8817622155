/// Popup UI for the Hushfeed extension
///
/// Talks to the background coordinator for everything: site detection,
/// settings reads and writes. If the background round-trip times out, the
/// popup degrades to inspecting the active tab's URL directly.

use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::bridge;
use crate::config::{self, SITE_CONFIGS, Site};
use crate::messages::{CurrentWebsiteResponse, Message, UpdateAck};
use crate::settings::SettingsMap;

const BACKGROUND_TIMEOUT_MS: u32 = 3_000;

#[derive(Clone, PartialEq)]
enum PopupState {
    Loading,
    Ready,
    Error(String),
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| PopupState::Loading);
    let website = use_state(|| None::<Site>);
    let settings = use_state(SettingsMap::new);

    // Detect the site and load its settings on mount
    {
        let state = state.clone();
        let website = website.clone();
        let settings = settings.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                match detect_website().await {
                    Some(site) => {
                        settings.set(load_settings(site).await);
                        website.set(Some(site));
                    }
                    None => website.set(None),
                }
                state.set(PopupState::Ready);
            });
            || ()
        });
    }

    // Build one change handler per control; `keys` is every settings key the
    // control drives, so the primary switch updates both in a single write.
    let make_toggle = {
        let state = state.clone();
        let settings = settings.clone();
        let website = website.clone();
        move |keys: Vec<&'static str>| {
            let state = state.clone();
            let settings = settings.clone();
            let website = website.clone();
            Callback::from(move |e: Event| {
                let Some(input) = e.target_dyn_into::<HtmlInputElement>() else {
                    return;
                };
                let Some(site) = *website else {
                    return;
                };
                let value = input.checked();

                let mut changes = SettingsMap::new();
                let mut next = (*settings).clone();
                for key in &keys {
                    changes.insert(*key, value);
                    next.insert(*key, value);
                }
                settings.set(next);

                let state = state.clone();
                spawn_local(async move {
                    if !push_settings(site, changes).await {
                        state.set(PopupState::Error(
                            "Could not update settings".to_string(),
                        ));
                    }
                });
            })
        }
    };

    let content = match &*state {
        PopupState::Loading => html! {
            <div class="loading-text-center">
                <Spinner />
                <p class="loading-text">{"Detecting website..."}</p>
            </div>
        },
        PopupState::Error(err) => html! {
            <div class="message-top-margin">
                <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                    {err.clone()}
                </Alert>
            </div>
        },
        PopupState::Ready => match *website {
            Some(site) => {
                let all_visible = site
                    .features()
                    .iter()
                    .all(|f| settings.is_visible(f.settings_key()));

                html! {
                    <div class="controls-container">
                        <h2 class="website-header">
                            {format!("{} Settings", site.display_name())}
                        </h2>
                        { toggle_control(
                            format!("Show {} Content", site.display_name()),
                            primary_description(site).to_string(),
                            all_visible,
                            make_toggle(site.setting_keys()),
                        ) }
                        { for site.features().iter().map(|feature| toggle_control(
                            feature.label().to_string(),
                            feature.description().to_string(),
                            settings.is_visible(feature.settings_key()),
                            make_toggle(vec![feature.settings_key()]),
                        )) }
                    </div>
                }
            }
            None => unsupported_notice(),
        },
    };

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Hushfeed"}</h1>
            {content}
            <p class="footer-popup">
                {"Hushfeed v0.1.0"}
            </p>
        </div>
    }
}

fn toggle_control(
    label: String,
    description: String,
    checked: bool,
    onchange: Callback<Event>,
) -> Html {
    html! {
        <div class="control-item">
            <label class="control-label">{label}</label>
            <input
                type="checkbox"
                class="control-toggle"
                checked={checked}
                onchange={onchange}
            />
            <p class="control-description">{description}</p>
        </div>
    }
}

fn primary_description(site: Site) -> &'static str {
    match site {
        Site::LinkedIn => "Toggle both the main LinkedIn feed and the news sidebar",
        Site::YouTube => "Toggle both the YouTube home feed and video suggestions",
    }
}

fn unsupported_notice() -> Html {
    html! {
        <div class="unsupported-message">
            <h2>{"Website Not Supported"}</h2>
            <p>{"This website is not currently supported by Hushfeed."}</p>
            <p>{"Supported websites:"}</p>
            <ul>
                { for SITE_CONFIGS.iter().map(|config| html! {
                    <li>{config.site.display_name()}</li>
                }) }
            </ul>
        </div>
    }
}

// Helper functions

/// Ask the background which site the active tab is on; degrade to direct
/// URL inspection when the round-trip times out or returns nothing usable.
async fn detect_website() -> Option<Site> {
    match background_website().await {
        Some(site) => Some(site),
        None => {
            log::warn!("background detection unavailable, inspecting tab URL directly");
            fallback_detection().await
        }
    }
}

async fn background_website() -> Option<Site> {
    let message = bridge::to_js(&Message::GetCurrentWebsite).ok()?;
    let raw = bridge::send_runtime_message_with_timeout(&message, BACKGROUND_TIMEOUT_MS)
        .await
        .ok()?;
    let response: CurrentWebsiteResponse = bridge::from_js(raw).ok()?;
    config::site_from_id(&response.website?)
}

async fn fallback_detection() -> Option<Site> {
    let tab = bridge::active_tab().await.ok().flatten()?;
    config::website_from_url(&tab.url?)
}

/// Load the site's stored flags through the background; on failure the
/// controls start from the hidden defaults.
async fn load_settings(site: Site) -> SettingsMap {
    let request = Message::GetWebsiteSettings {
        website: site.id().to_string(),
    };
    if let Ok(message) = bridge::to_js(&request) {
        if let Ok(raw) =
            bridge::send_runtime_message_with_timeout(&message, BACKGROUND_TIMEOUT_MS).await
        {
            if let Ok(settings) = bridge::from_js::<SettingsMap>(raw) {
                return settings;
            }
        }
    }
    log::warn!("settings unavailable, using hidden defaults");
    SettingsMap::new()
}

async fn push_settings(site: Site, changes: SettingsMap) -> bool {
    let request = Message::UpdateWebsiteSettings {
        website: site.id().to_string(),
        settings: changes,
    };
    let Ok(message) = bridge::to_js(&request) else {
        return false;
    };
    match bridge::send_runtime_message_with_timeout(&message, BACKGROUND_TIMEOUT_MS).await {
        Ok(raw) => bridge::from_js::<UpdateAck>(raw)
            .map(|ack| ack.success)
            .unwrap_or(false),
        Err(err) => {
            log::error!("settings update failed: {err}");
            false
        }
    }
}
