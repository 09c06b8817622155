/// Content coordinator: owns the per-page state, maps the current path to a
/// route class, starts and stops watch loops, and reacts to inbound
/// messages from the background.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use js_sys::{Function, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::Event;

use crate::bridge;
use crate::config::{Feature, Site};
use crate::enforcer;
use crate::messages::{Message, UpdateAck};
use crate::watch::WatchLoop;

const LOCATION_CHANGE_EVENT: &str = "locationchange";
const RELOAD_DELAY_MS: u32 = 700;
const RELOAD_ATTEMPTED_KEY: &str = "hushfeed_reloaded";

/// What the current path means for enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Hiding is active for these features.
    Restricted(&'static [Feature]),
    /// No enforcement; content is left alone.
    Default,
}

pub fn classify_route(site: Site, path: &str) -> RouteClass {
    match site {
        Site::LinkedIn => {
            if path.starts_with("/feed") {
                RouteClass::Restricted(&[Feature::LinkedInFeed, Feature::LinkedInAside])
            } else {
                RouteClass::Default
            }
        }
        Site::YouTube => match path {
            "/" => RouteClass::Restricted(&[Feature::YouTubeHomeFeed]),
            "/watch" => RouteClass::Restricted(&[Feature::YouTubeRightPanel]),
            _ => RouteClass::Default,
        },
    }
}

/// All mutable state for one page load. Owned here and passed around
/// explicitly; watch loops and enforcer calls never touch ambient globals.
pub struct PageContext {
    site: Site,
    /// Last value the user explicitly requested per feature, if any.
    /// Presence alone means "the user interacted this page load".
    manual: RefCell<HashMap<Feature, bool>>,
    loops: RefCell<Vec<WatchLoop>>,
    reload_timer: RefCell<Option<Timeout>>,
}

impl PageContext {
    fn new(site: Site) -> Self {
        PageContext {
            site,
            manual: RefCell::new(HashMap::new()),
            loops: RefCell::new(Vec::new()),
            reload_timer: RefCell::new(None),
        }
    }

    pub fn site(&self) -> Site {
        self.site
    }

    /// True while the user's last manual request for this feature was
    /// "visible" — automatic cycles must not fight that.
    pub fn manual_visible(&self, feature: Feature) -> bool {
        self.manual.borrow().get(&feature).copied().unwrap_or(false)
    }

    fn user_interacted(&self) -> bool {
        !self.manual.borrow().is_empty()
    }

    fn set_manual(&self, feature: Feature, value: bool) {
        self.manual.borrow_mut().insert(feature, value);
    }

    /// One enforcement cycle: bail quietly without a runtime, re-read the
    /// store, skip features under manual override, re-resolve targets and
    /// apply. Failures are logged and the cycle skipped; the next tick is
    /// the retry.
    pub fn enforcement_cycle(self: &Rc<Self>, feature: Feature) {
        if !bridge::runtime_available() {
            return;
        }
        if self.manual_visible(feature) {
            return;
        }
        let ctx = self.clone();
        spawn_local(async move {
            let key = feature.settings_key();
            let visible = match bridge::read_settings(&[key]).await {
                Ok(settings) => settings.is_visible(key),
                Err(err) => {
                    log::warn!("skipping enforcement cycle for {key}: {err}");
                    return;
                }
            };
            // The user may have toggled while the read was in flight.
            if ctx.manual_visible(feature) {
                return;
            }
            if let Some(document) = enforcer::document() {
                enforcer::apply(&document, feature, visible);
            }
        });
    }
}

/// Entry point for a site's content script.
pub fn run(site: Site) {
    let ctx = Rc::new(PageContext::new(site));
    if let Err(err) = install_history_hooks() {
        log::error!("could not hook history navigation: {err:?}");
    }
    install_navigation_listeners(&ctx);
    install_message_listener(&ctx);
    schedule_initial_pass(ctx);
    log::info!("content coordinator running for {}", site.id());
}

/// Wrap `history.pushState`/`replaceState` so SPA navigations republish a
/// synthetic `locationchange` event. Arguments and return values pass
/// through untouched.
fn install_history_hooks() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let history: JsValue = window.history()?.into();

    for name in ["pushState", "replaceState"] {
        let original: Function = Reflect::get(&history, &name.into())?.dyn_into()?;
        let receiver = history.clone();
        let wrapper = Closure::wrap(Box::new(
            move |state: JsValue, title: JsValue, url: JsValue| -> JsValue {
                match original.call3(&receiver, &state, &title, &url) {
                    Ok(ret) => {
                        notify_location_changed();
                        ret
                    }
                    Err(err) => {
                        log::warn!("history call failed: {err:?}");
                        JsValue::UNDEFINED
                    }
                }
            },
        )
            as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);
        Reflect::set(&history, &name.into(), wrapper.as_ref())?;
        wrapper.forget();
    }
    Ok(())
}

fn notify_location_changed() {
    let Some(window) = web_sys::window() else {
        return;
    };
    match Event::new(LOCATION_CHANGE_EVENT) {
        Ok(event) => {
            let _ = window.dispatch_event(&event);
        }
        Err(err) => log::warn!("could not dispatch location change: {err:?}"),
    }
}

fn install_navigation_listeners(ctx: &Rc<PageContext>) {
    let Some(window) = web_sys::window() else {
        return;
    };

    // Back/forward navigations come in as popstate.
    let popstate = Closure::wrap(Box::new(notify_location_changed) as Box<dyn FnMut()>);
    if let Err(err) =
        window.add_event_listener_with_callback("popstate", popstate.as_ref().unchecked_ref())
    {
        log::warn!("could not listen for popstate: {err:?}");
    }
    popstate.forget();

    let ctx = ctx.clone();
    let on_change = Closure::wrap(Box::new(move || on_location_change(&ctx)) as Box<dyn FnMut()>);
    if let Err(err) = window
        .add_event_listener_with_callback(LOCATION_CHANGE_EVENT, on_change.as_ref().unchecked_ref())
    {
        log::warn!("could not listen for location changes: {err:?}");
    }
    on_change.forget();
}

fn on_location_change(ctx: &Rc<PageContext>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(path) = window.location().pathname() else {
        return;
    };

    // Tear down the previous route's generation before starting the next,
    // so two generations never fight over the same DOM.
    ctx.loops.borrow_mut().clear();
    ctx.reload_timer.borrow_mut().take();

    match classify_route(ctx.site(), &path) {
        RouteClass::Restricted(features) => {
            log::debug!("restricted route {path}: watching {} regions", features.len());
            let loops: Vec<WatchLoop> = features
                .iter()
                .map(|&feature| WatchLoop::start(ctx, feature))
                .collect();
            *ctx.loops.borrow_mut() = loops;

            if ctx.site().config().reload_fallback {
                schedule_reload_fallback(ctx);
            }
        }
        RouteClass::Default => default_route_pass(ctx),
    }
}

fn default_route_pass(ctx: &Rc<PageContext>) {
    match ctx.site() {
        // Off the feed, stored settings still apply to feed modules embedded
        // in other LinkedIn pages.
        Site::LinkedIn => {
            for &feature in ctx.site().features() {
                ctx.enforcement_cycle(feature);
            }
        }
        // YouTube's other pages get their content back.
        Site::YouTube => {
            let Some(document) = enforcer::document() else {
                return;
            };
            for &feature in ctx.site().features() {
                enforcer::apply(&document, feature, true);
            }
        }
    }
}

/// One-time fallback for pages that rendered before injection finished:
/// shortly after first entering the restricted route, ask the background to
/// reload the tab — unless the user already toggled something, and never
/// twice in the same tab (the flag lives in sessionStorage so it survives
/// the reload it triggers).
fn schedule_reload_fallback(ctx: &Rc<PageContext>) {
    if reload_already_attempted() {
        return;
    }
    let ctx_in_timer = ctx.clone();
    let timeout = Timeout::new(RELOAD_DELAY_MS, move || {
        if ctx_in_timer.user_interacted() {
            return;
        }
        mark_reload_attempted();
        spawn_local(async {
            match bridge::to_js(&Message::RequestReload) {
                Ok(message) => {
                    if let Err(err) = bridge::send_runtime_message(&message).await {
                        log::warn!("could not request reload: {err}");
                    }
                }
                Err(err) => log::warn!("could not build reload request: {err}"),
            }
        });
    });
    ctx.reload_timer.borrow_mut().replace(timeout);
}

fn reload_already_attempted() -> bool {
    web_sys::window()
        .and_then(|window| window.session_storage().ok().flatten())
        .and_then(|storage| storage.get_item(RELOAD_ATTEMPTED_KEY).ok().flatten())
        .is_some()
}

fn mark_reload_attempted() {
    if let Some(storage) = web_sys::window().and_then(|window| window.session_storage().ok().flatten())
    {
        let _ = storage.set_item(RELOAD_ATTEMPTED_KEY, "1");
    }
}

fn install_message_listener(ctx: &Rc<PageContext>) {
    let ctx = ctx.clone();
    let result = bridge::on_runtime_message(move |message, _sender, send_response| {
        let Ok(message) = bridge::from_js::<Message>(message) else {
            // Unknown action or not addressed to content scripts.
            return JsValue::FALSE;
        };
        handle_message(&ctx, message, &send_response)
    });
    if let Err(err) = result {
        log::error!("could not attach message listener: {err}");
    }
}

fn handle_message(ctx: &Rc<PageContext>, message: Message, send_response: &Function) -> JsValue {
    let handled = match message {
        Message::UpdateSettings { settings } => {
            let mut any = false;
            for &feature in ctx.site().features() {
                if !feature_on_current_route(ctx, feature) {
                    continue;
                }
                if let Some(value) = settings.get(feature.settings_key()) {
                    apply_manual(ctx, feature, value);
                    any = true;
                }
            }
            any
        }
        other => match other.toggle_target() {
            Some((feature, value))
                if feature.site() == ctx.site() && feature_on_current_route(ctx, feature) =>
            {
                apply_manual(ctx, feature, value);
                true
            }
            _ => false,
        },
    };

    if handled {
        if let Ok(ack) = bridge::to_js(&UpdateAck { success: true }) {
            let _ = send_response.call1(&JsValue::UNDEFINED, &ack);
        }
    }
    // Responses, when any, were sent synchronously above.
    JsValue::FALSE
}

/// Apply a user-driven value: the payload is authoritative for this one
/// application (no storage read), and the choice is remembered for the
/// rest of the page lifetime.
fn apply_manual(ctx: &Rc<PageContext>, feature: Feature, value: bool) {
    ctx.set_manual(feature, value);
    if let Some(document) = enforcer::document() {
        enforcer::apply(&document, feature, value);
    }
}

fn feature_on_current_route(ctx: &Rc<PageContext>, feature: Feature) -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    let Ok(path) = window.location().pathname() else {
        return false;
    };
    match classify_route(ctx.site(), &path) {
        RouteClass::Restricted(features) => features.contains(&feature),
        RouteClass::Default => false,
    }
}

fn schedule_initial_pass(ctx: Rc<PageContext>) {
    let Some(document) = enforcer::document() else {
        return;
    };
    if document.ready_state() == "loading" {
        let callback = Closure::wrap(Box::new(move || on_location_change(&ctx)) as Box<dyn FnMut()>);
        if let Err(err) = document
            .add_event_listener_with_callback("DOMContentLoaded", callback.as_ref().unchecked_ref())
        {
            log::warn!("could not wait for DOMContentLoaded: {err:?}");
        }
        callback.forget();
    } else {
        on_location_change(&ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linkedin_feed_routes_are_restricted() {
        assert_eq!(
            classify_route(Site::LinkedIn, "/feed"),
            RouteClass::Restricted(&[Feature::LinkedInFeed, Feature::LinkedInAside])
        );
        assert_eq!(
            classify_route(Site::LinkedIn, "/feed/update/urn:li:activity:123"),
            RouteClass::Restricted(&[Feature::LinkedInFeed, Feature::LinkedInAside])
        );
    }

    #[test]
    fn test_linkedin_other_routes_are_default() {
        assert_eq!(classify_route(Site::LinkedIn, "/"), RouteClass::Default);
        assert_eq!(classify_route(Site::LinkedIn, "/jobs"), RouteClass::Default);
        assert_eq!(
            classify_route(Site::LinkedIn, "/in/someone"),
            RouteClass::Default
        );
    }

    #[test]
    fn test_youtube_routes() {
        assert_eq!(
            classify_route(Site::YouTube, "/"),
            RouteClass::Restricted(&[Feature::YouTubeHomeFeed])
        );
        assert_eq!(
            classify_route(Site::YouTube, "/watch"),
            RouteClass::Restricted(&[Feature::YouTubeRightPanel])
        );
        assert_eq!(
            classify_route(Site::YouTube, "/results"),
            RouteClass::Default
        );
        // The home route is an exact match, not a prefix.
        assert_eq!(
            classify_route(Site::YouTube, "/playlist"),
            RouteClass::Default
        );
    }
}
