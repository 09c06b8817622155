/// The per-feature watch loop: a mutation observer, a handful of one-shot
/// retries, a steady poll, and (for stylesheet-hidden features) a bounded
/// initial enforcer. All of it exists because the host page renders its
/// content asynchronously and keeps destroying and recreating the nodes we
/// hide, so no single signal is reliable on its own.
///
/// Every handle lives inside the `WatchLoop` value; dropping the loop
/// disconnects the observer and cancels every timer, which is what makes
/// route-change teardown a plain `Vec::clear`.
use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::{Interval, Timeout};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{MutationObserver, MutationObserverInit};

use crate::bridge;
use crate::config::Feature;
use crate::content::{PageContext, RouteClass, classify_route};
use crate::enforcer;
use crate::selectors;

const RETRY_DELAYS_MS: [u32; 3] = [1_000, 2_000, 3_500];
const INITIAL_ENFORCER_TICK_MS: u32 = 1_000;
const INITIAL_ENFORCER_MAX_TICKS: u32 = 15;
const RESIZE_DEBOUNCE_MS: u32 = 250;

type IntervalSlot = Rc<RefCell<Option<Interval>>>;

pub struct WatchLoop {
    feature: Feature,
    observer: Option<MutationObserver>,
    // Kept alive for as long as the observer may fire.
    _observer_callback: Option<Closure<dyn FnMut(js_sys::Array, JsValue)>>,
    _retries: Vec<Timeout>,
    poll: IntervalSlot,
    initial_enforcer: IntervalSlot,
    resize_callback: Option<Closure<dyn FnMut()>>,
    _resize_debounce: Rc<RefCell<Option<Timeout>>>,
}

impl WatchLoop {
    /// Start watching one feature. The loop begins in the observing state
    /// and fires enforcement cycles from whichever signal lands first.
    pub fn start(ctx: &Rc<PageContext>, feature: Feature) -> WatchLoop {
        let (observer, observer_callback) = attach_observer(ctx, feature);
        let retries = schedule_retries(ctx, feature);
        let poll = start_poll(ctx, feature);
        let initial_enforcer = start_initial_enforcer(ctx, feature);
        let debounce = Rc::new(RefCell::new(None));
        let resize_callback = if feature.resize_recheck() {
            attach_resize_listener(ctx, feature, &debounce)
        } else {
            None
        };

        WatchLoop {
            feature,
            observer,
            _observer_callback: observer_callback,
            _retries: retries,
            poll,
            initial_enforcer,
            resize_callback,
            _resize_debounce: debounce,
        }
    }
}

impl Drop for WatchLoop {
    fn drop(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        self.poll.borrow_mut().take();
        self.initial_enforcer.borrow_mut().take();
        if let Some(callback) = self.resize_callback.take() {
            if let Some(window) = web_sys::window() {
                let _ = window.remove_event_listener_with_callback(
                    "resize",
                    callback.as_ref().unchecked_ref(),
                );
            }
        }
        log::debug!("watch loop stopped for {:?}", self.feature);
    }
}

/// Observe body subtree mutations and enforce as soon as the feature's
/// targets start resolving. The observer stays connected for the lifetime
/// of the restricted route; the host page keeps replacing the nodes.
fn attach_observer(
    ctx: &Rc<PageContext>,
    feature: Feature,
) -> (
    Option<MutationObserver>,
    Option<Closure<dyn FnMut(js_sys::Array, JsValue)>>,
) {
    let ctx = ctx.clone();
    let callback = Closure::wrap(Box::new(move |_mutations: js_sys::Array, _obs: JsValue| {
        let Some(document) = enforcer::document() else {
            return;
        };
        if !enforcer::resolve_targets(&document, feature).is_empty() {
            ctx.enforcement_cycle(feature);
        }
    }) as Box<dyn FnMut(js_sys::Array, JsValue)>);

    let observer = match MutationObserver::new(callback.as_ref().unchecked_ref()) {
        Ok(observer) => observer,
        Err(err) => {
            log::error!("could not create mutation observer: {err:?}");
            return (None, None);
        }
    };

    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);

    let body = enforcer::document().and_then(|document| document.body());
    match body {
        Some(body) => {
            if let Err(err) = observer.observe_with_options(&body, &init) {
                log::error!("could not observe document body: {err:?}");
                return (None, Some(callback));
            }
        }
        None => {
            log::warn!("no document body to observe yet");
            return (None, Some(callback));
        }
    }

    (Some(observer), Some(callback))
}

/// Fixed-delay one-shot retries, fired regardless of observer signals to
/// catch content that rendered between injection and observation.
fn schedule_retries(ctx: &Rc<PageContext>, feature: Feature) -> Vec<Timeout> {
    RETRY_DELAYS_MS
        .iter()
        .map(|&delay| {
            let ctx = ctx.clone();
            Timeout::new(delay, move || {
                let Some(document) = enforcer::document() else {
                    return;
                };
                if !enforcer::resolve_targets(&document, feature).is_empty() {
                    ctx.enforcement_cycle(feature);
                }
            })
        })
        .collect()
}

/// The steady poll: re-check for the remaining lifetime of the restricted
/// route. Stops itself when the extension context disappears.
fn start_poll(ctx: &Rc<PageContext>, feature: Feature) -> IntervalSlot {
    let slot: IntervalSlot = Rc::new(RefCell::new(None));
    let ctx = ctx.clone();
    let slot_in_tick = slot.clone();

    let interval = Interval::new(ctx.site().config().poll_interval_ms, move || {
        if !bridge::runtime_available() {
            slot_in_tick.borrow_mut().take();
            return;
        }
        let restricted = match current_route(&ctx) {
            Some(RouteClass::Restricted(features)) => features.contains(&feature),
            _ => false,
        };
        if restricted {
            ctx.enforcement_cycle(feature);
        }
    });

    slot.borrow_mut().replace(interval);
    slot
}

/// Aggressive start-up hammer for stylesheet-hidden features: once a second
/// for a bounded window, re-assert the hidden state without waiting for
/// observer callbacks. Self-terminates on manual override or at the ceiling.
fn start_initial_enforcer(ctx: &Rc<PageContext>, feature: Feature) -> IntervalSlot {
    let slot: IntervalSlot = Rc::new(RefCell::new(None));
    if !selectors::uses_hide_style(feature) || ctx.manual_visible(feature) {
        return slot;
    }

    let ctx = ctx.clone();
    let slot_in_tick = slot.clone();
    let ticks = Rc::new(Cell::new(0u32));

    let interval = Interval::new(INITIAL_ENFORCER_TICK_MS, move || {
        ticks.set(ticks.get() + 1);
        if ctx.manual_visible(feature) {
            slot_in_tick.borrow_mut().take();
            return;
        }
        if let Some(document) = enforcer::document() {
            enforcer::force_hide(&document, feature);
        }
        if ticks.get() >= INITIAL_ENFORCER_MAX_TICKS {
            slot_in_tick.borrow_mut().take();
        }
    });

    slot.borrow_mut().replace(interval);
    slot
}

/// The watch-page layout swaps panels around when the window is resized;
/// re-check once the resize settles.
fn attach_resize_listener(
    ctx: &Rc<PageContext>,
    feature: Feature,
    debounce: &Rc<RefCell<Option<Timeout>>>,
) -> Option<Closure<dyn FnMut()>> {
    let window = web_sys::window()?;
    let ctx = ctx.clone();
    let debounce = debounce.clone();

    let callback = Closure::wrap(Box::new(move || {
        let ctx = ctx.clone();
        // Replacing the slot cancels the previous pending timeout.
        debounce.borrow_mut().replace(Timeout::new(
            RESIZE_DEBOUNCE_MS,
            move || ctx.enforcement_cycle(feature),
        ));
    }) as Box<dyn FnMut()>);

    match window.add_event_listener_with_callback("resize", callback.as_ref().unchecked_ref()) {
        Ok(()) => Some(callback),
        Err(err) => {
            log::warn!("could not attach resize listener: {err:?}");
            None
        }
    }
}

fn current_route(ctx: &Rc<PageContext>) -> Option<RouteClass> {
    let window = web_sys::window()?;
    let path = window.location().pathname().ok()?;
    Some(classify_route(ctx.site(), &path))
}
