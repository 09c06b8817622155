/// Hushfeed - Chrome Extension that hides distracting feeds
/// Built with Rust + WASM + Yew

mod background;
mod bridge;
pub mod config;
mod content;
pub mod enforcer;
pub mod messages;
pub mod selectors;
pub mod settings;
mod watch;
pub mod ui;

use wasm_bindgen::prelude::*;

use crate::config::Site;

// Set up panic hook and logging for every extension context
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// Start the background coordinator (service worker context)
#[wasm_bindgen]
pub fn start_background() {
    background::run();
}

// Content script entry points, one per supported site
#[wasm_bindgen]
pub fn start_linkedin() {
    content::run(Site::LinkedIn);
}

#[wasm_bindgen]
pub fn start_youtube() {
    content::run(Site::YouTube);
}
