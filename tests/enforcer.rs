//! DOM-level checks for the visibility enforcer, run in a browser via
//! `wasm-pack test`.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{Document, HtmlElement};

use hushfeed::config::Feature;
use hushfeed::enforcer;
use hushfeed::selectors;

wasm_bindgen_test_configure!(run_in_browser);

const ALL_FEATURES: [Feature; 4] = [
    Feature::LinkedInFeed,
    Feature::LinkedInAside,
    Feature::YouTubeHomeFeed,
    Feature::YouTubeRightPanel,
];

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

/// Replace the body content and clear any leftover hide stylesheets.
fn install_fixture(html: &str) -> Document {
    let document = document();
    document.body().unwrap().set_inner_html(html);
    for feature in ALL_FEATURES {
        enforcer::remove_hide_style(&document, feature);
    }
    document
}

fn display_of(document: &Document, selector: &str) -> String {
    let element = document.query_selector(selector).unwrap().unwrap();
    element
        .dyn_into::<HtmlElement>()
        .unwrap()
        .style()
        .get_property_value("display")
        .unwrap()
}

#[wasm_bindgen_test]
fn hiding_twice_matches_hiding_once() {
    let document = install_fixture(r#"<div class="scaffold-finite-scroll">feed</div>"#);

    enforcer::apply(&document, Feature::LinkedInFeed, false);
    enforcer::apply(&document, Feature::LinkedInFeed, false);

    assert_eq!(display_of(&document, ".scaffold-finite-scroll"), "none");
    // The injected stylesheet exists exactly once.
    let style_id = selectors::style_element_id(Feature::LinkedInFeed);
    assert!(document.get_element_by_id(style_id).is_some());
    let styles = document
        .query_selector_all(&format!("#{style_id}"))
        .unwrap();
    assert_eq!(styles.length(), 1);
}

#[wasm_bindgen_test]
fn showing_removes_inline_and_stylesheet() {
    let document = install_fixture(r#"<div class="scaffold-finite-scroll">feed</div>"#);

    enforcer::apply(&document, Feature::LinkedInFeed, false);
    enforcer::apply(&document, Feature::LinkedInFeed, true);
    enforcer::apply(&document, Feature::LinkedInFeed, true);

    assert_eq!(display_of(&document, ".scaffold-finite-scroll"), "");
    let style_id = selectors::style_element_id(Feature::LinkedInFeed);
    assert!(document.get_element_by_id(style_id).is_none());
}

#[wasm_bindgen_test]
fn empty_target_list_is_a_no_op() {
    let document = install_fixture("<p>nothing to hide here</p>");

    for feature in ALL_FEATURES {
        enforcer::apply(&document, feature, false);
        enforcer::apply(&document, feature, true);
    }

    assert!(enforcer::resolve_targets(&document, Feature::YouTubeHomeFeed).is_empty());
}

#[wasm_bindgen_test]
fn first_matching_strategy_wins() {
    let document = install_fixture(
        r#"<div data-testid="mainFeed">a</div><div class="scaffold-finite-scroll">b</div>"#,
    );

    let targets = enforcer::resolve_targets(&document, Feature::LinkedInFeed);

    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].get_attribute("data-testid").as_deref(), Some("mainFeed"));

    // The lower-priority match is untouched by apply.
    enforcer::apply(&document, Feature::LinkedInFeed, false);
    assert_eq!(display_of(&document, "[data-testid=\"mainFeed\"]"), "none");
    assert_eq!(display_of(&document, ".scaffold-finite-scroll"), "");
}

#[wasm_bindgen_test]
fn news_module_strategy_walks_four_ancestors() {
    let document = install_fixture(
        r#"<div id="outer"><div><div><div><div data-view-name="news-module">news</div></div></div></div></div>"#,
    );

    let targets = enforcer::resolve_targets(&document, Feature::LinkedInAside);

    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].id(), "outer");
}

#[wasm_bindgen_test]
fn multi_element_strategies_hide_every_match() {
    let document = install_fixture(
        r#"<ytd-rich-grid-renderer id="contents">x</ytd-rich-grid-renderer>
           <ytd-rich-grid-renderer>y</ytd-rich-grid-renderer>"#,
    );

    enforcer::apply(&document, Feature::YouTubeHomeFeed, false);

    let list = document.query_selector_all("ytd-rich-grid-renderer").unwrap();
    assert_eq!(list.length(), 2);
    for index in 0..list.length() {
        let element: HtmlElement = list.item(index).unwrap().dyn_into().unwrap();
        assert_eq!(element.style().get_property_value("display").unwrap(), "none");
    }
}
