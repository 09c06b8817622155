/// DOM visibility enforcement: resolve a feature's current target elements
/// and apply or remove the hidden presentation state.
///
/// Hiding uses two mechanisms. The inline override takes effect immediately
/// on the resolved elements; the injected stylesheet keeps matching whatever
/// the host renders next, for features whose pages re-assert inline styles.
use wasm_bindgen::JsCast;
use web_sys::{Document, Element};

use crate::config::Feature;
use crate::selectors;

pub fn document() -> Option<Document> {
    web_sys::window().and_then(|window| window.document())
}

/// Try each selector strategy in priority order and return the first
/// non-empty match set, with the per-strategy ancestor walk applied.
/// An empty result is normal while the host page is still rendering.
pub fn resolve_targets(document: &Document, feature: Feature) -> Vec<Element> {
    for strategy in selectors::strategies(feature) {
        let list = match document.query_selector_all(strategy.selector) {
            Ok(list) => list,
            Err(err) => {
                log::warn!("selector {:?} failed: {err:?}", strategy.selector);
                continue;
            }
        };
        if list.length() == 0 {
            continue;
        }

        let mut elements = Vec::new();
        for index in 0..list.length() {
            let Some(node) = list.item(index) else {
                continue;
            };
            let Ok(element) = node.dyn_into::<Element>() else {
                continue;
            };
            elements.push(
                ancestor(&element, strategy.ancestor_levels).unwrap_or(element),
            );
        }
        if !elements.is_empty() {
            return elements;
        }
    }
    Vec::new()
}

/// Walk up `levels` parents; `None` if the walk falls off the tree, in
/// which case the caller keeps the matched node itself.
fn ancestor(element: &Element, levels: usize) -> Option<Element> {
    let mut node = element.clone();
    for _ in 0..levels {
        node = node.parent_element()?;
    }
    Some(node)
}

/// Apply the desired visibility to whatever targets currently resolve.
/// Idempotent in both directions and a no-op when nothing matches.
pub fn apply(document: &Document, feature: Feature, visible: bool) {
    let targets = resolve_targets(document, feature);
    if visible {
        remove_hide_style(document, feature);
        set_display(&targets, true);
    } else {
        if selectors::uses_hide_style(feature) {
            ensure_hide_style(document, feature);
        }
        set_display(&targets, false);
    }
}

/// The initial enforcer's hammer: re-assert the stylesheet and the inline
/// hide without consulting storage.
pub fn force_hide(document: &Document, feature: Feature) {
    ensure_hide_style(document, feature);
    set_display(&resolve_targets(document, feature), false);
}

fn set_display(elements: &[Element], visible: bool) {
    for element in elements {
        let Some(html) = element.dyn_ref::<web_sys::HtmlElement>() else {
            continue;
        };
        let style = html.style();
        let result = if visible {
            style.remove_property("display").map(|_| ())
        } else {
            style.set_property("display", "none")
        };
        if let Err(err) = result {
            log::warn!("could not update display: {err:?}");
        }
    }
}

fn ensure_hide_style(document: &Document, feature: Feature) {
    let id = selectors::style_element_id(feature);
    if document.get_element_by_id(id).is_some() {
        return;
    }
    let style = match document.create_element("style") {
        Ok(style) => style,
        Err(err) => {
            log::warn!("could not create style element: {err:?}");
            return;
        }
    };
    style.set_id(id);
    style.set_text_content(Some(&selectors::hide_rule(feature)));
    // documentElement rather than head: the rule must attach even before
    // <head> exists during the initial parse.
    if let Some(root) = document.document_element() {
        if let Err(err) = root.append_child(&style) {
            log::warn!("could not attach hide stylesheet: {err:?}");
        }
    }
}

pub fn remove_hide_style(document: &Document, feature: Feature) {
    if let Some(style) = document.get_element_by_id(selectors::style_element_id(feature)) {
        style.remove();
    }
}
