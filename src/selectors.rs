/// Selector strategy tables for each hideable region. Strategies are tried
/// in order and the first one matching at least one element wins; lists are
/// never merged across strategies.
use crate::config::Feature;

pub struct SelectorStrategy {
    pub selector: &'static str,
    /// How many ancestor levels to walk up from a matched node before
    /// hiding. LinkedIn's news module is matched by an inner marker node.
    pub ancestor_levels: usize,
}

const fn strategy(selector: &'static str) -> SelectorStrategy {
    SelectorStrategy {
        selector,
        ancestor_levels: 0,
    }
}

const LINKEDIN_FEED: &[SelectorStrategy] = &[
    strategy("[data-testid=\"mainFeed\"]"),
    SelectorStrategy {
        selector: "[data-view-name=\"news-module\"]",
        ancestor_levels: 4,
    },
    strategy("[data-test-id=\"feed-container\"]"),
    strategy("[data-test-id=\"main-feed\"]"),
    strategy("[data-test-id=\"feed\"]"),
    strategy("[data-id=\"feed-container\"]"),
    strategy(".scaffold-finite-scroll"),
];

const LINKEDIN_ASIDE: &[SelectorStrategy] = &[
    strategy("aside.scaffold-layout__aside[aria-label=\"LinkedIn News\"]"),
    SelectorStrategy {
        selector: "[data-view-name=\"news-module\"]",
        ancestor_levels: 4,
    },
];

const YOUTUBE_HOME_FEED: &[SelectorStrategy] = &[
    strategy("#contents.ytd-rich-grid-renderer"),
    strategy("ytd-rich-grid-renderer"),
    strategy("#page-manager ytd-rich-grid-renderer"),
    strategy("#contents"),
    strategy("[id=\"contents\"]"),
];

const YOUTUBE_RIGHT_PANEL: &[SelectorStrategy] = &[
    strategy("#secondary.ytd-watch-flexy"),
    strategy("ytd-watch-flexy #secondary"),
    strategy("#secondary"),
    strategy("#secondary-inner"),
    strategy("ytd-watch-next-secondary-results-renderer"),
    strategy("ytd-related-chips-renderer"),
    strategy("#related"),
];

pub fn strategies(feature: Feature) -> &'static [SelectorStrategy] {
    match feature {
        Feature::LinkedInFeed => LINKEDIN_FEED,
        Feature::LinkedInAside => LINKEDIN_ASIDE,
        Feature::YouTubeHomeFeed => YOUTUBE_HOME_FEED,
        Feature::YouTubeRightPanel => YOUTUBE_RIGHT_PANEL,
    }
}

/// Whether hiding this feature also injects a stylesheet rule. The LinkedIn
/// feed re-asserts inline styles during client-side rendering, so inline
/// hiding alone does not stick there.
pub fn uses_hide_style(feature: Feature) -> bool {
    matches!(feature, Feature::LinkedInFeed)
}

/// Element id of the injected stylesheet for a feature.
pub fn style_element_id(feature: Feature) -> &'static str {
    match feature {
        Feature::LinkedInFeed => "hushfeed-linkedin-feed-style",
        Feature::LinkedInAside => "hushfeed-linkedin-aside-style",
        Feature::YouTubeHomeFeed => "hushfeed-youtube-homefeed-style",
        Feature::YouTubeRightPanel => "hushfeed-youtube-rightpanel-style",
    }
}

/// CSS text of the injected hide rule, covering the feature's full selector
/// list so the rule survives whichever variant the host renders next.
pub fn hide_rule(feature: Feature) -> String {
    let selectors: Vec<&str> = strategies(feature).iter().map(|s| s.selector).collect();
    format!(
        "{} {{ display: none !important; visibility: hidden !important; opacity: 0 !important; }}",
        selectors.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_feature_has_strategies() {
        for feature in [
            Feature::LinkedInFeed,
            Feature::LinkedInAside,
            Feature::YouTubeHomeFeed,
            Feature::YouTubeRightPanel,
        ] {
            assert!(!strategies(feature).is_empty());
        }
    }

    #[test]
    fn test_linkedin_news_module_walks_ancestors() {
        let walk: Vec<usize> = LINKEDIN_FEED
            .iter()
            .filter(|s| s.selector.contains("news-module"))
            .map(|s| s.ancestor_levels)
            .collect();
        assert_eq!(walk, vec![4]);

        // All other strategies hide the matched node itself.
        assert!(
            LINKEDIN_FEED
                .iter()
                .filter(|s| !s.selector.contains("news-module"))
                .all(|s| s.ancestor_levels == 0)
        );
    }

    #[test]
    fn test_specific_selectors_come_first() {
        // The broad `#contents` catch-all must not shadow the rich-grid
        // selector, so it has to come later in priority order.
        let broad = YOUTUBE_HOME_FEED
            .iter()
            .position(|s| s.selector == "#contents")
            .unwrap();
        let specific = YOUTUBE_HOME_FEED
            .iter()
            .position(|s| s.selector == "#contents.ytd-rich-grid-renderer")
            .unwrap();
        assert!(specific < broad);
    }

    #[test]
    fn test_hide_rule_forces_display_none() {
        let rule = hide_rule(Feature::LinkedInFeed);
        assert!(rule.contains("display: none !important"));
        assert!(rule.contains(".scaffold-finite-scroll"));
        assert!(rule.contains("[data-testid=\"mainFeed\"]"));
    }

    #[test]
    fn test_style_ids_are_distinct() {
        let ids = [
            style_element_id(Feature::LinkedInFeed),
            style_element_id(Feature::LinkedInAside),
            style_element_id(Feature::YouTubeHomeFeed),
            style_element_id(Feature::YouTubeRightPanel),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_only_linkedin_feed_uses_stylesheet_hiding() {
        assert!(uses_hide_style(Feature::LinkedInFeed));
        assert!(!uses_hide_style(Feature::LinkedInAside));
        assert!(!uses_hide_style(Feature::YouTubeHomeFeed));
        assert!(!uses_hide_style(Feature::YouTubeRightPanel));
    }
}
