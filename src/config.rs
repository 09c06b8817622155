/// Static site configuration: which websites are supported, which regions of
/// them can be hidden, and how a tab URL maps back to a site.
use serde::{Deserialize, Serialize};
use url::Url;

/// A website the extension knows how to quiet down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    LinkedIn,
    YouTube,
}

/// A hideable region on one of the supported sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    LinkedInFeed,
    LinkedInAside,
    YouTubeHomeFeed,
    YouTubeRightPanel,
}

/// Per-site behavior, fixed at compile time.
pub struct SiteConfig {
    pub site: Site,
    /// Hostname fragment that identifies the site (substring containment).
    pub fragment: &'static str,
    pub features: &'static [Feature],
    /// Steady poll cadence for the watch loops on this site.
    pub poll_interval_ms: u32,
    /// Whether the one-time reload fallback is armed for this site.
    pub reload_fallback: bool,
}

/// Order matters: the first fragment contained in a hostname wins.
pub const SITE_CONFIGS: &[SiteConfig] = &[
    SiteConfig {
        site: Site::LinkedIn,
        fragment: "linkedin.com",
        features: &[Feature::LinkedInFeed, Feature::LinkedInAside],
        poll_interval_ms: 1_500,
        reload_fallback: true,
    },
    SiteConfig {
        site: Site::YouTube,
        fragment: "youtube.com",
        features: &[Feature::YouTubeHomeFeed, Feature::YouTubeRightPanel],
        poll_interval_ms: 2_000,
        reload_fallback: false,
    },
];

impl Site {
    pub fn config(self) -> &'static SiteConfig {
        SITE_CONFIGS
            .iter()
            .find(|config| config.site == self)
            .expect("every site has a config entry")
    }

    /// Stable identifier used in messages and storage key prefixes.
    pub fn id(self) -> &'static str {
        self.config().fragment
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Site::LinkedIn => "LinkedIn",
            Site::YouTube => "YouTube",
        }
    }

    pub fn features(self) -> &'static [Feature] {
        self.config().features
    }

    pub fn setting_keys(self) -> Vec<&'static str> {
        self.features().iter().map(|f| f.settings_key()).collect()
    }
}

impl Feature {
    pub fn site(self) -> Site {
        match self {
            Feature::LinkedInFeed | Feature::LinkedInAside => Site::LinkedIn,
            Feature::YouTubeHomeFeed | Feature::YouTubeRightPanel => Site::YouTube,
        }
    }

    /// Key under which this feature's visibility is persisted.
    pub fn settings_key(self) -> &'static str {
        match self {
            Feature::LinkedInFeed => "linkedin_showFeed",
            Feature::LinkedInAside => "linkedin_showAside",
            Feature::YouTubeHomeFeed => "youtube_showFeed",
            Feature::YouTubeRightPanel => "youtube_showRightPanel",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Feature::LinkedInFeed => "Show Feed",
            Feature::LinkedInAside => "Show News Sidebar",
            Feature::YouTubeHomeFeed => "Show Home Feed",
            Feature::YouTubeRightPanel => "Show Video Suggestions",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Feature::LinkedInFeed => "Toggle the main LinkedIn feed visibility",
            Feature::LinkedInAside => "Toggle the LinkedIn news sidebar visibility",
            Feature::YouTubeHomeFeed => "Toggle the YouTube home page feed",
            Feature::YouTubeRightPanel => "Toggle suggested videos next to the player",
        }
    }

    /// The watch-page panel is re-laid-out on window resize, so its loop
    /// re-checks after resizes settle.
    pub fn resize_recheck(self) -> bool {
        matches!(self, Feature::YouTubeRightPanel)
    }
}

/// Resolve a full tab URL to a supported site, if any.
pub fn website_from_url(url: &str) -> Option<Site> {
    let parsed = Url::parse(url).ok()?;
    website_from_hostname(parsed.host_str()?)
}

/// Match a hostname against the configured fragments, first match wins.
pub fn website_from_hostname(hostname: &str) -> Option<Site> {
    SITE_CONFIGS
        .iter()
        .find(|config| hostname.contains(config.fragment))
        .map(|config| config.site)
}

/// Look up a site by the identifier carried in messages.
pub fn site_from_id(id: &str) -> Option<Site> {
    SITE_CONFIGS
        .iter()
        .find(|config| config.fragment == id)
        .map(|config| config.site)
}

/// Every persisted key across all sites, for install-time seeding.
pub fn all_setting_keys() -> Vec<&'static str> {
    SITE_CONFIGS
        .iter()
        .flat_map(|config| config.features.iter().map(|f| f.settings_key()))
        .collect()
}

/// Shape of the `config` field in the `getCurrentWebsite` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfigPayload {
    pub settings: Vec<String>,
}

impl From<Site> for SiteConfigPayload {
    fn from(site: Site) -> Self {
        SiteConfigPayload {
            settings: site.setting_keys().iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_website_from_url() {
        assert_eq!(
            website_from_url("https://www.linkedin.com/feed/"),
            Some(Site::LinkedIn)
        );
        assert_eq!(
            website_from_url("https://www.youtube.com/watch?v=abc"),
            Some(Site::YouTube)
        );
        assert_eq!(website_from_url("https://example.com/"), None);
    }

    #[test]
    fn test_website_from_url_subdomains() {
        assert_eq!(
            website_from_url("https://m.youtube.com/"),
            Some(Site::YouTube)
        );
        assert_eq!(
            website_from_url("https://de.linkedin.com/feed"),
            Some(Site::LinkedIn)
        );
    }

    #[test]
    fn test_website_from_url_invalid() {
        assert_eq!(website_from_url(""), None);
        assert_eq!(website_from_url("not a url"), None);
        assert_eq!(website_from_url("chrome://extensions"), None);
    }

    #[test]
    fn test_site_from_id_round_trip() {
        for config in SITE_CONFIGS {
            assert_eq!(site_from_id(config.site.id()), Some(config.site));
        }
        assert_eq!(site_from_id("facebook.com"), None);
    }

    #[test]
    fn test_setting_keys() {
        assert_eq!(
            Site::LinkedIn.setting_keys(),
            vec!["linkedin_showFeed", "linkedin_showAside"]
        );
        assert_eq!(
            Site::YouTube.setting_keys(),
            vec!["youtube_showFeed", "youtube_showRightPanel"]
        );
    }

    #[test]
    fn test_all_setting_keys_covers_every_feature() {
        let keys = all_setting_keys();
        assert_eq!(keys.len(), 4);
        assert!(keys.contains(&"linkedin_showFeed"));
        assert!(keys.contains(&"youtube_showRightPanel"));
    }

    #[test]
    fn test_config_payload() {
        let payload = SiteConfigPayload::from(Site::YouTube);
        assert_eq!(
            payload.settings,
            vec!["youtube_showFeed", "youtube_showRightPanel"]
        );
    }
}
