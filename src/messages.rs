/// The cross-context message contract. Every payload that crosses the
/// runtime messaging channel is a variant here; a payload whose `action`
/// tag is unknown fails to parse and is ignored by listeners.
use serde::{Deserialize, Serialize};

use crate::config::{Feature, SiteConfigPayload};
use crate::settings::SettingsMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Message {
    /// Popup asking the background which site the active tab is on.
    #[serde(rename = "getCurrentWebsite")]
    GetCurrentWebsite,

    /// Popup asking the background for one site's stored flags.
    #[serde(rename = "getWebsiteSettings")]
    GetWebsiteSettings { website: String },

    /// Popup writing flags through the background.
    #[serde(rename = "updateWebsiteSettings")]
    UpdateWebsiteSettings {
        website: String,
        settings: SettingsMap,
    },

    /// Background pushing fresh flags to the active tab's content script.
    #[serde(rename = "updateSettings")]
    UpdateSettings { settings: SettingsMap },

    /// Direct visibility toggles, applied without a storage read.
    #[serde(rename = "linkedin_toggleFeed")]
    LinkedInToggleFeed { value: bool },
    #[serde(rename = "linkedin_toggleAside")]
    LinkedInToggleAside { value: bool },
    #[serde(rename = "youtube_toggleFeed")]
    YouTubeToggleFeed { value: bool },
    #[serde(rename = "youtube_toggleRightPanel")]
    YouTubeToggleRightPanel { value: bool },

    /// Content script asking the background to reload its tab.
    #[serde(rename = "requestReload")]
    RequestReload,
}

impl Message {
    /// For direct toggle messages, the feature addressed and the requested
    /// visibility. `None` for every other variant.
    pub fn toggle_target(&self) -> Option<(Feature, bool)> {
        match *self {
            Message::LinkedInToggleFeed { value } => Some((Feature::LinkedInFeed, value)),
            Message::LinkedInToggleAside { value } => Some((Feature::LinkedInAside, value)),
            Message::YouTubeToggleFeed { value } => Some((Feature::YouTubeHomeFeed, value)),
            Message::YouTubeToggleRightPanel { value } => {
                Some((Feature::YouTubeRightPanel, value))
            }
            _ => None,
        }
    }
}

/// Response to `getCurrentWebsite`. Both fields are null when the active
/// tab is missing or unsupported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWebsiteResponse {
    pub website: Option<String>,
    pub config: Option<SiteConfigPayload>,
}

impl CurrentWebsiteResponse {
    pub fn unsupported() -> Self {
        CurrentWebsiteResponse {
            website: None,
            config: None,
        }
    }
}

/// Response to `updateWebsiteSettings` and to content-side toggle handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateAck {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Site;

    #[test]
    fn test_action_tags_on_the_wire() {
        let json = serde_json::to_string(&Message::GetCurrentWebsite).unwrap();
        assert_eq!(json, r#"{"action":"getCurrentWebsite"}"#);

        let json = serde_json::to_string(&Message::LinkedInToggleFeed { value: true }).unwrap();
        assert_eq!(json, r#"{"action":"linkedin_toggleFeed","value":true}"#);

        let json = serde_json::to_string(&Message::RequestReload).unwrap();
        assert_eq!(json, r#"{"action":"requestReload"}"#);
    }

    #[test]
    fn test_parse_update_settings() {
        let json = r#"{"action":"updateSettings","settings":{"youtube_showFeed":true}}"#;
        let message: Message = serde_json::from_str(json).unwrap();

        match message {
            Message::UpdateSettings { settings } => {
                assert!(settings.is_visible("youtube_showFeed"));
                assert!(!settings.is_visible("youtube_showRightPanel"));
            }
            other => panic!("parsed wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_parse_update_website_settings() {
        let json = r#"{"action":"updateWebsiteSettings","website":"linkedin.com","settings":{"linkedin_showFeed":false,"linkedin_showAside":false}}"#;
        let message: Message = serde_json::from_str(json).unwrap();

        match message {
            Message::UpdateWebsiteSettings { website, settings } => {
                assert_eq!(website, "linkedin.com");
                assert_eq!(settings.len(), 2);
            }
            other => panic!("parsed wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let json = r#"{"action":"togleFeed","value":true}"#;
        assert!(serde_json::from_str::<Message>(json).is_err());

        let json = r#"{"value":true}"#;
        assert!(serde_json::from_str::<Message>(json).is_err());
    }

    #[test]
    fn test_toggle_target() {
        assert_eq!(
            Message::YouTubeToggleRightPanel { value: false }.toggle_target(),
            Some((Feature::YouTubeRightPanel, false))
        );
        assert_eq!(
            Message::LinkedInToggleAside { value: true }.toggle_target(),
            Some((Feature::LinkedInAside, true))
        );
        assert_eq!(Message::GetCurrentWebsite.toggle_target(), None);
        assert_eq!(Message::RequestReload.toggle_target(), None);
    }

    #[test]
    fn test_current_website_response_nulls() {
        let json = serde_json::to_string(&CurrentWebsiteResponse::unsupported()).unwrap();
        assert_eq!(json, r#"{"website":null,"config":null}"#);
    }

    #[test]
    fn test_current_website_response_round_trip() {
        let response = CurrentWebsiteResponse {
            website: Some(Site::YouTube.id().to_string()),
            config: Some(SiteConfigPayload::from(Site::YouTube)),
        };

        let json = serde_json::to_string(&response).unwrap();
        let back: CurrentWebsiteResponse = serde_json::from_str(&json).unwrap();

        assert_eq!(back, response);
        assert_eq!(
            back.config.unwrap().settings,
            vec!["youtube_showFeed", "youtube_showRightPanel"]
        );
    }

    #[test]
    fn test_update_ack() {
        let json = serde_json::to_string(&UpdateAck { success: true }).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }
}
