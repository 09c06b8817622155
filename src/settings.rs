/// Persisted visibility settings: a flat string-keyed boolean mapping stored
/// in the shared `chrome.storage.sync` namespace.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A set of visibility flags. An absent key means "not yet decided", which
/// the whole system treats as hidden.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsMap(pub HashMap<String, bool>);

impl SettingsMap {
    pub fn new() -> Self {
        SettingsMap(HashMap::new())
    }

    /// Visibility for a key, with the hidden default applied.
    pub fn is_visible(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    /// Raw lookup without the default, for callers that need to distinguish
    /// "explicitly hidden" from "never set".
    pub fn get(&self, key: &str) -> Option<bool> {
        self.0.get(key).copied()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: bool) {
        self.0.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Copy containing only the given keys. Used by the background
    /// coordinator so a site never sees another site's flags.
    pub fn filtered(&self, keys: &[&str]) -> SettingsMap {
        SettingsMap(
            self.0
                .iter()
                .filter(|(k, _)| keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        )
    }

    /// The install-time seed: `false` for every key missing from `existing`.
    /// Keys that already have a value are left alone.
    pub fn missing_defaults(existing: &SettingsMap, keys: &[&str]) -> SettingsMap {
        let mut defaults = SettingsMap::new();
        for key in keys {
            if existing.get(key).is_none() {
                defaults.insert(*key, false);
            }
        }
        defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_key_defaults_to_hidden() {
        let settings = SettingsMap::new();
        assert!(!settings.is_visible("linkedin_showFeed"));
        assert_eq!(settings.get("linkedin_showFeed"), None);
    }

    #[test]
    fn test_explicit_values_win() {
        let mut settings = SettingsMap::new();
        settings.insert("linkedin_showFeed", true);
        settings.insert("linkedin_showAside", false);

        assert!(settings.is_visible("linkedin_showFeed"));
        assert!(!settings.is_visible("linkedin_showAside"));
        assert_eq!(settings.get("linkedin_showAside"), Some(false));
    }

    #[test]
    fn test_filtered_drops_foreign_keys() {
        let mut settings = SettingsMap::new();
        settings.insert("linkedin_showFeed", true);
        settings.insert("youtube_showFeed", true);

        let filtered = settings.filtered(&["linkedin_showFeed", "linkedin_showAside"]);

        assert_eq!(filtered.len(), 1);
        assert!(filtered.is_visible("linkedin_showFeed"));
        assert_eq!(filtered.get("youtube_showFeed"), None);
    }

    #[test]
    fn test_missing_defaults_never_overwrites() {
        let mut existing = SettingsMap::new();
        existing.insert("linkedin_showFeed", true);

        let seed = SettingsMap::missing_defaults(
            &existing,
            &["linkedin_showFeed", "linkedin_showAside", "youtube_showFeed"],
        );

        assert_eq!(seed.len(), 2);
        assert_eq!(seed.get("linkedin_showFeed"), None);
        assert_eq!(seed.get("linkedin_showAside"), Some(false));
        assert_eq!(seed.get("youtube_showFeed"), Some(false));
    }

    #[test]
    fn test_missing_defaults_empty_when_fully_seeded() {
        let mut existing = SettingsMap::new();
        existing.insert("a", false);
        existing.insert("b", true);

        let seed = SettingsMap::missing_defaults(&existing, &["a", "b"]);

        assert!(seed.is_empty());
    }

    #[test]
    fn test_serialization_is_flat() {
        let mut settings = SettingsMap::new();
        settings.insert("youtube_showFeed", true);

        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(json, r#"{"youtube_showFeed":true}"#);

        let back: SettingsMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
