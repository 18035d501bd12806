//! Menu configuration
//!
//! Every identifier, class name and timing the engine touches comes from
//! [`NavConfig`]. The defaults describe the admin sidebar markup:
//! `nav-{group}-toggle`, `nav-{group}-sub`, `nav-{group}-wrap` and
//! `nav-{group}-caret` for the employees, attendance and requests groups.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Submenu groups, in document order
    pub groups: Vec<GroupConfig>,
    /// Class names applied and inspected by the engine
    pub classes: ClassNames,
    /// Navigation link discovery and the injected active-link style
    pub links: LinkConfig,
    /// Open/close transition timings
    pub animation: AnimationConfig,
    /// Bootstrap retry policy
    pub retry: RetryConfig,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            groups: vec![
                GroupConfig::conventional("employees"),
                GroupConfig::conventional("attendance"),
                GroupConfig::conventional("requests"),
            ],
            classes: ClassNames::default(),
            links: LinkConfig::default(),
            animation: AnimationConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl NavConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> NavResult<Self> {
        let config: NavConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check group keys are unique and every required id is present
    pub fn validate(&self) -> NavResult<()> {
        if self.groups.is_empty() {
            return Err(NavError::InvalidConfig("at least one group is required".into()));
        }
        let mut seen = HashSet::new();
        for group in &self.groups {
            if group.key.is_empty() {
                return Err(NavError::InvalidConfig("group key must not be empty".into()));
            }
            if !seen.insert(group.key.as_str()) {
                return Err(NavError::InvalidConfig(format!(
                    "duplicate group key '{}'",
                    group.key
                )));
            }
            for (field, id) in [
                ("toggle_id", &group.toggle_id),
                ("panel_id", &group.panel_id),
                ("wrapper_id", &group.wrapper_id),
            ] {
                if id.is_empty() {
                    return Err(NavError::InvalidConfig(format!(
                        "group '{}' has an empty {}",
                        group.key, field
                    )));
                }
            }
        }
        if self.classes.hidden.is_empty() || self.classes.active_link.is_empty() {
            return Err(NavError::InvalidConfig("class names must not be empty".into()));
        }
        if self.retry.interval_ms == 0 {
            return Err(NavError::InvalidConfig("retry interval must be positive".into()));
        }
        Ok(())
    }

    /// Look up a group by key
    pub fn group(&self, key: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|g| g.key == key)
    }
}

/// Element ids of one submenu group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Stable key used for state lookup and log output
    pub key: String,
    pub toggle_id: String,
    pub panel_id: String,
    pub wrapper_id: String,
    /// Decorative caret; looked up but never animated
    #[serde(default)]
    pub indicator_id: Option<String>,
}

impl GroupConfig {
    /// Ids following the `nav-{key}-*` convention of the sidebar template
    pub fn conventional(key: &str) -> Self {
        Self {
            key: key.to_string(),
            toggle_id: format!("nav-{key}-toggle"),
            panel_id: format!("nav-{key}-sub"),
            wrapper_id: format!("nav-{key}-wrap"),
            indicator_id: Some(format!("nav-{key}-caret")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassNames {
    /// Removes a panel from layout
    pub hidden: String,
    /// Marks the link that represents the current location
    pub active_link: String,
    /// Marks the toggle whose panel holds the active link
    pub active_parent: String,
}

impl Default for ClassNames {
    fn default() -> Self {
        Self {
            hidden: "hidden".to_string(),
            active_link: "nav-active".to_string(),
            active_parent: "text-gray-300".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Selector of the container holding every navigation link
    pub scope: String,
    /// Id of the injected `<style>` element
    pub style_id: String,
    /// Text color of the active link
    pub active_color: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            scope: "aside nav".to_string(),
            style_id: "nav-active-style".to_string(),
            active_color: "rgba(219,234,254,0.9)".to_string(),
        }
    }
}

impl LinkConfig {
    /// Selector matching every navigation link
    pub fn link_selector(&self) -> String {
        format!("{} a[href]", self.scope)
    }

    /// Style rule coloring the active link
    pub fn active_rule(&self, active_class: &str) -> String {
        format!(
            "{} a.{}{{color:{} !important;}}",
            self.scope, active_class, self.active_color
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub height_ms: u32,
    pub opacity_ms: u32,
    pub easing: String,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            height_ms: 220,
            opacity_ms: 180,
            easing: "ease".to_string(),
        }
    }
}

impl AnimationConfig {
    /// Value of the inline `transition` property while animating
    pub fn transition_value(&self) -> String {
        format!(
            "max-height {}ms {}, opacity {}ms {}",
            self.height_ms, self.easing, self.opacity_ms, self.easing
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub interval_ms: u32,
    /// Interval ticks before giving up on missing elements
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_ms: 200,
            max_attempts: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_groups_follow_convention() {
        let config = NavConfig::default();
        let keys: Vec<_> = config.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, ["employees", "attendance", "requests"]);

        let emp = config.group("employees").unwrap();
        assert_eq!(emp.toggle_id, "nav-employees-toggle");
        assert_eq!(emp.panel_id, "nav-employees-sub");
        assert_eq!(emp.wrapper_id, "nav-employees-wrap");
        assert_eq!(emp.indicator_id.as_deref(), Some("nav-employees-caret"));
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = NavConfig::from_json(r#"{"retry": {"max_attempts": 3}}"#).unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.interval_ms, 200);
        assert_eq!(config.groups.len(), 3);
        assert_eq!(config.classes.hidden, "hidden");
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let json = r#"{"groups": [
            {"key": "a", "toggle_id": "t", "panel_id": "p", "wrapper_id": "w"},
            {"key": "a", "toggle_id": "t2", "panel_id": "p2", "wrapper_id": "w2"}
        ]}"#;
        assert!(matches!(
            NavConfig::from_json(json),
            Err(NavError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(NavConfig::from_json("{"), Err(NavError::Json(_))));
    }

    #[test]
    fn test_derived_strings() {
        let config = NavConfig::default();
        assert_eq!(config.links.link_selector(), "aside nav a[href]");
        assert_eq!(
            config.links.active_rule(&config.classes.active_link),
            "aside nav a.nav-active{color:rgba(219,234,254,0.9) !important;}"
        );
        assert_eq!(
            config.animation.transition_value(),
            "max-height 220ms ease, opacity 180ms ease"
        );
    }
}
