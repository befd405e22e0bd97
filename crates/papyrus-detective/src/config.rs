//! Plugin settings, read from the `[detective]` table of the site config.

use serde::Deserialize;

/// Environment variable that force-enables the toolbar.
pub const ENABLED_ENV: &str = "PAPYRUS_DETECTIVE";

/// Debug toolbar settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DetectiveConfig {
    /// Whether to attach the debug toolbar to rendered pages
    pub enabled: bool,

    /// The toolbar HTML is inserted before the first occurrence of this string
    pub insert_before: String,
}

impl Default for DetectiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            insert_before: "</body>".to_string(),
        }
    }
}

impl DetectiveConfig {
    /// Apply the [`ENABLED_ENV`] override given the variable's value.
    pub fn with_env_override(mut self, value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("1" | "true" | "yes" | "on") => self.enabled = true,
            Some("0" | "false" | "no" | "off") => self.enabled = false,
            _ => {}
        }
        self
    }
}
