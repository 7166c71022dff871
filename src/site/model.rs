//! Portable site records and editor session state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::card::CardConfig;

/// Render/edit context a site is loaded in.
///
/// Transitions are externally driven; the site never changes its own mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SiteMode {
    /// Published render, no edit machinery.
    #[default]
    Standard,
    /// Live visual editor, embedded frame.
    Editable,
    /// Outer editor frame, authoritative for edits.
    Designer,
    /// Code-first editing session.
    Coding,
}

impl SiteMode {
    /// Whether edits are permitted and echoed to the paired frame.
    pub fn is_editable(self) -> bool {
        !matches!(self, Self::Standard)
    }

    /// Whether this frame owns persistence (autosave, draft writes).
    pub fn is_designer(self) -> bool {
        matches!(self, Self::Designer)
    }
}

/// Ephemeral editor session state nested in a site.
///
/// Only the `saved*` keys survive persistence; the rest is per-session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorState {
    pub selected_card_id: Option<String>,
    pub selected_page_id: Option<String>,
    pub selected_region_id: Option<String>,
    pub is_dirty: bool,
    pub temp_page: Value,
    pub temp_site: Value,
    pub saved_card_order: BTreeMap<String, Vec<String>>,
    pub saved_editing_style: Option<String>,
    pub saved_prefers_color_scheme: Option<String>,
}

impl EditorState {
    /// The subset of editor state worth persisting: `saved*` keys only.
    pub fn stored(&self) -> Value {
        let full = serde_json::to_value(self).unwrap_or(Value::Null);
        let mut stored = Map::new();
        if let Value::Object(map) = full {
            for (key, value) in map {
                if key.starts_with("saved") {
                    stored.insert(key, value);
                }
            }
        }
        Value::Object(stored)
    }
}

/// Portable site record, doubling as a partial patch for [`crate::site::Site::update`].
///
/// Absent fields mean "leave unchanged" when applied as a patch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<EditorState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<CardConfig>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<BTreeMap<String, CardConfig>>,
}

impl SiteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Set site id.
    pub fn with_site_id(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }

    /// Builder: Set theme id.
    pub fn with_theme_id(mut self, theme_id: impl Into<String>) -> Self {
        self.theme_id = Some(theme_id.into());
        self
    }

    /// Builder: Set title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Builder: Set site-wide user config.
    pub fn with_user_config(mut self, user_config: Value) -> Self {
        self.user_config = Some(user_config);
        self
    }

    /// Builder: Set page configs.
    pub fn with_pages(mut self, pages: Vec<CardConfig>) -> Self {
        self.pages = Some(pages);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_flags() {
        assert!(!SiteMode::Standard.is_editable());
        assert!(SiteMode::Editable.is_editable());
        assert!(SiteMode::Designer.is_editable());
        assert!(SiteMode::Designer.is_designer());
        assert!(!SiteMode::Editable.is_designer());
    }

    #[test]
    fn test_editor_stored_keeps_only_saved_keys() {
        let editor = EditorState {
            selected_card_id: Some("crd_1".into()),
            is_dirty: true,
            saved_editing_style: Some("quick".into()),
            saved_prefers_color_scheme: Some("dark".into()),
            ..Default::default()
        };

        let stored = editor.stored();
        let map = stored.as_object().unwrap();
        assert!(map.keys().all(|k| k.starts_with("saved")));
        assert_eq!(stored["savedEditingStyle"], json!("quick"));
        assert_eq!(stored["savedPrefersColorScheme"], json!("dark"));
        assert!(stored.get("selectedCardId").is_none());
        assert!(stored.get("isDirty").is_none());
    }

    #[test]
    fn test_site_config_serde_camel_case() {
        let config = SiteConfig::new()
            .with_site_id("ste_1")
            .with_theme_id("minimal");
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["siteId"], json!("ste_1"));
        assert_eq!(value["themeId"], json!("minimal"));
        assert!(value.get("pages").is_none());
    }
}
