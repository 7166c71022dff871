//! Themes: named bundles of templates, default pages, and base config.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::card::{CardConfig, CardTemplate, TemplateContext};
use crate::config::{merge_config_layers, to_label};
use crate::error::{SiteError, SiteResult};

/// Templates a theme falls back to when a card names none.
#[derive(Debug, Clone)]
pub struct TemplateDefaults {
    /// Wrapper template for pages.
    pub page: String,
    /// Wrapper template for checkout/transaction views.
    pub transaction: String,
}

impl Default for TemplateDefaults {
    fn default() -> Self {
        Self {
            page: "wrap".to_string(),
            transaction: "wrap".to_string(),
        }
    }
}

/// Assembled theme configuration for one site.
#[derive(Debug, Clone, Default)]
pub struct ThemeConfig {
    /// Theme-level config underlying every card on the site.
    pub user_config: Value,
    /// Default pages instantiated when a site loads with theme pages.
    pub pages: Vec<CardConfig>,
    /// Shared sections (headers, footers) keyed by section id.
    pub sections: BTreeMap<String, CardConfig>,
}

/// Hook assembling per-site theme configuration.
pub type ThemeConfigHook = Arc<dyn Fn(&TemplateContext) -> ThemeConfig + Send + Sync>;

/// A named bundle of card templates, default pages, and base config.
#[derive(Clone)]
pub struct Theme {
    pub theme_id: String,
    pub title: String,
    pub description: Option<String>,
    pub screenshot: Option<String>,
    pub version: String,
    pub is_public: bool,
    pub templates: Vec<CardTemplate>,
    pub template_defaults: TemplateDefaults,
    /// Static base config merged beneath the config hook's output.
    pub user_config: Value,
    get_config: Option<ThemeConfigHook>,
}

impl Theme {
    pub fn new(theme_id: impl Into<String>) -> Self {
        let theme_id = theme_id.into();
        Self {
            title: to_label(&theme_id),
            theme_id,
            description: None,
            screenshot: None,
            version: "1.0.0".to_string(),
            is_public: false,
            templates: Vec::new(),
            template_defaults: TemplateDefaults::default(),
            user_config: Value::Object(Map::new()),
            get_config: None,
        }
    }

    /// Builder: Set title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder: Set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder: Set the template list.
    pub fn with_templates(mut self, templates: Vec<CardTemplate>) -> Self {
        self.templates = templates;
        self
    }

    /// Builder: Set template defaults.
    pub fn with_template_defaults(mut self, defaults: TemplateDefaults) -> Self {
        self.template_defaults = defaults;
        self
    }

    /// Builder: Set static base config.
    pub fn with_user_config(mut self, user_config: Value) -> Self {
        self.user_config = user_config;
        self
    }

    /// Builder: Install the config hook.
    pub fn on_get_config(
        mut self,
        hook: impl Fn(&TemplateContext) -> ThemeConfig + Send + Sync + 'static,
    ) -> Self {
        self.get_config = Some(Arc::new(hook));
        self
    }

    /// Builder: Mark theme public.
    pub fn as_public(mut self) -> Self {
        self.is_public = true;
        self
    }

    /// Config every theme starts from: typography and color-scheme defaults.
    pub fn default_config() -> Value {
        json!({
            "styling": {
                "fonts": {
                    "title": { "fontKey": "Poppins", "stack": "sans" },
                    "body": { "stack": "serif" },
                    "sans": { "stack": "sans" },
                },
                "prefersColorScheme": "light",
            },
        })
    }

    /// Resolves the theme configuration for a site.
    ///
    /// Config layers: engine defaults, the theme's static base config, then
    /// the config hook's output. Pages without a template fall back to the
    /// theme's page default.
    pub fn get_theme_config(&self, ctx: &TemplateContext) -> ThemeConfig {
        let hook_config = match &self.get_config {
            Some(hook) => hook(ctx),
            None => ThemeConfig::default(),
        };

        let defaults = Self::default_config();
        let user_config =
            merge_config_layers(&[&defaults, &self.user_config, &hook_config.user_config]);

        let pages = hook_config
            .pages
            .into_iter()
            .map(|mut page| {
                if page.template_id.is_none() {
                    page.template_id = Some(self.template_defaults.page.clone());
                }
                page
            })
            .collect();

        ThemeConfig {
            user_config,
            pages,
            sections: hook_config.sections,
        }
    }
}

impl fmt::Debug for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Theme")
            .field("theme_id", &self.theme_id)
            .field("title", &self.title)
            .field("templates", &self.templates.len())
            .finish_non_exhaustive()
    }
}

/// Lookup of available themes by id.
#[derive(Debug, Clone, Default)]
pub struct ThemeRegistry {
    themes: Vec<Theme>,
}

impl ThemeRegistry {
    pub fn new(themes: Vec<Theme>) -> Self {
        Self { themes }
    }

    pub fn register(&mut self, theme: Theme) {
        self.themes.push(theme);
    }

    /// Finds a theme by id; a missing theme is a hard error at site load.
    pub fn get(&self, theme_id: &str) -> SiteResult<&Theme> {
        self.themes
            .iter()
            .find(|t| t.theme_id == theme_id)
            .ok_or_else(|| SiteError::theme_not_found(theme_id))
    }

    pub fn themes(&self) -> &[Theme] {
        &self.themes
    }
}
