//! Card templates: registered, reusable definitions of card behavior.
//!
//! A template bundles a rendering component reference, a config schema,
//! default/generated config factories, and capability flags. Templates are
//! registered once at theme-load time and immutable thereafter; many cards
//! reference one template by id.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::card::model::{Card, CardConfig, CardContext};
use crate::config::{merge_config_layers, object_id, to_label};
use crate::error::{SiteError, SiteResult};

/// Scope handed to template hooks when assembling configuration.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Owning site id, when the template is resolved inside a site.
    pub site_id: Option<String>,
    /// The site's resolved full config (theme defaults + site overrides).
    pub site_config: Value,
}

/// Assembled template configuration returned by [`CardTemplate::get_config`].
#[derive(Debug, Clone, Default)]
pub struct TemplateConfig {
    /// JSON-schema describing the card's `user_config` shape.
    pub schema: Option<Value>,
    /// Input-option tree describing how a human edits the schema.
    pub options: Option<Value>,
    /// Default user config for new cards of this template.
    pub user_config: Value,
    /// Decorative companion cards attached on instantiation.
    pub effects: Vec<CardConfig>,
    /// Demo page shown in the template gallery.
    pub demo_page: Option<CardConfig>,
}

/// Hook producing the full [`TemplateConfig`]; wins verbatim when present.
pub type ConfigHook = Arc<dyn Fn(&TemplateContext) -> TemplateConfig + Send + Sync>;
/// Hook producing default user config.
pub type UserConfigHook = Arc<dyn Fn(&TemplateContext) -> Value + Send + Sync>;
/// Hook adjusting base config from what the user already set.
pub type BaseConfigHook = Arc<dyn Fn(&CardConfig) -> Value + Send + Sync>;
/// Hook producing effect card configs.
pub type EffectsHook = Arc<dyn Fn(&TemplateContext) -> Vec<CardConfig> + Send + Sync>;
/// Hook producing a demo page config.
pub type DemoPageHook = Arc<dyn Fn(&TemplateContext) -> CardConfig + Send + Sync>;
/// Hook fired once per template when a site finishes loading.
pub type SiteLoadHook = Arc<dyn Fn(&SiteLoadEvent) + Send + Sync>;
/// Template-scoped RPC handler: `(query_id, params) -> result`.
pub type QueryHook = Arc<dyn Fn(&str, Value) -> SiteResult<Value> + Send + Sync>;

/// Event passed to [`SiteLoadHook`]s (shortcode/side-effect registration).
#[derive(Debug, Clone)]
pub struct SiteLoadEvent {
    pub site_id: String,
    pub theme_id: String,
}

/// A registered, reusable definition of a card's behavior.
#[derive(Clone)]
pub struct CardTemplate {
    pub template_id: String,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub category: Vec<String>,
    /// Rendering component reference (resolved by the host app).
    pub component: Option<String>,

    pub is_public: bool,
    pub is_page_card: bool,
    pub is_container: bool,
    pub is_region: bool,
    pub is_effect: bool,

    /// Static JSON-schema for the card's user config.
    pub schema: Option<Value>,
    /// Static input-option tree.
    pub options: Option<Value>,
    /// Static default user config.
    pub user_config: Value,

    get_config: Option<ConfigHook>,
    get_base_config: Option<BaseConfigHook>,
    get_user_config: Option<UserConfigHook>,
    get_effects: Option<EffectsHook>,
    demo_page: Option<DemoPageHook>,
    pub on_site_load: Option<SiteLoadHook>,
    query: Option<QueryHook>,
}

impl CardTemplate {
    /// Creates a template with the given id; title defaults to its label.
    pub fn new(template_id: impl Into<String>) -> Self {
        let template_id = template_id.into();
        Self {
            title: to_label(&template_id),
            template_id,
            description: None,
            icon: None,
            category: Vec::new(),
            component: None,
            is_public: false,
            is_page_card: false,
            is_container: false,
            is_region: false,
            is_effect: false,
            schema: None,
            options: None,
            user_config: Value::Object(Map::new()),
            get_config: None,
            get_base_config: None,
            get_user_config: None,
            get_effects: None,
            demo_page: None,
            on_site_load: None,
            query: None,
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

    /// Builder: Set icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Builder: Set categories.
    pub fn with_category(mut self, category: Vec<String>) -> Self {
        self.category = category;
        self
    }

    /// Builder: Set the rendering component reference.
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Builder: Set the static config schema.
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Builder: Set the static input-option tree.
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    /// Builder: Set the static default user config.
    pub fn with_user_config(mut self, user_config: Value) -> Self {
        self.user_config = user_config;
        self
    }

    /// Builder: Mark the template public in the editor picker.
    pub fn as_public(mut self) -> Self {
        self.is_public = true;
        self
    }

    /// Builder: Mark as a full page wrap card.
    pub fn as_page_card(mut self) -> Self {
        self.is_page_card = true;
        self
    }

    /// Builder: Mark as a container (ui drawer).
    pub fn as_container(mut self) -> Self {
        self.is_container = true;
        self
    }

    /// Builder: Mark as a region root.
    pub fn as_region(mut self) -> Self {
        self.is_region = true;
        self
    }

    /// Builder: Mark as an effect card.
    pub fn as_effect(mut self) -> Self {
        self.is_effect = true;
        self
    }

    /// Builder: Install the full-config hook (wins verbatim over the others).
    pub fn on_get_config(
        mut self,
        hook: impl Fn(&TemplateContext) -> TemplateConfig + Send + Sync + 'static,
    ) -> Self {
        self.get_config = Some(Arc::new(hook));
        self
    }

    /// Builder: Install the base-config hook.
    pub fn on_base_config(
        mut self,
        hook: impl Fn(&CardConfig) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.get_base_config = Some(Arc::new(hook));
        self
    }

    /// Builder: Install the default user-config hook.
    pub fn on_user_config(
        mut self,
        hook: impl Fn(&TemplateContext) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.get_user_config = Some(Arc::new(hook));
        self
    }

    /// Builder: Install the effects hook.
    pub fn on_effects(
        mut self,
        hook: impl Fn(&TemplateContext) -> Vec<CardConfig> + Send + Sync + 'static,
    ) -> Self {
        self.get_effects = Some(Arc::new(hook));
        self
    }

    /// Builder: Install the demo-page hook.
    pub fn on_demo_page(
        mut self,
        hook: impl Fn(&TemplateContext) -> CardConfig + Send + Sync + 'static,
    ) -> Self {
        self.demo_page = Some(Arc::new(hook));
        self
    }

    /// Builder: Install the site-load hook.
    pub fn on_site_load(mut self, hook: impl Fn(&SiteLoadEvent) + Send + Sync + 'static) -> Self {
        self.on_site_load = Some(Arc::new(hook));
        self
    }

    /// Builder: Install the template-scoped query handler.
    pub fn on_query(
        mut self,
        hook: impl Fn(&str, Value) -> SiteResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.query = Some(Arc::new(hook));
        self
    }

    /// Base config for a card's settings; empty object without a hook.
    pub fn base_config(&self, settings: &CardConfig) -> Value {
        match &self.get_base_config {
            Some(hook) => hook(settings),
            None => Value::Object(Map::new()),
        }
    }

    /// Assembles the template configuration.
    ///
    /// A custom `get_config` hook is used verbatim; otherwise the individual
    /// hooks and static fields are assembled independently.
    pub fn get_config(&self, ctx: &TemplateContext) -> TemplateConfig {
        if let Some(hook) = &self.get_config {
            return hook(ctx);
        }
        TemplateConfig {
            schema: self.schema.clone(),
            options: self.options.clone(),
            user_config: self.user_config.clone(),
            effects: match &self.get_effects {
                Some(hook) => hook(ctx),
                None => Vec::new(),
            },
            demo_page: self.demo_page.as_ref().map(|hook| hook(ctx)),
        }
    }

    /// Runs the template-scoped query handler.
    pub fn run_query(&self, query_id: &str, params: Value) -> SiteResult<Value> {
        match &self.query {
            Some(hook) => hook(query_id, params),
            None => Err(SiteError::precondition(format!(
                "template {} has no query handler",
                self.template_id
            ))),
        }
    }

    /// Produces a fully configured [`Card`] from this template.
    ///
    /// User config sources merge in precedence order, later wins:
    /// caller `base_config` floor, the template's user-config hook, the
    /// template's configured defaults, then the explicit config on `args`.
    /// The base-config hook then sees the merged result, and its output
    /// loses to any user-set field.
    pub fn to_card(&self, args: ToCardArgs, ctx: &TemplateContext) -> Card {
        let ToCardArgs {
            mut config,
            base_config,
            card_ctx,
        } = args;

        let template_config = self.get_config(ctx);
        let hook_user_config = match &self.get_user_config {
            Some(hook) => hook(ctx),
            None => Value::Object(Map::new()),
        };
        let explicit = config.user_config.take().unwrap_or(Value::Null);

        let mut layers: Vec<&Value> = Vec::new();
        if let Some(floor) = &base_config {
            layers.push(floor);
        }
        layers.push(&hook_user_config);
        layers.push(&template_config.user_config);
        layers.push(&explicit);
        let specific = merge_config_layers(&layers);

        // pass user-set values to the base config hook so templates can
        // adjust defaults conditionally
        let mut settings = config.clone();
        settings.user_config = Some(specific.clone());
        let template_base = self.base_config(&settings);

        let final_config = merge_config_layers(&[&template_base, &specific]);

        config.card_id = Some(config.card_id.take().unwrap_or_else(|| object_id("crd")));
        config.template_id = Some(self.template_id.clone());
        config.user_config = Some(final_config);
        if config.effects.is_none() && !template_config.effects.is_empty() {
            config.effects = Some(template_config.effects);
        }

        Card::from_config(config, card_ctx)
    }
}

impl fmt::Debug for CardTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardTemplate")
            .field("template_id", &self.template_id)
            .field("title", &self.title)
            .field("is_public", &self.is_public)
            .field("is_page_card", &self.is_page_card)
            .finish_non_exhaustive()
    }
}

/// Arguments to [`CardTemplate::to_card`].
#[derive(Debug, Clone, Default)]
pub struct ToCardArgs {
    /// Portable card settings (id, title, slug, explicit user config, ...).
    pub config: CardConfig,
    /// Caller-supplied config floor, losing to every other layer.
    pub base_config: Option<Value>,
    /// Tree placement for the new card.
    pub card_ctx: CardContext,
}

/// A template resolved for a card, by explicit precedence.
#[derive(Debug, Clone)]
pub enum ResolvedTemplate<'a> {
    /// Card carries its own single-use template.
    Inline(&'a CardTemplate),
    /// Matched a theme-registered template by id.
    Registered(&'a CardTemplate),
    /// Synthetic single-use wrapper around a raw component reference.
    Synthetic(CardTemplate),
}

impl ResolvedTemplate<'_> {
    /// The resolved template, whatever its provenance.
    pub fn get(&self) -> &CardTemplate {
        match self {
            Self::Inline(tpl) | Self::Registered(tpl) => tpl,
            Self::Synthetic(tpl) => tpl,
        }
    }

    pub fn template_id(&self) -> &str {
        &self.get().template_id
    }
}

/// Resolves the template for a card against in-scope templates.
///
/// Precedence: the card's inline template, then a registered template
/// matching `template_id`, then a synthetic wrapper when the card carries a
/// raw component reference. `None` when nothing matches.
pub fn resolve_template<'a>(
    card: &'a Card,
    scope: &'a [CardTemplate],
) -> Option<ResolvedTemplate<'a>> {
    if let Some(inline) = &card.inline_template {
        return Some(ResolvedTemplate::Inline(inline));
    }
    if let Some(found) = scope.iter().find(|t| t.template_id == card.template_id) {
        return Some(ResolvedTemplate::Registered(found));
    }
    if let Some(component) = &card.component {
        let tpl = CardTemplate::new(format!("{}-inline", card.card_id))
            .with_component(component.clone());
        return Some(ResolvedTemplate::Synthetic(tpl));
    }
    None
}

/// Builds portable card records against a template list.
///
/// Used by themes when declaring default pages/sections, so records are
/// validated against known templates before a site ever instantiates them.
#[derive(Debug, Clone, Copy)]
pub struct CardFactory<'a> {
    pub templates: &'a [CardTemplate],
}

impl<'a> CardFactory<'a> {
    pub fn new(templates: &'a [CardTemplate]) -> Self {
        Self { templates }
    }

    /// Finds a template by id.
    pub fn template(&self, template_id: &str) -> SiteResult<&'a CardTemplate> {
        self.templates
            .iter()
            .find(|t| t.template_id == template_id)
            .ok_or_else(|| SiteError::template_not_found(template_id))
    }

    /// Produces a card record with the template's static defaults merged
    /// beneath the supplied user config.
    pub fn create(&self, mut config: CardConfig) -> SiteResult<CardConfig> {
        let template_id = config
            .template_id
            .clone()
            .ok_or_else(|| SiteError::precondition("cardConfig.templateId is required"))?;
        let template = self.template(&template_id)?;

        let explicit = config.user_config.take().unwrap_or(Value::Null);
        config.user_config = Some(merge_config_layers(&[&template.user_config, &explicit]));
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> TemplateContext {
        TemplateContext::default()
    }

    #[test]
    fn test_to_card_merges_default_cascade() {
        let tpl = CardTemplate::new("brand")
            .with_user_config(json!({ "logo": { "format": "typography", "text": "Brand" } }));

        let card = tpl.to_card(
            ToCardArgs {
                config: CardConfig {
                    user_config: Some(json!({ "logo": { "text": "Acme" } })),
                    ..Default::default()
                },
                ..Default::default()
            },
            &ctx(),
        );

        assert_eq!(
            card.user_config,
            json!({ "logo": { "format": "typography", "text": "Acme" } })
        );
        assert!(card.card_id.starts_with("crd_"));
        assert_eq!(card.template_id, "brand");
    }

    #[test]
    fn test_to_card_user_beats_base_config_hook() {
        let tpl = CardTemplate::new("hero").on_base_config(|_| json!({ "a": 1 }));

        let card = tpl.to_card(
            ToCardArgs {
                config: CardConfig {
                    user_config: Some(json!({ "a": 2, "b": 3 })),
                    ..Default::default()
                },
                ..Default::default()
            },
            &ctx(),
        );

        assert_eq!(card.user_config, json!({ "a": 2, "b": 3 }));
    }

    #[test]
    fn test_base_config_hook_sees_merged_user_values() {
        let tpl = CardTemplate::new("columns").on_base_config(|settings| {
            let cols = settings
                .user_config
                .as_ref()
                .and_then(|uc| uc.get("items"))
                .and_then(|v| v.as_array())
                .map(|a| a.len())
                .unwrap_or(1);
            json!({ "layout": { "columns": cols } })
        });

        let card = tpl.to_card(
            ToCardArgs {
                config: CardConfig {
                    user_config: Some(json!({ "items": [1, 2, 3] })),
                    ..Default::default()
                },
                ..Default::default()
            },
            &ctx(),
        );

        assert_eq!(card.user_config["layout"]["columns"], json!(3));
    }

    #[test]
    fn test_to_card_caller_base_config_is_floor() {
        let tpl = CardTemplate::new("area").with_user_config(json!({ "mid": "tpl" }));

        let card = tpl.to_card(
            ToCardArgs {
                config: CardConfig::default(),
                base_config: Some(json!({ "mid": "floor", "floorOnly": true })),
                card_ctx: CardContext::default(),
            },
            &ctx(),
        );

        assert_eq!(card.user_config["mid"], json!("tpl"));
        assert_eq!(card.user_config["floorOnly"], json!(true));
    }

    #[test]
    fn test_to_card_attaches_effects() {
        let tpl = CardTemplate::new("hero").on_effects(|_| {
            vec![CardConfig {
                template_id: Some("fade".into()),
                ..Default::default()
            }]
        });

        let card = tpl.to_card(ToCardArgs::default(), &ctx());
        assert_eq!(card.effects.len(), 1);
        assert_eq!(card.effects[0].template_id, "fade");
    }

    #[test]
    fn test_custom_get_config_wins_verbatim() {
        let tpl = CardTemplate::new("special")
            .with_user_config(json!({ "ignored": true }))
            .on_get_config(|_| TemplateConfig {
                user_config: json!({ "custom": true }),
                ..Default::default()
            });

        let config = tpl.get_config(&ctx());
        assert_eq!(config.user_config, json!({ "custom": true }));
    }

    #[test]
    fn test_resolve_template_precedence() {
        let registered = vec![CardTemplate::new("hero")];

        let card = Card::from_config(
            CardConfig {
                template_id: Some("hero".into()),
                ..Default::default()
            },
            CardContext::default(),
        );
        assert!(matches!(
            resolve_template(&card, &registered),
            Some(ResolvedTemplate::Registered(_))
        ));

        let mut inline_card = Card::from_config(
            CardConfig {
                template_id: Some("hero".into()),
                ..Default::default()
            },
            CardContext::default(),
        );
        inline_card.inline_template = Some(CardTemplate::new("inline-hero"));
        assert!(matches!(
            resolve_template(&inline_card, &registered),
            Some(ResolvedTemplate::Inline(_))
        ));

        let component_card = Card::from_config(
            CardConfig {
                template_id: Some("missing".into()),
                component: Some("ElCustom".into()),
                ..Default::default()
            },
            CardContext::default(),
        );
        let resolved = resolve_template(&component_card, &registered)
            .expect("synthetic template for component card");
        assert!(matches!(resolved, ResolvedTemplate::Synthetic(_)));
        assert!(resolved.template_id().ends_with("-inline"));

        let bare_card = Card::from_config(
            CardConfig {
                template_id: Some("missing".into()),
                ..Default::default()
            },
            CardContext::default(),
        );
        assert!(resolve_template(&bare_card, &registered).is_none());
    }

    #[test]
    fn test_factory_unknown_template_errors() {
        let templates = vec![CardTemplate::new("hero")];
        let factory = CardFactory::new(&templates);

        let err = factory
            .create(CardConfig {
                template_id: Some("noExist".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Could not find template with key noExist");
    }

    #[test]
    fn test_factory_merges_static_defaults() {
        let templates =
            vec![CardTemplate::new("hero").with_user_config(json!({ "heading": "Hello" }))];
        let factory = CardFactory::new(&templates);

        let config = factory
            .create(CardConfig {
                template_id: Some("hero".into()),
                user_config: Some(json!({ "subHeading": "World" })),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            config.user_config,
            Some(json!({ "heading": "Hello", "subHeading": "World" }))
        );
    }
}
