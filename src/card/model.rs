//! Configured card instances arranged in a tree.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::card::template::CardTemplate;
use crate::config::{merge_config_layers, object_id, set_nested, to_label};
use crate::error::{SiteError, SiteResult};

/// Portable, serializable card settings. This is the persisted shape; a
/// [`Card`] is hydrated from it with tree placement applied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CardConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_home: Option<bool>,
    #[serde(rename = "is404", skip_serializing_if = "Option::is_none")]
    pub is_404: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_system: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_config: Option<Value>,
    /// `None` means "leave children alone" on update; `Some` replaces them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<CardConfig>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effects: Option<Vec<CardConfig>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<Value>,
    /// Raw component reference for cards without a registered template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

impl CardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Set card id.
    pub fn with_card_id(mut self, card_id: impl Into<String>) -> Self {
        self.card_id = Some(card_id.into());
        self
    }

    /// Builder: Set template id.
    pub fn with_template_id(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    /// Builder: Set title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Builder: Set slug.
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Builder: Set user config.
    pub fn with_user_config(mut self, user_config: Value) -> Self {
        self.user_config = Some(user_config);
        self
    }

    /// Builder: Set child card configs.
    pub fn with_cards(mut self, cards: Vec<CardConfig>) -> Self {
        self.cards = Some(cards);
        self
    }

    /// Builder: Mark as home page.
    pub fn as_home(mut self) -> Self {
        self.is_home = Some(true);
        self
    }
}

/// Placement of a card within its parent's tree.
#[derive(Debug, Clone, Default)]
pub struct CardContext {
    pub parent_id: Option<String>,
    pub depth: usize,
    /// Region inherited from the parent chain.
    pub region_id: Option<String>,
    /// Template to default to for top-level (page) cards.
    pub page_template_id: Option<String>,
}

/// Where to insert a new card among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    #[default]
    Top,
    Bottom,
}

/// A configured card instance inside a site's tree.
///
/// Cards at depth 0 are pages; deeper cards are sections and elements. The
/// card holds only its own layer of config; effective config is resolved on
/// read against the site cascade.
#[derive(Debug, Clone)]
pub struct Card {
    pub card_id: String,
    pub parent_id: Option<String>,
    pub depth: usize,
    pub region_id: String,
    pub layout_id: Option<String>,
    pub template_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub is_home: bool,
    pub is_404: bool,
    pub is_system: bool,
    pub user_config: Value,
    pub cards: Vec<Card>,
    pub effects: Vec<Card>,
    pub generation: Value,
    /// Single-use template carried by the card itself, not the theme.
    pub inline_template: Option<CardTemplate>,
    pub component: Option<String>,
}

impl Card {
    /// Hydrates a card (and its subtree) from portable settings.
    pub fn from_config(config: CardConfig, ctx: CardContext) -> Self {
        let template_id = config.template_id.unwrap_or_else(|| {
            if ctx.parent_id.is_some() {
                "area".to_string()
            } else {
                ctx.page_template_id
                    .clone()
                    .unwrap_or_else(|| "wrap".to_string())
            }
        });
        let card_id = config.card_id.unwrap_or_else(|| object_id("crd"));
        let region_id = config
            .region_id
            .or_else(|| ctx.region_id.clone())
            .unwrap_or_else(|| "main".to_string());

        let mut card = Self {
            parent_id: ctx.parent_id,
            depth: ctx.depth,
            region_id,
            layout_id: config.layout_id,
            template_id,
            title: config.title,
            description: config.description,
            slug: config.slug,
            is_home: config.is_home.unwrap_or(false),
            is_404: config.is_404.unwrap_or(false),
            is_system: config.is_system.unwrap_or(false),
            user_config: config
                .user_config
                .unwrap_or_else(|| Value::Object(Map::new())),
            cards: Vec::new(),
            effects: Vec::new(),
            generation: config.generation.unwrap_or(Value::Null),
            inline_template: None,
            component: config.component,
            card_id,
        };

        let cards: Vec<Card> = config
            .cards
            .unwrap_or_default()
            .into_iter()
            .map(|c| card.init_sub_card(c))
            .collect();
        let effects: Vec<Card> = config
            .effects
            .unwrap_or_default()
            .into_iter()
            .map(|c| card.init_sub_card(c))
            .collect();
        card.cards = cards;
        card.effects = effects;
        card
    }

    /// Hydrates a child card, inheriting region and incrementing depth.
    fn init_sub_card(&self, config: CardConfig) -> Card {
        Card::from_config(
            config,
            CardContext {
                parent_id: Some(self.card_id.clone()),
                depth: self.depth + 1,
                region_id: Some(self.region_id.clone()),
                page_template_id: None,
            },
        )
    }

    /// Inserts a nested card, returning the new card's id.
    pub fn add_card(&mut self, config: CardConfig, location: Location) -> String {
        let child = self.init_sub_card(config);
        let card_id = child.card_id.clone();
        match location {
            Location::Top => self.cards.insert(0, child),
            Location::Bottom => self.cards.push(child),
        }
        card_id
    }

    /// Applies partial settings to this card.
    ///
    /// Only editable fields are taken: title, slug, userConfig (replaced
    /// wholesale), templateId, isHome, is404. Child cards are replaced
    /// wholesale when present. Anything else in `config` is ignored.
    pub fn update(&mut self, config: CardConfig) {
        if let Some(title) = config.title {
            self.title = Some(title);
        }
        if let Some(slug) = config.slug {
            self.slug = Some(slug);
        }
        if let Some(user_config) = config.user_config {
            self.user_config = user_config;
        }
        if let Some(template_id) = config.template_id {
            self.template_id = template_id;
        }
        if let Some(is_home) = config.is_home {
            self.is_home = is_home;
        }
        if let Some(is_404) = config.is_404 {
            self.is_404 = is_404;
        }
        if let Some(cards) = config.cards {
            let replaced: Vec<Card> = cards.into_iter().map(|c| self.init_sub_card(c)).collect();
            self.cards = replaced;
        }
    }

    /// Sets one dotted-path key in the card's own user config.
    pub fn update_user_config(&mut self, path: &str, value: Value) {
        set_nested(&mut self.user_config, path, value);
    }

    /// Finds a card by id in this card's subtree, itself included.
    pub fn find_card(&self, card_id: &str) -> Option<&Card> {
        if self.card_id == card_id {
            return Some(self);
        }
        self.cards
            .iter()
            .chain(self.effects.iter())
            .find_map(|c| c.find_card(card_id))
    }

    /// Mutable variant of [`Card::find_card`].
    pub fn find_card_mut(&mut self, card_id: &str) -> Option<&mut Card> {
        if self.card_id == card_id {
            return Some(self);
        }
        self.cards
            .iter_mut()
            .chain(self.effects.iter_mut())
            .find_map(|c| c.find_card_mut(card_id))
    }

    /// Flattens this card's subtree depth-first, itself first.
    pub fn flatten(&self) -> Vec<&Card> {
        let mut out = vec![self];
        for child in self.cards.iter().chain(self.effects.iter()) {
            out.extend(child.flatten());
        }
        out
    }

    /// Removes a card or effect by id from this card's subtree (not itself).
    pub fn remove_card(&mut self, card_id: &str) -> SiteResult<()> {
        if let Some(pos) = self.cards.iter().position(|c| c.card_id == card_id) {
            self.cards.remove(pos);
            return Ok(());
        }
        if let Some(pos) = self.effects.iter().position(|c| c.card_id == card_id) {
            self.effects.remove(pos);
            return Ok(());
        }
        for child in self.cards.iter_mut().chain(self.effects.iter_mut()) {
            if child.remove_card(card_id).is_ok() {
                return Ok(());
            }
        }
        Err(SiteError::card_not_found(card_id))
    }

    /// Resolves the card's effective config against the site cascade.
    ///
    /// Layers in precedence order, later wins: the site's resolved config,
    /// the template's base config for this card's settings, then the card's
    /// own user config.
    pub fn full_config(&self, site_config: &Value, templates: &[CardTemplate]) -> Value {
        let template_base = crate::card::template::resolve_template(self, templates)
            .map(|t| t.get().base_config(&self.to_config()))
            .unwrap_or(Value::Null);
        merge_config_layers(&[site_config, &template_base, &self.user_config])
    }

    /// Title for display, falling back to a label derived from the slug.
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) if !title.is_empty() => title.clone(),
            _ => self
                .slug
                .as_deref()
                .map(to_label)
                .unwrap_or_else(|| "Page".to_string()),
        }
    }

    /// Serializes to portable settings, recursively.
    ///
    /// System-managed children and effects are excluded; they are
    /// reattached from templates on every load.
    pub fn to_config(&self) -> CardConfig {
        let cards: Vec<CardConfig> = self
            .cards
            .iter()
            .filter(|c| !c.is_system)
            .map(Card::to_config)
            .collect();
        let effects: Vec<CardConfig> = self
            .effects
            .iter()
            .filter(|c| !c.is_system)
            .map(Card::to_config)
            .collect();

        CardConfig {
            card_id: Some(self.card_id.clone()),
            template_id: Some(self.template_id.clone()),
            region_id: Some(self.region_id.clone()),
            layout_id: self.layout_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            slug: self.slug.clone(),
            is_home: self.is_home.then_some(true),
            is_404: self.is_404.then_some(true),
            is_system: self.is_system.then_some(true),
            user_config: Some(self.user_config.clone()),
            cards: Some(cards),
            effects: if effects.is_empty() {
                None
            } else {
                Some(effects)
            },
            generation: if self.generation.is_null() {
                None
            } else {
                Some(self.generation.clone())
            },
            component: self.component.clone(),
        }
    }

    /// Recursively releases children and effects, then editor-only state.
    pub fn cleanup(&mut self) {
        for child in self.cards.iter_mut().chain(self.effects.iter_mut()) {
            child.cleanup();
        }
        self.cards.clear();
        self.effects.clear();
        self.inline_template = None;
    }
}
