//! The Site aggregate: page/section tree, theme binding, editor frame sync,
//! and the draft/publish lifecycle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::card::{Card, CardConfig, CardTemplate, SiteLoadEvent, TemplateContext};
use crate::config::{merge_config_layers, object_id};
use crate::error::{SiteError, SiteResult};
use crate::frame::{FrameDoc, FrameRelation};
use crate::site::layout::{order_cards, LayoutOrder};
use crate::site::model::{EditorState, SiteConfig, SiteMode};
use crate::site::region::{self, AddCardOptions};
use crate::site::{layout, page};
use crate::store::{save_site, SiteStore, StoreResponse, StoreScope};
use crate::theme::{ThemeConfig, ThemeRegistry};

/// Quiet period between the last edit and the background draft save.
const AUTOSAVE_DELAY: Duration = Duration::from_secs(2);

/// Last-write-wins debounce timer for background draft saves.
///
/// At most one deadline is pending; every trigger restarts it, so a burst
/// of edits produces a single save scheduled from the final edit.
#[derive(Debug, Default)]
struct Autosave {
    deadline: Option<Instant>,
}

impl Autosave {
    fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + AUTOSAVE_DELAY);
    }

    fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Clears and reports a deadline that has passed.
    fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Hook fired after the editor selection changes, with the new card id.
pub type ActiveCardHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Hook fired before a selection change to reset editor chrome.
pub type ResetUiHook = Arc<dyn Fn() + Send + Sync>;

/// Construction options for [`Site::create`].
#[derive(Debug, Clone)]
pub struct SiteOptions {
    pub mode: SiteMode,
    /// Append the theme's default pages after any settings-supplied pages.
    pub load_theme_pages: bool,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            mode: SiteMode::Standard,
            load_theme_pages: true,
        }
    }
}

/// Options threaded through mutating operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Caller tag for the structured update log.
    pub caller: &'static str,
    /// Skip the autosave trigger.
    pub no_save: bool,
    /// Skip frame propagation.
    pub no_sync: bool,
}

/// The aggregate root owning a site's pages, sections, theme binding, and
/// editor/draft state.
pub struct Site {
    pub site_id: String,
    pub org_id: Option<String>,
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub theme_id: String,
    pub sub_domain: Option<String>,
    pub custom_domains: Vec<String>,
    pub status: Option<String>,
    /// Site-wide overrides merged beneath every card's config.
    pub user_config: Value,
    pub pages: Vec<Card>,
    pub sections: BTreeMap<String, Card>,
    pub editor: EditorState,
    pub mode: SiteMode,
    pub frame: FrameDoc,
    theme_config: ThemeConfig,
    templates: Vec<CardTemplate>,
    page_template_id: String,
    autosave: Autosave,
    active_card_hook: Option<ActiveCardHook>,
    reset_ui_hook: Option<ResetUiHook>,
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("site_id", &self.site_id)
            .field("theme_id", &self.theme_id)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Site {
    /// Loads a site from its portable config against a theme registry.
    ///
    /// A theme id that resolves to no registered theme is a hard error;
    /// nothing is partially constructed.
    pub fn create(
        config: SiteConfig,
        themes: &ThemeRegistry,
        options: SiteOptions,
    ) -> SiteResult<Self> {
        let theme_id = config
            .theme_id
            .ok_or_else(|| SiteError::precondition("themeId is required"))?;
        let theme = themes.get(&theme_id)?;
        let site_id = config.site_id.unwrap_or_else(|| object_id("ste"));
        let user_config = config.user_config.unwrap_or_else(|| Value::Object(Map::new()));

        let ctx = TemplateContext {
            site_id: Some(site_id.clone()),
            site_config: user_config.clone(),
        };
        let theme_config = theme.get_theme_config(&ctx);
        let templates = theme.templates.clone();
        let page_template_id = theme.template_defaults.page.clone();

        let mut page_configs = config.pages.unwrap_or_default();
        if options.load_theme_pages {
            page_configs.extend(theme_config.pages.iter().cloned());
        }
        let pages = page::set_pages(page_configs, &templates, &page_template_id)?;

        // settings-supplied sections win over the theme's defaults
        let mut section_configs = theme_config.sections.clone();
        section_configs.extend(config.sections.unwrap_or_default());
        let sections = section_configs
            .into_iter()
            .map(|(region_id, mut section_config)| {
                if section_config.region_id.is_none() {
                    section_config.region_id = Some(region_id.clone());
                }
                let card = Card::from_config(section_config, Default::default());
                (region_id, card)
            })
            .collect();

        let relation = if options.mode.is_designer() {
            FrameRelation::Parent
        } else {
            FrameRelation::Child
        };

        let site = Self {
            site_id: site_id.clone(),
            org_id: config.org_id,
            user_id: config.user_id,
            title: config.title,
            theme_id: theme_id.clone(),
            sub_domain: config.sub_domain,
            custom_domains: config.custom_domains.unwrap_or_default(),
            status: config.status,
            user_config,
            pages,
            sections,
            editor: config.editor.unwrap_or_default(),
            mode: options.mode,
            frame: FrameDoc::new(relation),
            theme_config,
            templates,
            page_template_id,
            autosave: Autosave::default(),
            active_card_hook: None,
            reset_ui_hook: None,
        };

        for template in &site.templates {
            if let Some(hook) = &template.on_site_load {
                hook(&SiteLoadEvent {
                    site_id: site_id.clone(),
                    theme_id: theme_id.clone(),
                });
            }
        }
        info!(site_id = %site.site_id, theme_id = %site.theme_id, pages = site.pages.len(), "site loaded");
        Ok(site)
    }

    /// Templates in scope for this site's cards.
    pub fn templates(&self) -> &[CardTemplate] {
        &self.templates
    }

    /// Site-level resolved config: theme config with site overrides on top.
    pub fn full_config(&self) -> Value {
        merge_config_layers(&[&self.theme_config.user_config, &self.user_config])
    }

    /// A card's effective config against the full site cascade.
    pub fn card_full_config(&self, card_id: &str) -> SiteResult<Value> {
        let card = self
            .find_card(card_id)
            .ok_or_else(|| SiteError::card_not_found(card_id))?;
        Ok(card.full_config(&self.full_config(), &self.templates))
    }

    // =========================================================================
    // SITE MUTATION
    // =========================================================================

    /// Applies a partial site config. Only the editable fields are taken;
    /// pages and sections are re-instantiated when present.
    pub fn update(&mut self, patch: SiteConfig, options: UpdateOptions) -> SiteResult<()> {
        if let Some(title) = patch.title {
            self.title = Some(title);
        }
        if let Some(user_config) = patch.user_config {
            self.user_config = user_config;
        }
        if let Some(theme_id) = patch.theme_id {
            self.theme_id = theme_id;
        }
        if let Some(sub_domain) = patch.sub_domain {
            self.sub_domain = Some(sub_domain);
        }
        if let Some(custom_domains) = patch.custom_domains {
            self.custom_domains = custom_domains;
        }
        if let Some(status) = patch.status {
            self.status = Some(status);
        }
        if let Some(editor) = patch.editor {
            self.editor = editor;
        }
        if let Some(pages) = patch.pages {
            self.pages = page::set_pages(pages, &self.templates, &self.page_template_id)?;
        }
        if let Some(sections) = patch.sections {
            self.sections = sections
                .into_iter()
                .map(|(region_id, mut config)| {
                    if config.region_id.is_none() {
                        config.region_id = Some(region_id.clone());
                    }
                    (region_id, Card::from_config(config, Default::default()))
                })
                .collect();
        }

        info!(caller = options.caller, site_id = %self.site_id, "update site");
        if !options.no_sync {
            self.sync_change()?;
        }
        if !options.no_save {
            self.autosave();
        }
        Ok(())
    }

    // =========================================================================
    // CARD MEDIATION
    // =========================================================================

    /// Finds a card anywhere in the page/section tree.
    pub fn find_card(&self, card_id: &str) -> Option<&Card> {
        region::find_card(&self.pages, &self.sections, card_id)
    }

    /// Applies partial settings to a card, then syncs and autosaves.
    pub fn update_card(
        &mut self,
        card_id: &str,
        config: CardConfig,
        options: UpdateOptions,
    ) -> SiteResult<()> {
        let synced = {
            let card = region::find_card_mut(&mut self.pages, &mut self.sections, card_id)
                .ok_or_else(|| SiteError::card_not_found(card_id))?;
            card.update(config);
            card.to_config()
        };
        info!(caller = options.caller, card_id, "update card");
        if !options.no_sync {
            self.sync_card_config(&synced)?;
        }
        if !options.no_save {
            self.autosave();
        }
        Ok(())
    }

    /// Sets one dotted-path key in a card's user config.
    pub fn update_card_user_config(
        &mut self,
        card_id: &str,
        path: &str,
        value: Value,
        options: UpdateOptions,
    ) -> SiteResult<()> {
        let synced = {
            let card = region::find_card_mut(&mut self.pages, &mut self.sections, card_id)
                .ok_or_else(|| SiteError::card_not_found(card_id))?;
            card.update_user_config(path, value);
            card.to_config()
        };
        if !options.no_sync {
            self.sync_card_config(&synced)?;
        }
        if !options.no_save {
            self.autosave();
        }
        Ok(())
    }

    /// Instantiates and inserts a new card, returning its id.
    pub fn add_card(&mut self, config: CardConfig, options: AddCardOptions) -> SiteResult<String> {
        let card_id = region::add_new_card(
            &mut self.pages,
            &mut self.sections,
            &self.templates,
            config,
            options,
            &self.page_template_id,
        )?;
        self.sync_card(&card_id)?;
        self.autosave();
        Ok(card_id)
    }

    /// Removes a card anywhere in the tree; a missing id is a hard error.
    pub fn remove_card(&mut self, card_id: &str) -> SiteResult<()> {
        region::remove_card(&mut self.pages, &mut self.sections, card_id)?;
        if self.editor.selected_card_id.as_deref() == Some(card_id) {
            self.editor.selected_card_id = None;
        }
        self.sync_change()?;
        self.autosave();
        Ok(())
    }

    /// Reorders cards per the drag layer's nested order.
    ///
    /// The `main` region targets the active page; other keys target their
    /// named section.
    pub fn update_layout(&mut self, order: &LayoutOrder) -> SiteResult<()> {
        for (region_id, items) in order {
            if region_id == "main" {
                let page_id = self.active_page_id();
                if let Some(active) = self.pages.iter_mut().find(|p| p.card_id == page_id) {
                    order_cards(&mut active.cards, items);
                }
            } else if let Some(section) = self.sections.get_mut(region_id) {
                order_cards(&mut section.cards, items);
            }
        }
        self.sync_change()?;
        self.autosave();
        Ok(())
    }

    /// Registers a hook fired after every selection change.
    pub fn on_set_active_card(&mut self, hook: impl Fn(&str) + Send + Sync + 'static) {
        self.active_card_hook = Some(Arc::new(hook));
    }

    /// Registers a hook fired before every selection change.
    pub fn on_reset_ui(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.reset_ui_hook = Some(Arc::new(hook));
    }

    /// Selects a card in the editor and propagates the selection.
    ///
    /// Editor chrome is reset before the new id is recorded; the selection
    /// hook fires after, then the selection syncs to the paired frame.
    pub fn set_active_card(&mut self, card_id: &str) -> SiteResult<()> {
        if let Some(reset) = &self.reset_ui_hook {
            reset();
        }
        self.editor.selected_card_id = Some(card_id.to_string());
        if let Some(hook) = &self.active_card_hook {
            hook(card_id);
        }
        if self.mode.is_editable() {
            self.frame.sync_active_card(card_id)?;
        }
        Ok(())
    }

    // =========================================================================
    // PAGES
    // =========================================================================

    /// Slug → page-card-id routing table.
    pub fn view_map(&self) -> BTreeMap<String, String> {
        page::get_view_map(&self.pages)
    }

    /// Resolves a requested view to a page id, with 404 fallbacks.
    pub fn resolve_page_id(&self, view_id: Option<&str>) -> String {
        page::get_active_page_id(&self.view_map(), view_id)
    }

    /// Page currently under edit; home when nothing is selected.
    pub fn active_page_id(&self) -> String {
        match &self.editor.selected_page_id {
            Some(page_id) => page_id.clone(),
            None => self.resolve_page_id(None),
        }
    }

    /// Finds a page, serving the synthetic 404 page for unknown ids.
    pub fn page_by_id(&self, page_id: &str) -> Card {
        page::get_page_by_id(&self.pages, page_id)
    }

    /// Upserts a page from portable settings.
    pub fn update_page(&mut self, config: CardConfig) -> SiteResult<String> {
        let card_id =
            page::update_page(&mut self.pages, config, &self.templates, &self.page_template_id)?;
        self.sync_change()?;
        self.autosave();
        Ok(card_id)
    }

    /// Designates a page as home, keeping the single-home invariant.
    ///
    /// Every other page has its flag unset here, not at call sites; a page
    /// that previously held the `_home` slug is renamed `old-home`.
    pub fn set_page_as_home(&mut self, card_id: &str) -> SiteResult<()> {
        if !self.pages.iter().any(|p| p.card_id == card_id) {
            return Err(SiteError::card_not_found(card_id));
        }
        for page in &mut self.pages {
            if page.card_id == card_id {
                page.is_home = true;
                page.slug = Some("_home".to_string());
            } else if page.is_home || page.slug.as_deref() == Some("_home") {
                page.is_home = false;
                if page.slug.as_deref() == Some("_home") {
                    page.slug = Some("old-home".to_string());
                }
            }
        }
        self.sync_change()?;
        self.autosave();
        Ok(())
    }

    // =========================================================================
    // FRAME SYNC
    // =========================================================================

    /// Publishes the site snapshot to the paired frame. No-op outside an
    /// editing session.
    pub fn sync_change(&mut self) -> SiteResult<()> {
        if !self.mode.is_editable() {
            return Ok(());
        }
        let snapshot: SiteConfig = serde_json::from_value(self.to_config(&[])?)?;
        self.frame.sync_site(&snapshot)
    }

    /// Publishes one card's snapshot to the paired frame.
    pub fn sync_card(&mut self, card_id: &str) -> SiteResult<()> {
        let config = self
            .find_card(card_id)
            .ok_or_else(|| SiteError::card_not_found(card_id))?
            .to_config();
        self.sync_card_config(&config)
    }

    fn sync_card_config(&mut self, config: &CardConfig) -> SiteResult<()> {
        if !self.mode.is_editable() {
            return Ok(());
        }
        self.frame.sync_card(config)
    }

    /// Applies a card snapshot received from the counterpart frame.
    ///
    /// Receiving the same snapshot twice is a no-op beyond redundant
    /// writes; never triggers a save.
    pub fn apply_synced_card(&mut self, config: CardConfig) -> SiteResult<()> {
        let card_id = config
            .card_id
            .clone()
            .ok_or_else(|| SiteError::precondition("synced card has no cardId"))?;
        let card = region::find_card_mut(&mut self.pages, &mut self.sections, &card_id)
            .ok_or_else(|| SiteError::card_not_found(card_id))?;
        card.update(config);
        Ok(())
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Schedules a background draft save, restarting the debounce window.
    /// Only the designer frame persists; other modes ignore this.
    pub fn autosave(&mut self) {
        self.autosave_at(Instant::now());
    }

    /// Clock-explicit variant of [`Site::autosave`].
    pub fn autosave_at(&mut self, now: Instant) {
        if !self.mode.is_designer() {
            return;
        }
        self.editor.is_dirty = true;
        self.autosave.trigger(now);
    }

    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    /// Performs the due background save, if any. Failures are logged and
    /// swallowed; the next edit or explicit save retries.
    pub fn process_autosave(&mut self, store: &mut dyn SiteStore) {
        self.process_autosave_at(Instant::now(), store);
    }

    /// Clock-explicit variant of [`Site::process_autosave`].
    pub fn process_autosave_at(&mut self, now: Instant, store: &mut dyn SiteStore) {
        if !self.autosave.take_due(now) {
            return;
        }
        if let Err(error) = self.save(store, StoreScope::Draft) {
            warn!(site_id = %self.site_id, %error, "autosave failed");
        }
    }

    /// Persists the site, draft or publish scope.
    pub fn save(&mut self, store: &mut dyn SiteStore, scope: StoreScope) -> SiteResult<StoreResponse> {
        let response = save_site(self, store, scope)?;
        self.editor.is_dirty = false;
        Ok(response)
    }

    // =========================================================================
    // SERIALIZATION
    // =========================================================================

    /// Serializes the site to its portable record.
    ///
    /// `only_keys` narrows the snapshot to the named top-level keys for
    /// targeted persistence diffs; the site id is always kept. System pages
    /// are excluded, and only the stored subset of editor state is emitted.
    pub fn to_config(&self, only_keys: &[&str]) -> SiteResult<Value> {
        let pages: Vec<Value> = self
            .pages
            .iter()
            .filter(|p| !p.is_system)
            .map(|p| serde_json::to_value(p.to_config()))
            .collect::<Result<_, _>>()?;
        let sections: Map<String, Value> = self
            .sections
            .iter()
            .map(|(region_id, card)| {
                Ok((region_id.clone(), serde_json::to_value(card.to_config())?))
            })
            .collect::<SiteResult<_>>()?;

        let mut map = Map::new();
        map.insert("siteId".into(), Value::String(self.site_id.clone()));
        if let Some(org_id) = &self.org_id {
            map.insert("orgId".into(), Value::String(org_id.clone()));
        }
        if let Some(title) = &self.title {
            map.insert("title".into(), Value::String(title.clone()));
        }
        map.insert("themeId".into(), Value::String(self.theme_id.clone()));
        if let Some(sub_domain) = &self.sub_domain {
            map.insert("subDomain".into(), Value::String(sub_domain.clone()));
        }
        map.insert(
            "customDomains".into(),
            serde_json::to_value(&self.custom_domains)?,
        );
        if let Some(status) = &self.status {
            map.insert("status".into(), Value::String(status.clone()));
        }
        map.insert("userConfig".into(), self.user_config.clone());
        map.insert("editor".into(), self.editor.stored());
        map.insert("pages".into(), Value::Array(pages));
        map.insert("sections".into(), Value::Object(sections));

        if !only_keys.is_empty() {
            map.retain(|key, _| key == "siteId" || only_keys.contains(&key.as_str()));
        }
        Ok(Value::Object(map))
    }

    /// Flattens every card on the site, pages then sections.
    pub fn flatten_cards(&self) -> Vec<&Card> {
        let mut out = layout::flatten_cards(&self.pages);
        for section in self.sections.values() {
            out.push(section);
            out.extend(layout::flatten_cards(&section.cards));
            out.extend(layout::flatten_cards(&section.effects));
        }
        out
    }

    /// Releases the page/section tree.
    pub fn cleanup(&mut self) {
        for page in &mut self.pages {
            page.cleanup();
        }
        self.pages.clear();
        for section in self.sections.values_mut() {
            section.cleanup();
        }
        self.sections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardTemplate;
    use crate::site::layout::LayoutItem;
    use crate::store::{MemoryStore, StoreAction, StoreRequest};
    use crate::theme::Theme;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn registry() -> ThemeRegistry {
        ThemeRegistry::new(vec![Theme::new("minimal")
            .with_templates(vec![
                CardTemplate::new("wrap").as_page_card(),
                CardTemplate::new("hero").with_user_config(json!({ "heading": "Hello" })),
                CardTemplate::new("area"),
            ])
            .with_user_config(json!({ "branding": { "logo": "minimal.svg" } }))
            .on_get_config(|_| crate::theme::ThemeConfig {
                user_config: json!({}),
                pages: vec![CardConfig::new()
                    .with_card_id("pg_home")
                    .with_slug("_home")
                    .as_home()],
                sections: [(
                    "header".to_string(),
                    CardConfig::new().with_card_id("sec_header"),
                )]
                .into_iter()
                .collect(),
            })])
    }

    fn designer_site() -> Site {
        Site::create(
            SiteConfig::new().with_site_id("ste_1").with_theme_id("minimal"),
            &registry(),
            SiteOptions {
                mode: SiteMode::Designer,
                load_theme_pages: true,
            },
        )
        .unwrap()
    }

    /// Store that records every action it receives.
    #[derive(Default)]
    struct RecordingStore {
        actions: Vec<StoreAction>,
    }

    impl SiteStore for RecordingStore {
        fn request(&mut self, request: StoreRequest) -> SiteResult<StoreResponse> {
            self.actions.push(request.action);
            Ok(StoreResponse::success(Value::Null))
        }
    }

    #[test]
    fn test_create_loads_theme_pages_and_sections() {
        let site = designer_site();
        assert_eq!(site.pages.len(), 1);
        assert_eq!(site.pages[0].card_id, "pg_home");
        assert!(site.sections.contains_key("header"));
        assert_eq!(site.sections["header"].region_id, "header");
    }

    #[test]
    fn test_create_missing_theme_is_hard_error() {
        let err = Site::create(
            SiteConfig::new().with_theme_id("noExist"),
            &registry(),
            SiteOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Theme with ID noExist not found");
    }

    #[test]
    fn test_create_fires_site_load_hooks() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let registry = ThemeRegistry::new(vec![Theme::new("hooked").with_templates(vec![
            CardTemplate::new("wrap").as_page_card().on_site_load(move |event| {
                assert_eq!(event.theme_id, "hooked");
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        ])]);

        Site::create(
            SiteConfig::new().with_theme_id("hooked"),
            &registry,
            SiteOptions::default(),
        )
        .unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_full_config_site_overrides_theme() {
        let mut site = designer_site();
        site.update(
            SiteConfig::new().with_user_config(json!({ "branding": { "logo": "acme.svg" } })),
            UpdateOptions { no_save: true, no_sync: true, ..Default::default() },
        )
        .unwrap();

        let full = site.full_config();
        assert_eq!(full["branding"]["logo"], json!("acme.svg"));
    }

    #[test]
    fn test_card_full_config_cascades_site_config() {
        let mut site = designer_site();
        let card_id = site
            .add_card(
                CardConfig::new().with_template_id("hero"),
                AddCardOptions {
                    add_to_card_id: Some("pg_home".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let full = site.card_full_config(&card_id).unwrap();
        assert_eq!(full["branding"]["logo"], json!("minimal.svg"));
        assert_eq!(full["heading"], json!("Hello"));
    }

    #[test]
    fn test_update_card_syncs_to_frame() {
        let mut site = designer_site();
        let card_id = site
            .add_card(
                CardConfig::new().with_template_id("hero"),
                AddCardOptions {
                    add_to_card_id: Some("pg_home".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        site.update_card(
            &card_id,
            CardConfig::new().with_title("Renamed"),
            UpdateOptions::default(),
        )
        .unwrap();

        let synced = site.frame.card(&card_id).unwrap().unwrap();
        assert_eq!(synced.title.as_deref(), Some("Renamed"));
        assert!(site.editor.is_dirty);
    }

    #[test]
    fn test_standard_mode_never_syncs_or_saves() {
        let mut site = Site::create(
            SiteConfig::new().with_theme_id("minimal"),
            &registry(),
            SiteOptions {
                mode: SiteMode::Standard,
                load_theme_pages: true,
            },
        )
        .unwrap();

        let card_id = site
            .add_card(
                CardConfig::new().with_template_id("hero"),
                AddCardOptions {
                    add_to_card_id: Some("pg_home".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(site.frame.card(&card_id).unwrap().is_none());
        assert!(!site.autosave_pending());
        assert!(!site.editor.is_dirty);
    }

    #[test]
    fn test_remove_missing_card_errors() {
        let mut site = designer_site();
        let err = site.remove_card("crd_ghost").unwrap_err();
        assert_eq!(err.to_string(), "Card with ID crd_ghost not found.");
    }

    #[test]
    fn test_page_routing_and_404_fallback() {
        let mut site = designer_site();
        site.update_page(CardConfig::new().with_card_id("pg_about").with_slug("about"))
            .unwrap();

        assert_eq!(site.resolve_page_id(Some("about")), "pg_about");
        assert_eq!(site.resolve_page_id(None), "pg_home");
        // no designated 404 page, so unroutable views hit the synthetic one
        assert_eq!(site.resolve_page_id(Some("ghost")), page::SPECIAL_404_ID);

        let synthetic = site.page_by_id("pg_ghost");
        assert_eq!(synthetic.card_id, page::SPECIAL_404_ID);
        assert!(synthetic.is_404);
    }

    #[test]
    fn test_set_page_as_home_keeps_single_home() {
        let mut site = designer_site();
        site.update_page(CardConfig::new().with_card_id("pg_about").with_slug("about"))
            .unwrap();

        site.set_page_as_home("pg_about").unwrap();

        let homes: Vec<_> = site.pages.iter().filter(|p| p.is_home).collect();
        assert_eq!(homes.len(), 1);
        assert_eq!(homes[0].card_id, "pg_about");
        assert_eq!(homes[0].slug.as_deref(), Some("_home"));
        let old = site.pages.iter().find(|p| p.card_id == "pg_home").unwrap();
        assert_eq!(old.slug.as_deref(), Some("old-home"));
    }

    #[test]
    fn test_update_layout_reorders_active_page() {
        let mut site = designer_site();
        for id in ["crd_a", "crd_b"] {
            site.add_card(
                CardConfig::new().with_card_id(id).with_template_id("hero"),
                AddCardOptions {
                    add_to_card_id: Some("pg_home".into()),
                    location: crate::card::Location::Bottom,
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let order: LayoutOrder = [(
            "main".to_string(),
            vec![LayoutItem::new("crd_b"), LayoutItem::new("crd_a")],
        )]
        .into_iter()
        .collect();
        site.update_layout(&order).unwrap();

        let page = site.pages.iter().find(|p| p.card_id == "pg_home").unwrap();
        let ids: Vec<_> = page.cards.iter().map(|c| c.card_id.as_str()).collect();
        assert_eq!(ids, vec!["crd_b", "crd_a"]);
    }

    #[test]
    fn test_autosave_debounce_single_save_from_last_trigger() {
        let mut site = designer_site();
        let mut store = RecordingStore::default();
        let t0 = Instant::now();

        site.autosave_at(t0);
        site.autosave_at(t0 + Duration::from_millis(500));
        site.autosave_at(t0 + Duration::from_millis(1000));

        // window runs from the last trigger, not the first
        site.process_autosave_at(t0 + Duration::from_millis(2500), &mut store);
        assert!(store.actions.is_empty());

        site.process_autosave_at(t0 + Duration::from_millis(3100), &mut store);
        assert_eq!(store.actions, vec![StoreAction::SaveDraft]);

        // nothing left pending
        site.process_autosave_at(t0 + Duration::from_secs(10), &mut store);
        assert_eq!(store.actions.len(), 1);
    }

    #[test]
    fn test_autosave_failure_is_swallowed() {
        struct FailingStore;
        impl SiteStore for FailingStore {
            fn request(&mut self, _request: StoreRequest) -> SiteResult<StoreResponse> {
                Ok(StoreResponse::error("backend down"))
            }
        }

        let mut site = designer_site();
        let t0 = Instant::now();
        site.autosave_at(t0);
        // must not panic or propagate
        site.process_autosave_at(t0 + Duration::from_secs(3), &mut FailingStore);
        assert!(!site.autosave_pending());
    }

    #[test]
    fn test_save_through_memory_store_round_trips_draft() {
        let mut store = MemoryStore::new();
        store
            .request(
                StoreRequest::new(StoreAction::Create)
                    .with_site_id("ste_1")
                    .with_fields(json!({ "title": "Published" })),
            )
            .unwrap();

        let mut site = designer_site();
        site.title = Some("Draft X".into());
        site.save(&mut store, StoreScope::Draft).unwrap();
        assert!(!site.editor.is_dirty);

        let draft = store
            .request(
                StoreRequest::new(StoreAction::Retrieve)
                    .with_site_id("ste_1")
                    .with_scope(StoreScope::Draft),
            )
            .unwrap();
        assert_eq!(draft.data.unwrap()["title"], json!("Draft X"));

        let published = store
            .request(StoreRequest::new(StoreAction::Retrieve).with_site_id("ste_1"))
            .unwrap();
        assert_eq!(published.data.unwrap()["title"], json!("Published"));
    }

    #[test]
    fn test_set_active_card_fires_hooks_and_syncs() {
        let mut site = designer_site();
        let resets = Arc::new(AtomicUsize::new(0));
        let selected = Arc::new(std::sync::Mutex::new(String::new()));

        let counter = Arc::clone(&resets);
        site.on_reset_ui(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let seen = Arc::clone(&selected);
        site.on_set_active_card(move |card_id| {
            *seen.lock().unwrap() = card_id.to_string();
        });

        site.set_active_card("pg_home").unwrap();

        assert_eq!(resets.load(Ordering::SeqCst), 1);
        assert_eq!(*selected.lock().unwrap(), "pg_home");
        assert_eq!(site.editor.selected_card_id.as_deref(), Some("pg_home"));
        assert_eq!(
            site.frame.selected_card_id().unwrap().as_deref(),
            Some("pg_home")
        );
    }

    #[test]
    fn test_apply_synced_card_is_idempotent() {
        let mut site = designer_site();
        let snapshot = CardConfig::new()
            .with_card_id("pg_home")
            .with_title("From Frame");

        site.apply_synced_card(snapshot.clone()).unwrap();
        let first = site.pages[0].to_config();
        site.apply_synced_card(snapshot).unwrap();
        assert_eq!(site.pages[0].to_config(), first);
    }

    #[test]
    fn test_to_config_only_keys_partial_snapshot() {
        let site = designer_site();
        let partial = site.to_config(&["title", "userConfig"]).unwrap();
        let map = partial.as_object().unwrap();

        assert!(map.contains_key("siteId"));
        assert!(map.contains_key("userConfig"));
        assert!(!map.contains_key("pages"));
        assert!(!map.contains_key("themeId"));
    }

    #[test]
    fn test_to_config_stores_only_saved_editor_keys() {
        let mut site = designer_site();
        site.editor.selected_card_id = Some("crd_1".into());
        site.editor.saved_editing_style = Some("quick".into());

        let config = site.to_config(&[]).unwrap();
        assert_eq!(config["editor"]["savedEditingStyle"], json!("quick"));
        assert!(config["editor"].get("selectedCardId").is_none());
    }

    #[test]
    fn test_cleanup_releases_tree() {
        let mut site = designer_site();
        site.cleanup();
        assert!(site.pages.is_empty());
        assert!(site.sections.is_empty());
    }
}
