//! Region-level structural mutation: adding and removing cards anywhere in
//! the page/section tree.

use std::collections::BTreeMap;

use crate::card::{Card, CardConfig, CardFactory, CardTemplate, Location};
use crate::error::{SiteError, SiteResult};
use crate::site::page;

/// Placement options for [`add_new_card`].
#[derive(Debug, Clone, Default)]
pub struct AddCardOptions {
    /// Nest inside an existing card instead of a region root.
    pub add_to_card_id: Option<String>,
    /// Target region when adding at the root; defaults to `main`.
    pub region_id: Option<String>,
    pub location: Location,
}

/// Instantiates and inserts a new card, returning its id.
///
/// The config's template must be registered; its static defaults merge
/// beneath the supplied user config before instantiation. Nested adds
/// inherit region and depth from the parent; root adds land in the named
/// region (`main` means a new page).
pub fn add_new_card(
    pages: &mut Vec<Card>,
    sections: &mut BTreeMap<String, Card>,
    templates: &[CardTemplate],
    config: CardConfig,
    options: AddCardOptions,
    page_template_id: &str,
) -> SiteResult<String> {
    let factory = CardFactory::new(templates);
    let config = factory.create(config)?;

    if let Some(parent_id) = &options.add_to_card_id {
        let parent = find_card_mut(pages, sections, parent_id)
            .ok_or_else(|| SiteError::card_not_found(parent_id))?;
        return Ok(parent.add_card(config, options.location));
    }

    let region_id = options.region_id.as_deref().unwrap_or("main");
    if region_id == "main" {
        // same page-card validation as site load, so an add cannot create
        // a page that create() would reject
        let mut added = page::set_pages(vec![config], templates, page_template_id)?;
        let new_page = added
            .pop()
            .ok_or_else(|| SiteError::structure_violation("page instantiation produced no card"))?;
        let card_id = new_page.card_id.clone();
        match options.location {
            Location::Top => pages.insert(0, new_page),
            Location::Bottom => pages.push(new_page),
        }
        return Ok(card_id);
    }

    let section = sections
        .get_mut(region_id)
        .ok_or_else(|| SiteError::structure_violation(format!("no section region {region_id}")))?;
    Ok(section.add_card(config, options.location))
}

/// Removes a card by id from anywhere in the tree.
///
/// A root page can itself be removed; a missing id is a hard error, never a
/// silent no-op.
pub fn remove_card(
    pages: &mut Vec<Card>,
    sections: &mut BTreeMap<String, Card>,
    card_id: &str,
) -> SiteResult<()> {
    if let Some(pos) = pages.iter().position(|p| p.card_id == card_id) {
        let mut page = pages.remove(pos);
        page.cleanup();
        return Ok(());
    }
    for page in pages.iter_mut() {
        if page.remove_card(card_id).is_ok() {
            return Ok(());
        }
    }
    for section in sections.values_mut() {
        if section.remove_card(card_id).is_ok() {
            return Ok(());
        }
    }
    Err(SiteError::card_not_found(card_id))
}

/// Finds a card by id anywhere in the page/section tree.
pub fn find_card<'a>(
    pages: &'a [Card],
    sections: &'a BTreeMap<String, Card>,
    card_id: &str,
) -> Option<&'a Card> {
    pages
        .iter()
        .find_map(|p| p.find_card(card_id))
        .or_else(|| sections.values().find_map(|s| s.find_card(card_id)))
}

/// Mutable variant of [`find_card`].
pub fn find_card_mut<'a>(
    pages: &'a mut Vec<Card>,
    sections: &'a mut BTreeMap<String, Card>,
    card_id: &str,
) -> Option<&'a mut Card> {
    if let Some(found) = pages.iter_mut().find_map(|p| p.find_card_mut(card_id)) {
        return Some(found);
    }
    sections.values_mut().find_map(|s| s.find_card_mut(card_id))
}
