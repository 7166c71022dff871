//! Page routing utilities: view map, lookup, and the 404 fallback.

use std::collections::BTreeMap;

use serde_json::json;

use crate::card::{resolve_template, Card, CardConfig, CardContext, CardTemplate};
use crate::error::{SiteError, SiteResult};

/// Card id of the synthetic fallback page.
pub const SPECIAL_404_ID: &str = "_special404";

/// Builds the slug → card-id routing table for a set of pages.
///
/// Pages without a slug are unroutable and skipped. The designated home
/// page claims the `_home` key and a bare `_` alias; the designated error
/// page claims `_404`.
pub fn get_view_map(pages: &[Card]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for page in pages {
        if let Some(slug) = &page.slug {
            map.insert(slug.clone(), page.card_id.clone());
        }
        if page.is_home {
            map.insert("_home".to_string(), page.card_id.clone());
            map.insert("_".to_string(), page.card_id.clone());
        }
        if page.is_404 {
            map.insert("_404".to_string(), page.card_id.clone());
        }
    }
    map
}

/// Resolves a requested view id to a page card id.
///
/// No view id means home. An unroutable view falls back to the designated
/// 404 page, then to the synthetic fallback id.
pub fn get_active_page_id(view_map: &BTreeMap<String, String>, view_id: Option<&str>) -> String {
    let view_id = view_id.unwrap_or("_home");
    view_map
        .get(view_id)
        .or_else(|| view_map.get("_404"))
        .cloned()
        .unwrap_or_else(|| SPECIAL_404_ID.to_string())
}

/// Synthetic page served when a page id resolves to nothing.
pub fn special_404_card() -> Card {
    Card::from_config(
        CardConfig {
            card_id: Some(SPECIAL_404_ID.to_string()),
            title: Some("404".to_string()),
            is_404: Some(true),
            cards: Some(vec![CardConfig {
                template_id: Some("404".to_string()),
                user_config: Some(json!({ "heading": "Nothing here" })),
                ..Default::default()
            }]),
            ..Default::default()
        },
        CardContext::default(),
    )
}

/// Finds a page by id, falling back to the synthetic 404 page.
pub fn get_page_by_id(pages: &[Card], page_id: &str) -> Card {
    pages
        .iter()
        .find(|p| p.card_id == page_id)
        .cloned()
        .unwrap_or_else(special_404_card)
}

/// Instantiates page cards from portable configs.
///
/// Root cards in the `main` region must resolve to a page-capable template;
/// anything else is a structural defect surfaced to the caller.
pub fn set_pages(
    configs: Vec<CardConfig>,
    templates: &[CardTemplate],
    page_template_id: &str,
) -> SiteResult<Vec<Card>> {
    let mut pages = Vec::with_capacity(configs.len());
    for config in configs {
        let page = Card::from_config(
            config,
            CardContext {
                page_template_id: Some(page_template_id.to_string()),
                ..Default::default()
            },
        );
        if page.region_id == "main" {
            if let Some(resolved) = resolve_template(&page, templates) {
                if !resolved.get().is_page_card {
                    return Err(SiteError::structure_violation(format!(
                        "template {} is not a page card (card {})",
                        resolved.template_id(),
                        page.card_id
                    )));
                }
            }
        }
        pages.push(page);
    }
    Ok(pages)
}

/// Upserts one page: updates in place by id, or appends a new page.
pub fn update_page(
    pages: &mut Vec<Card>,
    config: CardConfig,
    templates: &[CardTemplate],
    page_template_id: &str,
) -> SiteResult<String> {
    if let Some(existing) = config
        .card_id
        .as_deref()
        .and_then(|id| pages.iter_mut().find(|p| p.card_id == id))
    {
        existing.update(config);
        return Ok(existing.card_id.clone());
    }
    let mut added = set_pages(vec![config], templates, page_template_id)?;
    let page = added
        .pop()
        .ok_or_else(|| SiteError::structure_violation("page instantiation produced no card"))?;
    let card_id = page.card_id.clone();
    pages.push(page);
    Ok(card_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardConfig;

    fn pages() -> Vec<Card> {
        set_pages(
            vec![
                CardConfig::new().with_card_id("pg_home").with_slug("_home").as_home(),
                CardConfig::new().with_card_id("pg_about").with_slug("about"),
                CardConfig {
                    card_id: Some("pg_404".into()),
                    slug: Some("not-found".into()),
                    is_404: Some(true),
                    ..Default::default()
                },
                CardConfig::new().with_card_id("pg_noslug"),
            ],
            &[],
            "wrap",
        )
        .unwrap()
    }

    #[test]
    fn test_view_map_slugs_and_special_keys() {
        let map = get_view_map(&pages());

        assert_eq!(map.get("about").map(String::as_str), Some("pg_about"));
        assert_eq!(map.get("_home").map(String::as_str), Some("pg_home"));
        assert_eq!(map.get("_").map(String::as_str), Some("pg_home"));
        assert_eq!(map.get("_404").map(String::as_str), Some("pg_404"));
        // slugless pages are unroutable
        assert!(!map.values().any(|id| id == "pg_noslug"));
    }

    #[test]
    fn test_active_page_id_fallback_chain() {
        let map = get_view_map(&pages());
        assert_eq!(get_active_page_id(&map, None), "pg_home");
        assert_eq!(get_active_page_id(&map, Some("about")), "pg_about");
        assert_eq!(get_active_page_id(&map, Some("missing")), "pg_404");

        let empty = BTreeMap::new();
        assert_eq!(get_active_page_id(&empty, Some("missing")), SPECIAL_404_ID);
    }

    #[test]
    fn test_page_by_id_synthesizes_404() {
        let found = get_page_by_id(&pages(), "pg_about");
        assert_eq!(found.card_id, "pg_about");

        let missing = get_page_by_id(&pages(), "pg_ghost");
        assert_eq!(missing.card_id, SPECIAL_404_ID);
        assert_eq!(missing.title.as_deref(), Some("404"));
        assert!(missing.is_404);
        assert_eq!(missing.cards[0].template_id, "404");
        assert_eq!(
            missing.cards[0].user_config["heading"],
            serde_json::json!("Nothing here")
        );
    }

    #[test]
    fn test_set_pages_rejects_non_page_template() {
        let templates = vec![crate::card::CardTemplate::new("hero")];
        let err = set_pages(
            vec![CardConfig::new().with_template_id("hero")],
            &templates,
            "wrap",
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a page card"));
    }

    #[test]
    fn test_update_page_upserts() {
        let mut pages = pages();
        update_page(
            &mut pages,
            CardConfig::new().with_card_id("pg_about").with_title("About Us"),
            &[],
            "wrap",
        )
        .unwrap();
        assert_eq!(
            pages.iter().find(|p| p.card_id == "pg_about").unwrap().title.as_deref(),
            Some("About Us")
        );

        let new_id = update_page(
            &mut pages,
            CardConfig::new().with_slug("contact"),
            &[],
            "wrap",
        )
        .unwrap();
        assert!(pages.iter().any(|p| p.card_id == new_id));
    }
}
