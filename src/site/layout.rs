//! Structural reorder of nested cards from a drag-and-drop order tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::card::Card;

/// One entry in a nested layout order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutItem {
    pub item_id: String,
    pub items: Vec<LayoutItem>,
}

impl LayoutItem {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            items: Vec::new(),
        }
    }

    /// Builder: Set nested order.
    pub fn with_items(mut self, items: Vec<LayoutItem>) -> Self {
        self.items = items;
        self
    }
}

/// Region-keyed layout order, as produced by the editor's drag layer.
pub type LayoutOrder = BTreeMap<String, Vec<LayoutItem>>;

/// Reorders `cards` to match `order`, recursing into nested items.
///
/// Ids missing from the order keep their existing relative order and are
/// appended after the ordered ones; ids in the order with no matching card
/// are ignored.
pub fn order_cards(cards: &mut Vec<Card>, order: &[LayoutItem]) {
    let mut remaining = std::mem::take(cards);
    let mut ordered = Vec::with_capacity(remaining.len());

    for item in order {
        if let Some(pos) = remaining.iter().position(|c| c.card_id == item.item_id) {
            let mut card = remaining.remove(pos);
            if !item.items.is_empty() {
                order_cards(&mut card.cards, &item.items);
            }
            ordered.push(card);
        }
    }
    ordered.append(&mut remaining);
    *cards = ordered;
}

/// Flattens a card tree into depth-first references, parents before children.
pub fn flatten_cards(cards: &[Card]) -> Vec<&Card> {
    let mut out = Vec::new();
    for card in cards {
        out.push(card);
        out.extend(flatten_cards(&card.cards));
        out.extend(flatten_cards(&card.effects));
    }
    out
}
