//! Cross-frame bridge between the designer frame and the embedded editor.
//!
//! The channel is an Automerge document rather than raw message passing, so
//! applies are idempotent and no ordering or delivery guarantee is assumed:
//! either side merges whatever it receives, whenever it receives it. Card and
//! site snapshots are stored as JSON strings keyed by id; the documents carry
//! state, not operations.

use std::collections::HashMap;

use automerge::{AutoCommit, ChangeHash};
use autosurgeon::{hydrate, reconcile, Hydrate, Reconcile};

use crate::card::CardConfig;
use crate::error::SiteResult;
use crate::site::SiteConfig;

/// Which side of the frame boundary this document lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameRelation {
    /// Designer frame, authoritative for edits.
    #[default]
    Parent,
    /// Embedded editable frame, mirrors the designer.
    Child,
}

/// Root schema of the bridge document.
///
/// Snapshots are JSON strings: the CRDT resolves per-record conflicts with
/// last-writer-wins, which matches the single-writer-at-a-time editing
/// protocol.
#[derive(Debug, Clone, Default, PartialEq, Reconcile, Hydrate)]
pub struct FrameRoot {
    pub selected_card_id: String,
    pub site: String,
    pub cards: HashMap<String, String>,
}

/// The bridge document for one site session.
pub struct FrameDoc {
    relation: FrameRelation,
    doc: AutoCommit,
    /// Cached hydrated root - invalidated after merges and incremental loads.
    cached_root: Option<FrameRoot>,
}

impl FrameDoc {
    /// Creates an empty bridge document with an initialized schema.
    pub fn new(relation: FrameRelation) -> Self {
        let mut doc = AutoCommit::new();
        let root = FrameRoot::default();
        reconcile(&mut doc, &root).expect("Failed to initialize document");
        Self {
            relation,
            doc,
            cached_root: Some(root),
        }
    }

    /// Creates a bridge document from saved binary data.
    pub fn from_bytes(relation: FrameRelation, bytes: &[u8]) -> SiteResult<Self> {
        let doc = AutoCommit::load(bytes)?;
        Ok(Self {
            relation,
            doc,
            cached_root: None,
        })
    }

    pub fn relation(&self) -> FrameRelation {
        self.relation
    }

    /// Saves the document to binary format.
    pub fn save(&mut self) -> Vec<u8> {
        self.doc.save()
    }

    /// Returns the current heads (for sync protocol).
    pub fn get_heads(&mut self) -> Vec<ChangeHash> {
        self.doc.get_heads()
    }

    /// Hydrates the root schema, cached until the next foreign write.
    fn root(&mut self) -> SiteResult<FrameRoot> {
        if let Some(ref cached) = self.cached_root {
            return Ok(cached.clone());
        }
        let root: FrameRoot = hydrate(&self.doc)?;
        self.cached_root = Some(root.clone());
        Ok(root)
    }

    /// Applies a function to the root, then reconciles back to the document.
    fn update_root<F>(&mut self, f: F) -> SiteResult<()>
    where
        F: FnOnce(&mut FrameRoot),
    {
        let mut root = self.root()?;
        f(&mut root);
        reconcile(&mut self.doc, &root)?;
        self.cached_root = Some(root);
        Ok(())
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Publishes one card's snapshot. Re-publishing an unchanged snapshot
    /// leaves the document untouched.
    pub fn sync_card(&mut self, config: &CardConfig) -> SiteResult<()> {
        let card_id = match &config.card_id {
            Some(id) => id.clone(),
            None => return Ok(()),
        };
        let encoded = serde_json::to_string(config)?;
        if self.root()?.cards.get(&card_id) == Some(&encoded) {
            return Ok(());
        }
        self.update_root(|root| {
            root.cards.insert(card_id, encoded);
        })
    }

    /// Publishes the site-level snapshot.
    pub fn sync_site(&mut self, config: &SiteConfig) -> SiteResult<()> {
        let encoded = serde_json::to_string(config)?;
        if self.root()?.site == encoded {
            return Ok(());
        }
        self.update_root(|root| root.site = encoded)
    }

    /// Publishes the editor's card selection.
    pub fn sync_active_card(&mut self, card_id: &str) -> SiteResult<()> {
        if self.root()?.selected_card_id == card_id {
            return Ok(());
        }
        let card_id = card_id.to_string();
        self.update_root(|root| root.selected_card_id = card_id)
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Reads one card's synced snapshot, if any.
    pub fn card(&mut self, card_id: &str) -> SiteResult<Option<CardConfig>> {
        match self.root()?.cards.get(card_id) {
            Some(encoded) => Ok(Some(serde_json::from_str(encoded)?)),
            None => Ok(None),
        }
    }

    /// Ids of all cards with a synced snapshot.
    pub fn card_ids(&mut self) -> SiteResult<Vec<String>> {
        Ok(self.root()?.cards.keys().cloned().collect())
    }

    /// Reads the synced site snapshot, if any.
    pub fn site_config(&mut self) -> SiteResult<Option<SiteConfig>> {
        let root = self.root()?;
        if root.site.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&root.site)?))
    }

    /// Reads the synced card selection, if any.
    pub fn selected_card_id(&mut self) -> SiteResult<Option<String>> {
        let root = self.root()?;
        if root.selected_card_id.is_empty() {
            return Ok(None);
        }
        Ok(Some(root.selected_card_id))
    }

    // =========================================================================
    // SYNC OPERATIONS
    // =========================================================================

    /// Merges the counterpart frame's document into this one.
    pub fn merge(&mut self, other: &mut Self) -> SiteResult<()> {
        self.cached_root = None;
        self.doc.merge(&mut other.doc)?;
        Ok(())
    }

    /// Generates sync message for incremental sync.
    /// Returns None if there are no changes since their_heads.
    pub fn generate_sync_message(&mut self, their_heads: &[ChangeHash]) -> Option<Vec<u8>> {
        let changes = self.doc.get_changes(their_heads);
        if changes.is_empty() {
            return None;
        }
        let mut bytes = Vec::new();
        for change in changes {
            bytes.extend(change.raw_bytes());
        }
        Some(bytes)
    }

    /// Applies sync message from the counterpart frame.
    pub fn apply_sync_message(&mut self, msg: &[u8]) -> SiteResult<()> {
        self.cached_root = None;
        self.doc.load_incremental(msg)?;
        Ok(())
    }
}

impl Default for FrameDoc {
    fn default() -> Self {
        Self::new(FrameRelation::Parent)
    }
}
