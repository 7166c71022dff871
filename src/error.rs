//! Error types for the site configuration engine.

use thiserror::Error;

/// Result type alias for site operations.
pub type SiteResult<T> = Result<T, SiteError>;

/// Errors that can occur while resolving or mutating a site.
#[derive(Error, Debug)]
pub enum SiteError {
    /// Automerge error during frame document operations.
    #[error("Automerge error: {0}")]
    Automerge(#[from] automerge::AutomergeError),

    /// Autosurgeon hydration error.
    #[error("Hydration error: {0}")]
    Hydrate(#[from] autosurgeon::HydrateError),

    /// Autosurgeon reconcile error.
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] autosurgeon::ReconcileError),

    /// Theme lookup failed during site load.
    #[error("Theme with ID {0} not found")]
    ThemeNotFound(String),

    /// Template lookup failed when instantiating a card.
    #[error("Could not find template with key {0}")]
    TemplateNotFound(String),

    /// Card lookup failed during a structural mutation.
    #[error("Card with ID {0} not found.")]
    CardNotFound(String),

    /// Card/site tree structure is invalid.
    #[error("Structure violation: {0}")]
    StructureViolation(String),

    /// Precondition for an operation was not met (fail fast, before I/O).
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// AI generation preconditions, surfaced verbatim to the editor.
    #[error("{0}")]
    Generation(String),

    /// Persistence endpoint reported a failure.
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SiteError {
    /// Creates a ThemeNotFound error.
    pub fn theme_not_found(id: impl Into<String>) -> Self {
        Self::ThemeNotFound(id.into())
    }

    /// Creates a TemplateNotFound error.
    pub fn template_not_found(id: impl Into<String>) -> Self {
        Self::TemplateNotFound(id.into())
    }

    /// Creates a CardNotFound error.
    pub fn card_not_found(id: impl Into<String>) -> Self {
        Self::CardNotFound(id.into())
    }

    /// Creates a StructureViolation error.
    pub fn structure_violation(msg: impl Into<String>) -> Self {
        Self::StructureViolation(msg.into())
    }

    /// Creates a Precondition error.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Creates a Generation error.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Creates a Store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}
