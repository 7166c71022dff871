//! Sitesmith - Configuration-resolution engine for a card-based website builder.
//!
//! A site is a tree of cards bound to templates from a theme. Nothing stores
//! a merged configuration; every effective config is recomputed on read from
//! layered partial configs (theme defaults, template base config, user
//! overrides), so upstream edits propagate without invalidation passes:
//!
//! - **Cascading merge**: objects merge key-wise, arrays and scalars replace
//!   wholesale, later layers win
//! - **Frame sync**: designer and embedded editor frames share a CRDT
//!   document of card/site snapshots, so applies are idempotent
//! - **Draft/publish**: persisted sites keep a draft sidecar that draft
//!   saves merge into and publishing clears
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use sitesmith::card::{CardConfig, CardTemplate};
//! use sitesmith::site::{Site, SiteConfig, SiteMode, SiteOptions};
//! use sitesmith::theme::{Theme, ThemeRegistry};
//!
//! let themes = ThemeRegistry::new(vec![Theme::new("minimal")
//!     .with_templates(vec![
//!         CardTemplate::new("wrap").as_page_card(),
//!         CardTemplate::new("hero").with_user_config(json!({ "heading": "Hello" })),
//!     ])]);
//!
//! let site = Site::create(
//!     SiteConfig::new()
//!         .with_theme_id("minimal")
//!         .with_pages(vec![CardConfig::new().with_slug("_home").as_home()]),
//!     &themes,
//!     SiteOptions { mode: SiteMode::Designer, load_theme_pages: true },
//! )
//! .unwrap();
//!
//! let page_id = site.resolve_page_id(None);
//! let page = site.page_by_id(&page_id);
//! assert!(page.is_home);
//! ```

pub mod card;
pub mod config;
pub mod error;
pub mod frame;
pub mod generation;
pub mod site;
pub mod store;
pub mod theme;

// Re-exports for convenience
pub use card::{Card, CardConfig, CardTemplate};
pub use error::{SiteError, SiteResult};
pub use frame::{FrameDoc, FrameRelation};
pub use generation::CardGeneration;
pub use site::{Site, SiteConfig, SiteMode, SiteOptions};
pub use store::{MemoryStore, SiteStore, StoreScope};
pub use theme::{Theme, ThemeRegistry};
