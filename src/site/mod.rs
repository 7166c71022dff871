//! Site aggregate: pages, sections, editor state, and persistence lifecycle.

pub mod layout;
pub mod manager;
pub mod model;
pub mod page;
pub mod region;

pub use layout::{flatten_cards, order_cards, LayoutItem, LayoutOrder};
pub use manager::{ActiveCardHook, ResetUiHook, Site, SiteOptions, UpdateOptions};
pub use model::{EditorState, SiteConfig, SiteMode};
pub use page::SPECIAL_404_ID;
pub use region::AddCardOptions;
