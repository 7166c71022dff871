//! Card tree: templates, configured instances, and config resolution.

pub mod model;
pub mod template;

pub use model::{Card, CardConfig, CardContext, Location};
pub use template::{
    resolve_template, CardFactory, CardTemplate, ResolvedTemplate, SiteLoadEvent, TemplateConfig,
    TemplateContext, ToCardArgs,
};
