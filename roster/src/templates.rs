//! Embedded default templates
//!
//! These are compiled into the library from .hbs files. Hosts can override
//! any of them through `SiteConfig` or per-marker attributes.

/// Panel-mode wrapper around a rendered listing
pub const WRAPPER_PANEL: &str = include_str!("../templates/wrapper_panel.hbs");

/// List-mode wrapper around a rendered listing
pub const WRAPPER_LIST: &str = include_str!("../templates/wrapper_list.hbs");

/// Panel-mode listing row for a single person
pub const ITEM_PANEL: &str = include_str!("../templates/item_panel.hbs");

/// List-mode listing row for a single person
pub const ITEM_LIST: &str = include_str!("../templates/item_list.hbs");

/// Standalone card for a single person
pub const CARD: &str = include_str!("../templates/card.hbs");
