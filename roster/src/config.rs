//! Configuration and the three-layer settings overlay
//!
//! Effective render settings are built by layering three sources in
//! increasing priority: compiled-in defaults (plus site-wide config), page
//! metadata, and marker-element attributes. Each layer produces a fresh
//! `Settings` value; nothing is shared or mutated in place.

use std::collections::HashMap;
use std::path::Path;

use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::templates;

/// Render mode selecting the wrapper/item template pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Panel,
    List,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Panel => write!(f, "panel"),
            Self::List => write!(f, "list"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "panel" => Ok(Self::Panel),
            "list" => Ok(Self::List),
            other => Err(eyre!("unknown render mode: {other}")),
        }
    }
}

/// The five template strings a render call can draw from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSet {
    pub wrapper_panel: String,
    pub wrapper_list: String,
    pub item_panel: String,
    pub item_list: String,
    pub card: String,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self {
            wrapper_panel: templates::WRAPPER_PANEL.to_string(),
            wrapper_list: templates::WRAPPER_LIST.to_string(),
            item_panel: templates::ITEM_PANEL.to_string(),
            item_list: templates::ITEM_LIST.to_string(),
            card: templates::CARD.to_string(),
        }
    }
}

impl TemplateSet {
    /// Wrapper template for the given mode
    pub fn wrapper(&self, mode: Mode) -> &str {
        match mode {
            Mode::Panel => &self.wrapper_panel,
            Mode::List => &self.wrapper_list,
        }
    }

    /// Item template for the given mode
    pub fn item(&self, mode: Mode) -> &str {
        match mode {
            Mode::Panel => &self.item_panel,
            Mode::List => &self.item_list,
        }
    }

    fn set_wrapper(&mut self, mode: Mode, template: String) {
        match mode {
            Mode::Panel => self.wrapper_panel = template,
            Mode::List => self.wrapper_list = template,
        }
    }

    fn set_item(&mut self, mode: Mode, template: String) {
        match mode {
            Mode::Panel => self.item_panel = template,
            Mode::List => self.item_list = template,
        }
    }
}

/// Site-wide defaults captured once at site initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL prepended to relative asset paths (photos)
    pub site_url: String,

    /// Default personnel data file
    pub data_source: Option<String>,

    /// Default listing header text
    pub header: Option<String>,

    /// Default panel color class
    pub panel_color: String,

    /// Default sort flag
    pub sort: bool,

    /// Template overrides; missing entries keep the embedded defaults
    pub templates: TemplateSet,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            data_source: None,
            header: Some("Personnel".to_string()),
            panel_color: "panel-default".to_string(),
            sort: false,
            templates: TemplateSet::default(),
        }
    }
}

impl SiteConfig {
    /// Load site config from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Effective configuration for one render call
#[derive(Debug, Clone)]
pub struct Settings {
    /// Personnel data file path
    pub data_source: Option<String>,
    /// Named subset to render instead of the base roster
    pub set: Option<String>,
    /// Render mode
    pub mode: Mode,
    /// Listing header text
    pub header: Option<String>,
    /// Panel color class
    pub panel_color: String,
    /// Field allow-list; `firstname`/`lastname` are always implied
    pub fields: Vec<String>,
    /// Sort the collection by identity key before rendering
    pub sort: bool,
    /// Site base URL
    pub site_url: String,
    /// Attach the rendered listing as a page template variable
    pub template_variable: bool,
    /// Card target, first name
    pub person_firstname: Option<String>,
    /// Card target, last name
    pub person_lastname: Option<String>,
    /// Active template strings
    pub templates: TemplateSet,
}

impl Settings {
    /// Defaults layer: compiled-in values plus site-wide config
    pub fn from_site(site: &SiteConfig) -> Self {
        Self {
            data_source: site.data_source.clone(),
            set: None,
            mode: Mode::default(),
            header: site.header.clone(),
            panel_color: site.panel_color.clone(),
            fields: Vec::new(),
            sort: site.sort,
            site_url: site.site_url.clone(),
            template_variable: false,
            person_firstname: None,
            person_lastname: None,
            templates: site.templates.clone(),
        }
    }

    /// Page metadata layer
    ///
    /// Recognized keys: `roster` (activation flag), `roster_source`,
    /// `roster_set`, `roster_mode`, `roster_header`, `roster_panel_color`,
    /// `roster_fields`, `roster_sort`, `roster_template`,
    /// `roster_item_template`, `roster_card_template`. The mode key is
    /// applied before the template keys so overrides target the resolved
    /// mode.
    pub fn with_page_metadata(&self, metadata: &HashMap<String, String>) -> Settings {
        let mut next = self.clone();
        if let Some(raw) = metadata.get("roster") {
            next.template_variable = parse_flag(raw);
        }
        if let Some(source) = metadata.get("roster_source") {
            next.data_source = Some(source.clone());
        }
        if let Some(set) = metadata.get("roster_set") {
            next.set = Some(set.clone());
        }
        if let Some(raw) = metadata.get("roster_mode") {
            next.apply_mode(raw);
        }
        if let Some(header) = metadata.get("roster_header") {
            next.header = Some(header.clone());
        }
        if let Some(color) = metadata.get("roster_panel_color") {
            next.panel_color = color.clone();
        }
        if let Some(raw) = metadata.get("roster_fields") {
            next.fields = parse_fields(raw);
        }
        // The metadata flag only ever turns sorting on
        if metadata.get("roster_sort").is_some_and(|raw| parse_flag(raw)) {
            next.sort = true;
        }
        if let Some(template) = metadata.get("roster_template") {
            next.templates.set_wrapper(next.mode, template.clone());
        }
        if let Some(template) = metadata.get("roster_item_template") {
            next.templates.set_item(next.mode, template.clone());
        }
        if let Some(template) = metadata.get("roster_card_template") {
            next.templates.card = template.clone();
        }
        next
    }

    /// Marker attribute layer
    ///
    /// Attributes use the `data-` namespace prefix. The mode attribute is
    /// applied first so that `data-template`/`data-item-template` target the
    /// resolved mode.
    ///
    /// `data-sort` is deliberately tri-state: a present value sets the flag
    /// either way (case-insensitive `"true"` means on, anything else off),
    /// while an absent attribute inherits the page-level flag rather than
    /// resetting it.
    pub fn with_marker_attrs(&self, attrs: &HashMap<String, String>) -> Settings {
        let mut next = self.clone();
        if let Some(raw) = attrs.get("data-mode") {
            next.apply_mode(raw);
        }
        if let Some(source) = attrs.get("data-source") {
            next.data_source = Some(source.clone());
        }
        if let Some(set) = attrs.get("data-set") {
            next.set = Some(set.clone());
        }
        if let Some(header) = attrs.get("data-header") {
            next.header = Some(header.clone());
        }
        if let Some(color) = attrs.get("data-panel-color") {
            next.panel_color = color.clone();
        }
        if let Some(raw) = attrs.get("data-fields") {
            next.fields = parse_fields(raw);
        }
        // A present sort attribute wins either way; absent inherits
        if let Some(raw) = attrs.get("data-sort") {
            next.sort = parse_flag(raw);
        }
        if let Some(template) = attrs.get("data-template") {
            next.templates.set_wrapper(next.mode, template.clone());
        }
        if let Some(template) = attrs.get("data-item-template") {
            next.templates.set_item(next.mode, template.clone());
        }
        if let Some(template) = attrs.get("data-card-template") {
            next.templates.card = template.clone();
        }
        if let Some(firstname) = attrs.get("data-person-firstname") {
            next.person_firstname = Some(firstname.clone());
        }
        if let Some(lastname) = attrs.get("data-person-lastname") {
            next.person_lastname = Some(lastname.clone());
        }
        next
    }

    fn apply_mode(&mut self, raw: &str) {
        match raw.parse::<Mode>() {
            Ok(mode) => self.mode = mode,
            Err(err) => warn!(%err, "ignoring invalid render mode"),
        }
    }
}

/// Case-insensitive `"true"` check used by the sort and activation flags
pub(crate) fn parse_flag(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}

/// Comma-separated field allow-list
pub(crate) fn parse_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
