//! Page integration
//!
//! The host calls in once per page with the final rendered markup. The page
//! is scanned for marker elements; each marker derives its own settings by
//! overlaying its attributes on the page settings, renders, and is replaced
//! in place. A marker whose render yields nothing is left exactly as
//! authored.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::config::{Settings, SiteConfig};
use crate::render::{generate_listing, generate_person_card};

/// Marker class for listing containers
pub const LISTING_MARKER_CLASS: &str = "roster";

/// Marker class for single-person cards
pub const CARD_MARKER_CLASS: &str = "roster-card";

/// Result of one page pass
#[derive(Debug, Clone, Default)]
pub struct ProcessedPage {
    /// Page markup with markers substituted (input text when nothing changed)
    pub html: String,
    /// Rendered listing for hosts that place it through a template variable
    pub template_variable: Option<String>,
}

/// The plugin entry point a host wires into its page-generation lifecycle
///
/// Built once from site-wide config; every page derives its own isolated
/// `Settings` value, so the plugin itself stays immutable and is safe to
/// share.
#[derive(Debug, Clone)]
pub struct RosterPlugin {
    defaults: Settings,
}

impl RosterPlugin {
    /// Capture site-wide defaults ("site initialized" hook)
    pub fn new(site: &SiteConfig) -> Self {
        Self {
            defaults: Settings::from_site(site),
        }
    }

    /// Site-wide default settings
    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    /// Derive page-scoped settings ("page metadata resolved" hook)
    pub fn page_settings(&self, metadata: &HashMap<String, String>) -> Settings {
        self.defaults.with_page_metadata(metadata)
    }

    /// Scan and rewrite one page ("content finalized" hook)
    pub fn process(&self, settings: &Settings, html: &str) -> ProcessedPage {
        debug!(len = html.len(), "RosterPlugin::process: called");

        let template_variable = if settings.template_variable {
            generate_listing(settings)
        } else {
            None
        };

        let document = Html::parse_fragment(html);
        let (Ok(listing_selector), Ok(card_selector)) = (
            Selector::parse(&format!("div.{LISTING_MARKER_CLASS}")),
            Selector::parse(&format!("div.{CARD_MARKER_CLASS}")),
        ) else {
            warn!("marker selectors failed to parse");
            return ProcessedPage {
                html: html.to_string(),
                template_variable,
            };
        };

        // Pair each marker's serialized form with its replacement; markers
        // that render nothing stay in place
        let mut replacements: Vec<(String, String)> = Vec::new();
        for marker in document.select(&listing_selector) {
            let overlaid = settings.with_marker_attrs(&marker_attrs(&marker));
            if let Some(fragment) = generate_listing(&overlaid) {
                replacements.push((marker.html(), fragment));
            }
        }
        for marker in document.select(&card_selector) {
            let overlaid = settings.with_marker_attrs(&marker_attrs(&marker));
            if let Some(fragment) = generate_person_card(&overlaid) {
                replacements.push((marker.html(), fragment));
            }
        }

        if replacements.is_empty() {
            debug!("RosterPlugin::process: no replacements, page untouched");
            return ProcessedPage {
                html: html.to_string(),
                template_variable,
            };
        }

        // Both sides of each replacement come from the same parsed tree's
        // serializer, so plain substring substitution is exact
        let mut output = document.root_element().inner_html();
        for (original, fragment) in &replacements {
            output = output.replacen(original.as_str(), fragment, 1);
        }
        debug!(count = replacements.len(), "RosterPlugin::process: markers replaced");

        ProcessedPage {
            html: output,
            template_variable,
        }
    }
}

fn marker_attrs(element: &ElementRef) -> HashMap<String, String> {
    element
        .value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}
