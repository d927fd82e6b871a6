//! Field filtering, template rendering, and listing assembly
//!
//! Templates are expanded with Handlebars against a sanitized field map, and
//! each assembled fragment (listing wrapper, card) is parsed and re-serialized
//! as HTML so a malformed template cannot corrupt page assembly downstream.
//! Listing items are spliced raw into their wrapper before that pass, so
//! table-row item templates survive inside a table-bearing wrapper. All
//! public entry points are fail-open: any failure is logged and yields
//! `None`.

use eyre::{Result, eyre};
use handlebars::Handlebars;
use scraper::Html;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{Mode, Settings};
use crate::registry::{self, PersonRecord};

/// Sanitized field map for template substitution
///
/// `firstname` and `lastname` are always allowed. Every other field present
/// in the record is copied when allowed and nulled otherwise, which
/// suppresses `{{#if}}` blocks without raising unknown-variable errors.
pub fn filter_fields(record: &PersonRecord, allowed: &[String]) -> Map<String, Value> {
    let mut out = Map::new();
    for (name, value) in record.fields() {
        let keep =
            name == "firstname" || name == "lastname" || allowed.iter().any(|f| f == name);
        out.insert(name.clone(), if keep { value.clone() } else { Value::Null });
    }
    out
}

/// Decode the configuration-transport form of a template and trim blank ends
///
/// Custom templates travel through metadata and markup attributes with
/// encoded angle brackets.
fn prepare_template(raw: &str) -> String {
    raw.replace("&gt;", ">")
        .replace("&lt;", "<")
        .trim_matches(|c| matches!(c, '\t' | '\r' | '\n'))
        .to_string()
}

/// Parse and re-serialize an HTML fragment, repairing malformed markup
///
/// Only applied to complete fragments. Body-context parsing drops
/// table-scoped elements, so a complete fragment must not be a bare
/// `<tr>`/`<td>` row; item templates are exempt because their expansions are
/// spliced into the wrapper before this pass runs.
fn tidy_fragment(html: &str) -> String {
    Html::parse_fragment(html).root_element().inner_html()
}

/// Expand a template string against a field map
fn expand_template(template: &str, data: &Map<String, Value>) -> Result<String> {
    let hbs = Handlebars::new();
    let prepared = prepare_template(template);
    hbs.render_template(&prepared, data)
        .map_err(|e| eyre!("template expansion failed: {e}"))
}

/// Expand a template string into a complete, normalized fragment
fn render_fragment(template: &str, data: &Map<String, Value>) -> Result<String> {
    Ok(tidy_fragment(&expand_template(template, data)?))
}

/// CSS class for one listing row
///
/// The list-mode dimming rule is asymmetric on purpose: non-main entries are
/// dimmed only when a main entry exists.
fn item_css(mode: Mode, is_main: bool, main_highlight: bool) -> &'static str {
    match mode {
        Mode::Panel => {
            if is_main {
                "active"
            } else {
                ""
            }
        }
        Mode::List => {
            if !is_main && main_highlight {
                "text-muted"
            } else {
                ""
            }
        }
    }
}

fn listing_item(person: &PersonRecord, settings: &Settings, css: &str) -> Option<String> {
    let mut data = filter_fields(person, &settings.fields);
    data.insert("site_url".to_string(), Value::String(settings.site_url.clone()));
    data.insert("item_css".to_string(), Value::String(css.to_string()));
    // Raw expansion on purpose: the wrapper render normalizes the whole
    // assembly, and tidying rows individually would strip table markup
    match expand_template(settings.templates.item(settings.mode), &data) {
        Ok(html) => Some(html),
        Err(err) => {
            warn!(key = %person.key(), %err, "failed to render listing item");
            None
        }
    }
}

/// Build a full listing fragment, or `None` when there is nothing to show
///
/// Records with a truthy `main` flag always precede the rest; the sort flag
/// reorders the whole collection by identity key before that split, so both
/// groups stay internally sorted.
pub fn generate_listing(settings: &Settings) -> Option<String> {
    debug!(source = ?settings.data_source, set = ?settings.set, mode = %settings.mode, "generate_listing: called");
    let registry = registry::load_or_log(settings.data_source.as_deref())?;
    let collection = registry.collection(settings.set.as_deref());
    if collection.is_empty() {
        debug!("generate_listing: empty collection, nothing to render");
        return None;
    }

    let mut ordered: Vec<(&String, &PersonRecord)> = collection.iter().collect();
    if settings.sort {
        ordered.sort_by(|a, b| a.0.cmp(b.0));
    }

    let mut list = String::from("\n");
    let mut main_highlight = false;
    for (_, person) in ordered.iter().filter(|(_, p)| p.is_main()) {
        let css = item_css(settings.mode, true, false);
        if let Some(item) = listing_item(person, settings, css) {
            list.push_str(&item);
            list.push('\n');
            main_highlight = true;
        }
    }
    for (_, person) in ordered.iter().filter(|(_, p)| !p.is_main()) {
        let css = item_css(settings.mode, false, main_highlight);
        if let Some(item) = listing_item(person, settings, css) {
            list.push_str(&item);
            list.push('\n');
        }
    }
    list.push('\n');

    let mut data = Map::new();
    data.insert("list".to_string(), Value::String(list));
    data.insert(
        "header".to_string(),
        settings.header.clone().map(Value::String).unwrap_or(Value::Null),
    );
    data.insert("site_url".to_string(), Value::String(settings.site_url.clone()));
    data.insert(
        "panel_color".to_string(),
        Value::String(settings.panel_color.clone()),
    );

    match render_fragment(settings.templates.wrapper(settings.mode), &data) {
        Ok(html) => Some(html),
        Err(err) => {
            warn!(%err, "failed to render listing wrapper");
            None
        }
    }
}

/// Build a single-person card fragment, or `None` when the person does not
/// resolve
pub fn generate_person_card(settings: &Settings) -> Option<String> {
    debug!(source = ?settings.data_source, set = ?settings.set, "generate_person_card: called");
    let registry = registry::load_or_log(settings.data_source.as_deref())?;
    let (Some(firstname), Some(lastname)) = (
        settings.person_firstname.as_deref(),
        settings.person_lastname.as_deref(),
    ) else {
        warn!("card render without person-firstname/person-lastname");
        return None;
    };

    let key = registry::identity_key(lastname, firstname);
    let person = match registry.person(settings.set.as_deref(), &key) {
        Ok(person) => person,
        Err(err) => {
            warn!(%key, set = ?settings.set, %err, "failed to resolve person for card");
            return None;
        }
    };

    let mut data = filter_fields(person, &settings.fields);
    data.insert("site_url".to_string(), Value::String(settings.site_url.clone()));
    match render_fragment(&settings.templates.card, &data) {
        Ok(html) => Some(html),
        Err(err) => {
            warn!(%key, %err, "failed to render person card");
            None
        }
    }
}
