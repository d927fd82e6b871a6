//! Roster - personnel listings and cards for static site pipelines
//!
//! Roster is a content-rendering plugin: it reads personnel records from a
//! YAML data file, merges them with optional named sets, and renders HTML
//! fragments (listings, panels, individual cards) by substituting record
//! fields into configurable Handlebars templates. A host site generator
//! invokes it once per page; marker elements in the rendered markup are
//! replaced with generated fragments, and any failure leaves the authored
//! markup untouched.
//!
//! # Core Concepts
//!
//! - **Fail-open rendering**: a missing file, bad set, or unknown person is
//!   logged and the marker stays as authored
//! - **Layered configuration**: compiled defaults < page metadata < marker
//!   attributes, each layer an isolated value
//! - **File order is display order**: registry maps iterate in data-file
//!   order unless a sort is requested
//!
//! # Modules
//!
//! - [`registry`] - YAML data file loading and the personnel registry
//! - [`config`] - settings types and the three-layer overlay
//! - [`render`] - field filtering, template rendering, listing assembly
//! - [`page`] - marker scanning and page rewriting
//! - [`templates`] - embedded default templates

pub mod config;
pub mod page;
pub mod registry;
pub mod render;
pub mod templates;

// Re-export commonly used types
pub use config::{Mode, Settings, SiteConfig, TemplateSet};
pub use page::{CARD_MARKER_CLASS, LISTING_MARKER_CLASS, ProcessedPage, RosterPlugin};
pub use registry::{PersonRecord, Registry, RegistryError, identity_key};
pub use render::{filter_fields, generate_listing, generate_person_card};
