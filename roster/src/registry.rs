//! Personnel registry loading
//!
//! Reads a YAML data file into an in-memory registry: an ordered base roster
//! plus named sets whose members overlay extra fields on top of base records.
//! Loading is a pure function of the file contents; every failure is typed.

use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Fields ending in this suffix encode `label[,url]` entries joined by `;`
pub const LINK_LIST_SUFFIX: &str = "_list";

/// Errors raised while loading or querying the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Source path unset, or no file at the path
    #[error("personnel data file not found [{path}]")]
    NotFound { path: String },

    /// File exists but does not parse into the expected shape
    #[error("failed to parse personnel data file [{path}]: {reason}")]
    Parse { path: String, reason: String },

    /// A set member does not resolve against the base roster
    #[error("failed to form set [{set}], person not found [firstname={firstname}, lastname={lastname}]")]
    SetResolution {
        set: String,
        firstname: String,
        lastname: String,
    },

    /// Card lookup missed
    #[error("person not found [{key}]")]
    Lookup { key: String },
}

/// Identity key for a person, assumed unique across the roster
pub fn identity_key(lastname: &str, firstname: &str) -> String {
    format!("{}-{}", lastname.to_lowercase(), firstname.to_lowercase())
}

/// One person's data fields
///
/// A loosely-typed field map with required string fields `firstname` and
/// `lastname`. Link-list fields are normalized to display strings at
/// construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonRecord {
    fields: Map<String, Value>,
}

impl PersonRecord {
    /// Build a record from one YAML entry, validating the required name
    /// fields and normalizing link-list fields
    fn from_yaml(entry: &serde_yaml::Value, path: &str) -> Result<Self, RegistryError> {
        let value = serde_json::to_value(entry).map_err(|e| RegistryError::Parse {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let Value::Object(mut fields) = value else {
            return Err(RegistryError::Parse {
                path: path.to_string(),
                reason: "personnel entry is not a mapping".to_string(),
            });
        };
        for name in ["firstname", "lastname"] {
            if !fields.get(name).is_some_and(Value::is_string) {
                return Err(RegistryError::Parse {
                    path: path.to_string(),
                    reason: format!("personnel entry is missing a string `{name}` field"),
                });
            }
        }
        normalize_link_lists(&mut fields);
        Ok(Self { fields })
    }

    pub fn firstname(&self) -> &str {
        self.fields.get("firstname").and_then(Value::as_str).unwrap_or("")
    }

    pub fn lastname(&self) -> &str {
        self.fields.get("lastname").and_then(Value::as_str).unwrap_or("")
    }

    /// `lowercase(lastname)-lowercase(firstname)`
    pub fn key(&self) -> String {
        identity_key(self.lastname(), self.firstname())
    }

    /// Whether the `main` flag is truthy (highlighted in listings)
    pub fn is_main(&self) -> bool {
        self.fields.get("main").is_some_and(is_truthy)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Base record with an override record's fields overlaid on top
    ///
    /// Both sides are already normalized, so the merge is a plain overwrite;
    /// overlay fields win.
    fn merged_with(&self, overlay: &PersonRecord) -> PersonRecord {
        let mut fields = self.fields.clone();
        for (name, value) in &overlay.fields {
            fields.insert(name.clone(), value.clone());
        }
        PersonRecord { fields }
    }
}

/// In-memory personnel registry
///
/// Iteration order of both maps follows the data file, which is the display
/// order when no explicit sort is requested.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Base roster, identity key -> record
    pub personnel: IndexMap<String, PersonRecord>,
    /// Named sets, each an identity-keyed map of merged records
    pub sets: IndexMap<String, IndexMap<String, PersonRecord>>,
}

impl Registry {
    /// Load the registry from a YAML file
    ///
    /// The document may wrap its content under a top-level `data` key. A set
    /// member that does not resolve against the base roster fails the whole
    /// load; there is no partial registry.
    pub fn load(path: &str) -> Result<Self, RegistryError> {
        debug!(%path, "Registry::load: called");
        if path.is_empty() || !Path::new(path).is_file() {
            return Err(RegistryError::NotFound {
                path: path.to_string(),
            });
        }

        let parse_err = |reason: String| RegistryError::Parse {
            path: path.to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| parse_err(e.to_string()))?;
        let mut document: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?;
        if let Some(inner) = document.get("data") {
            debug!("Registry::load: descending into `data` key");
            document = inner.clone();
        }
        if !document.is_mapping() {
            return Err(parse_err("top-level document is not a mapping".to_string()));
        }

        let mut personnel = IndexMap::new();
        if let Some(entries) = document.get("personnel") {
            let entries = entries
                .as_sequence()
                .ok_or_else(|| parse_err("`personnel` is not a sequence".to_string()))?;
            for entry in entries {
                let record = PersonRecord::from_yaml(entry, path)?;
                // Later entries silently overwrite earlier ones sharing a key
                personnel.insert(record.key(), record);
            }
        }
        debug!(count = personnel.len(), "Registry::load: base roster loaded");

        let mut sets = IndexMap::new();
        if let Some(raw_sets) = document.get("sets") {
            let raw_sets = raw_sets
                .as_mapping()
                .ok_or_else(|| parse_err("`sets` is not a mapping".to_string()))?;
            for (name, members) in raw_sets {
                let name = name
                    .as_str()
                    .ok_or_else(|| parse_err("set name is not a string".to_string()))?;
                let members = members
                    .as_sequence()
                    .ok_or_else(|| parse_err(format!("set [{name}] is not a sequence")))?;
                let mut resolved = IndexMap::new();
                for member in members {
                    let overlay = PersonRecord::from_yaml(member, path)?;
                    let base = personnel.get(&overlay.key()).ok_or_else(|| {
                        RegistryError::SetResolution {
                            set: name.to_string(),
                            firstname: overlay.firstname().to_string(),
                            lastname: overlay.lastname().to_string(),
                        }
                    })?;
                    let merged = base.merged_with(&overlay);
                    resolved.insert(merged.key(), merged);
                }
                debug!(set = %name, count = resolved.len(), "Registry::load: set resolved");
                sets.insert(name.to_string(), resolved);
            }
        }

        Ok(Self { personnel, sets })
    }

    /// Working record collection for a render call: the named set when it
    /// exists, the base roster otherwise
    pub fn collection(&self, set: Option<&str>) -> &IndexMap<String, PersonRecord> {
        match set.and_then(|name| self.sets.get(name)) {
            Some(records) => records,
            None => &self.personnel,
        }
    }

    /// Resolve one person by identity key, preferring the named set
    pub fn person(&self, set: Option<&str>, key: &str) -> Result<&PersonRecord, RegistryError> {
        self.collection(set)
            .get(key)
            .ok_or_else(|| RegistryError::Lookup {
                key: key.to_string(),
            })
    }
}

/// Load boundary for render paths: any failure becomes a diagnostic plus
/// `None`, which callers treat as "leave authored markup untouched"
pub fn load_or_log(source: Option<&str>) -> Option<Registry> {
    let path = source.unwrap_or("");
    match Registry::load(path) {
        Ok(registry) => Some(registry),
        Err(err) => {
            warn!(%path, %err, "failed to load personnel registry");
            None
        }
    }
}

/// Rewrite every `*_list` field into a joined display string
///
/// Raw form: entries separated by `;` (or a YAML sequence), each entry
/// `label[,url]`. Two-part entries become anchors, one-part entries stay
/// bare text; entries are joined with `, `.
fn normalize_link_lists(fields: &mut Map<String, Value>) {
    for (name, value) in fields.iter_mut() {
        if !name.ends_with(LINK_LIST_SUFFIX) {
            continue;
        }
        let entries: Vec<String> = match &*value {
            Value::Array(items) => items.iter().map(|v| value_text(v).trim().to_string()).collect(),
            other => value_text(other)
                .split(';')
                .map(|s| s.trim().to_string())
                .collect(),
        };
        let mut rendered = Vec::with_capacity(entries.len());
        for entry in &entries {
            let parts: Vec<&str> = entry.split(',').map(str::trim).collect();
            if parts.len() == 2 {
                rendered.push(format!(
                    "<a class=\"text\" href=\"{}\">{}</a>",
                    parts[1], parts[0]
                ));
            } else {
                rendered.push(parts.first().copied().unwrap_or("").to_string());
            }
        }
        *value = Value::String(rendered.join(", "));
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Python-style truthiness used for the `main` flag
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_data(dir: &TempDir, content: &str) -> String {
        let path = dir.path().join("personnel.yml");
        let mut file = std::fs::File::create(&path).expect("Failed to create data file");
        file.write_all(content.as_bytes()).expect("Failed to write data file");
        path.to_string_lossy().into_owned()
    }

    const BASIC: &str = "\
personnel:
  - firstname: Jane
    lastname: Doe
    title: Director
    main: true
    project_list: \"Alpha,https://alpha.example;Beta\"
  - firstname: John
    lastname: Smith
    email: john@example.org
sets:
  committee:
    - firstname: Jane
      lastname: Doe
      title: Chair
";

    #[test]
    fn test_load_indexes_by_identity_key() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_data(&dir, BASIC);
        let registry = Registry::load(&path).expect("load should succeed");

        let jane = &registry.personnel["doe-jane"];
        assert_eq!(jane.firstname(), "Jane");
        assert_eq!(jane.lastname(), "Doe");
        assert!(jane.is_main());

        let john = &registry.personnel["smith-john"];
        assert_eq!(john.firstname(), "John");
        assert!(!john.is_main());
    }

    #[test]
    fn test_link_list_normalization() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_data(&dir, BASIC);
        let registry = Registry::load(&path).expect("load should succeed");

        let projects = registry.personnel["doe-jane"]
            .get("project_list")
            .and_then(Value::as_str)
            .expect("project_list should be a string");
        assert_eq!(
            projects,
            "<a class=\"text\" href=\"https://alpha.example\">Alpha</a>, Beta"
        );
    }

    #[test]
    fn test_link_list_from_sequence() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_data(
            &dir,
            "personnel:\n  - firstname: Jane\n    lastname: Doe\n    project_list:\n      - \"Alpha,u1\"\n      - Beta\n",
        );
        let registry = Registry::load(&path).expect("load should succeed");
        let projects = registry.personnel["doe-jane"]
            .get("project_list")
            .and_then(Value::as_str)
            .expect("project_list should be a string");
        assert_eq!(projects, "<a class=\"text\" href=\"u1\">Alpha</a>, Beta");
    }

    #[test]
    fn test_data_key_unwrapping() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_data(
            &dir,
            "data:\n  personnel:\n    - firstname: Jane\n      lastname: Doe\n",
        );
        let registry = Registry::load(&path).expect("load should succeed");
        assert!(registry.personnel.contains_key("doe-jane"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        assert!(matches!(
            Registry::load("/nonexistent/personnel.yml"),
            Err(RegistryError::NotFound { .. })
        ));
        assert!(matches!(
            Registry::load(""),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_data(&dir, "personnel: [unterminated");
        assert!(matches!(
            Registry::load(&path),
            Err(RegistryError::Parse { .. })
        ));
    }

    #[test]
    fn test_record_without_lastname_is_parse_error() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_data(&dir, "personnel:\n  - firstname: Jane\n");
        assert!(matches!(
            Registry::load(&path),
            Err(RegistryError::Parse { .. })
        ));
    }

    #[test]
    fn test_set_overlay_wins_without_touching_base() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_data(&dir, BASIC);
        let registry = Registry::load(&path).expect("load should succeed");

        let merged = &registry.sets["committee"]["doe-jane"];
        assert_eq!(merged.get("title").and_then(Value::as_str), Some("Chair"));
        // Base fields survive the overlay, base record itself is untouched
        assert!(merged.is_main());
        assert_eq!(
            registry.personnel["doe-jane"].get("title").and_then(Value::as_str),
            Some("Director")
        );
    }

    #[test]
    fn test_merged_link_list_is_not_mangled() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_data(&dir, BASIC);
        let registry = Registry::load(&path).expect("load should succeed");

        // The base record's already-normalized list must come through the
        // merge verbatim, not be re-split on its commas
        let projects = registry.sets["committee"]["doe-jane"]
            .get("project_list")
            .and_then(Value::as_str)
            .expect("project_list should be a string");
        assert_eq!(
            projects,
            "<a class=\"text\" href=\"https://alpha.example\">Alpha</a>, Beta"
        );
    }

    #[test]
    fn test_unknown_set_member_fails_whole_load() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_data(
            &dir,
            "personnel:\n  - firstname: Jane\n    lastname: Doe\nsets:\n  committee:\n    - firstname: Ghost\n      lastname: Writer\n",
        );
        match Registry::load(&path) {
            Err(RegistryError::SetResolution { set, firstname, lastname }) => {
                assert_eq!(set, "committee");
                assert_eq!(firstname, "Ghost");
                assert_eq!(lastname, "Writer");
            }
            other => panic!("expected SetResolution, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_key_overwrites() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_data(
            &dir,
            "personnel:\n  - firstname: Jane\n    lastname: Doe\n    title: First\n  - firstname: Jane\n    lastname: Doe\n    title: Second\n",
        );
        let registry = Registry::load(&path).expect("load should succeed");
        assert_eq!(registry.personnel.len(), 1);
        assert_eq!(
            registry.personnel["doe-jane"].get("title").and_then(Value::as_str),
            Some("Second")
        );
    }

    #[test]
    fn test_person_lookup() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_data(&dir, BASIC);
        let registry = Registry::load(&path).expect("load should succeed");

        assert!(registry.person(None, "doe-jane").is_ok());
        assert!(registry.person(Some("committee"), "doe-jane").is_ok());
        // Unknown set falls back to the base roster
        assert!(registry.person(Some("nope"), "smith-john").is_ok());
        // John is not on the committee
        assert!(matches!(
            registry.person(Some("committee"), "smith-john"),
            Err(RegistryError::Lookup { .. })
        ));
    }

    #[test]
    fn test_load_or_log_boundary() {
        assert!(load_or_log(None).is_none());
        assert!(load_or_log(Some("/nonexistent/personnel.yml")).is_none());
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(&Value::Bool(true)));
        assert!(is_truthy(&Value::String("yes".to_string())));
        assert!(!is_truthy(&Value::Bool(false)));
        assert!(!is_truthy(&Value::String(String::new())));
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&serde_json::json!(0)));
        assert!(is_truthy(&serde_json::json!(1)));
    }
}
