//! Persisted session configuration.
//!
//! A saved configuration records, for every source and drain of a session, the
//! selection path that located its handler, the handler's serialized entity and
//! the named serialized parameter sets (inlets for sources, outlets for drains).
//!
//! ```json
//! {
//!   "sources": [
//!     {
//!       "name": "nightly",
//!       "selections": ["xray", "test plan"],
//!       "configuration": { "kind": "cloud" },
//!       "inlets": [{ "name": "smoke", "configuration": { "testPlanKey": "ABC-1" } }]
//!     }
//!   ],
//!   "drains": []
//! }
//! ```
//!
//! Older files stored a single parameter set per entry (`inlet` / `outlet`) and
//! sometimes keyed the entity as `source` / `drain`. Those entries are accepted
//! on read and normalized into the named-array form, which is the only form
//! ever written.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name given to the parameter set of a legacy single-parameter entry.
pub const LEGACY_PARAMETER_SET_NAME: &str = "default";

/// A named, serialized parameter set (inlet or outlet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedConfiguration {
    pub name: String,
    #[serde(default)]
    pub configuration: Value,
}

impl NamedConfiguration {
    pub fn new(name: impl Into<String>, configuration: Value) -> Self {
        Self {
            name: name.into(),
            configuration,
        }
    }
}

/// A serialized source together with its selection path and inlets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredSource")]
pub struct SerializedSource {
    pub name: String,
    pub selections: Vec<String>,
    pub configuration: Value,
    pub inlets: Vec<NamedConfiguration>,
}

/// A serialized drain together with its selection path and outlets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredDrain")]
pub struct SerializedDrain {
    pub name: String,
    pub selections: Vec<String>,
    pub configuration: Value,
    pub outlets: Vec<NamedConfiguration>,
}

/// The complete document written to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedConfiguration {
    #[serde(default)]
    pub sources: Vec<SerializedSource>,
    #[serde(default)]
    pub drains: Vec<SerializedDrain>,
}

/// On-disk source entry, accepting both the current and the legacy layout.
#[derive(Deserialize)]
struct StoredSource {
    #[serde(default)]
    name: Option<String>,
    selections: Vec<String>,
    #[serde(default, alias = "source")]
    configuration: Value,
    #[serde(default)]
    inlets: Option<Vec<NamedConfiguration>>,
    #[serde(default)]
    inlet: Option<Value>,
}

/// On-disk drain entry, accepting both the current and the legacy layout.
#[derive(Deserialize)]
struct StoredDrain {
    #[serde(default)]
    name: Option<String>,
    selections: Vec<String>,
    #[serde(default, alias = "drain")]
    configuration: Value,
    #[serde(default)]
    outlets: Option<Vec<NamedConfiguration>>,
    #[serde(default)]
    outlet: Option<Value>,
}

impl From<StoredSource> for SerializedSource {
    fn from(stored: StoredSource) -> Self {
        Self {
            name: entry_name(stored.name, &stored.selections),
            inlets: parameter_sets(stored.inlets, stored.inlet),
            selections: stored.selections,
            configuration: stored.configuration,
        }
    }
}

impl From<StoredDrain> for SerializedDrain {
    fn from(stored: StoredDrain) -> Self {
        Self {
            name: entry_name(stored.name, &stored.selections),
            outlets: parameter_sets(stored.outlets, stored.outlet),
            selections: stored.selections,
            configuration: stored.configuration,
        }
    }
}

fn entry_name(name: Option<String>, selections: &[String]) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => name,
        _ => selections.join(" / "),
    }
}

fn parameter_sets(named: Option<Vec<NamedConfiguration>>, single: Option<Value>) -> Vec<NamedConfiguration> {
    match (named, single) {
        (Some(named), _) => named,
        (None, Some(single)) => vec![NamedConfiguration::new(LEGACY_PARAMETER_SET_NAME, single)],
        (None, None) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn named_array_layout_is_read_as_is() {
        let document = json!({
            "sources": [{
                "name": "nightly",
                "selections": ["xray", "test plan"],
                "configuration": {"kind": "cloud"},
                "inlets": [
                    {"name": "smoke", "configuration": {"testPlanKey": "ABC-1"}},
                    {"name": "regression", "configuration": {"testPlanKey": "ABC-2"}}
                ]
            }],
            "drains": [{
                "name": "console",
                "selections": ["stdout"],
                "configuration": {},
                "outlets": [{"name": "plain", "configuration": {"useColor": false, "useUnicode": true}}]
            }]
        });
        let config: PersistedConfiguration = serde_json::from_value(document).unwrap();
        assert_eq!(config.sources[0].inlets.len(), 2);
        assert_eq!(config.sources[0].inlets[1].name, "regression");
        assert_eq!(config.drains[0].outlets[0].configuration["useUnicode"], json!(true));
    }

    #[test]
    fn legacy_single_parameter_entries_are_normalized() {
        let document = json!({
            "sources": [{
                "selections": ["xray", "test plan"],
                "source": {"kind": "server"},
                "inlet": {"testPlanKey": "ABC-1"}
            }],
            "drains": [{
                "selections": ["microsoft", "teams"],
                "drain": {},
                "outlet": {}
            }]
        });
        let config: PersistedConfiguration = serde_json::from_value(document).unwrap();
        let source = &config.sources[0];
        assert_eq!(source.name, "xray / test plan");
        assert_eq!(source.configuration, json!({"kind": "server"}));
        assert_eq!(source.inlets, vec![NamedConfiguration::new("default", json!({"testPlanKey": "ABC-1"}))]);
        assert_eq!(config.drains[0].outlets.len(), 1);
    }

    #[test]
    fn writes_only_the_named_array_layout() {
        let config = PersistedConfiguration {
            sources: vec![SerializedSource {
                name: "nightly".into(),
                selections: vec!["xray".into(), "test plan".into()],
                configuration: json!({"kind": "cloud"}),
                inlets: vec![NamedConfiguration::new("smoke", json!({"testPlanKey": "ABC-1"}))],
            }],
            drains: Vec::new(),
        };
        let written = serde_json::to_value(&config).unwrap();
        assert!(written["sources"][0].get("inlet").is_none());
        let reread: PersistedConfiguration = serde_json::from_value(written).unwrap();
        assert_eq!(reread, config);
    }
}
