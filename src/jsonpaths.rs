//! JSONPaths file generation
//!
//! A COPY ... JSON 's3://.../file.jsonpaths' load maps each JSON path in the
//! file, in order, to the target table's columns. The paths are derived from
//! a sample document.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contents of a `.jsonpaths` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonPaths {
    pub jsonpaths: Vec<String>,
}

impl JsonPaths {
    /// Wrap an explicit list of paths
    pub fn new(paths: Vec<String>) -> Self {
        Self { jsonpaths: paths }
    }

    /// Number of paths (and therefore target columns)
    pub fn len(&self) -> usize {
        self.jsonpaths.len()
    }

    /// Whether there are no paths
    pub fn is_empty(&self) -> bool {
        self.jsonpaths.is_empty()
    }

    /// Serialize as the JSON document Redshift expects
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Derive JSONPaths from a sample document
///
/// Object keys are visited in sorted order and nested objects are walked
/// recursively. Arrays are leaves; when `list_index` is given, that element
/// is selected (`$['tags'][0]`). A document that is not an object is rejected.
pub fn gen_jsonpaths(doc: &Value, list_index: Option<usize>) -> Result<JsonPaths> {
    let Value::Object(map) = doc else {
        return Err(Error::validation(
            "jsonpaths can only be generated from a JSON object",
        ));
    };

    let mut paths = Vec::new();
    walk(map, "$", list_index, &mut paths);
    Ok(JsonPaths::new(paths))
}

fn walk(
    map: &serde_json::Map<String, Value>,
    prefix: &str,
    list_index: Option<usize>,
    paths: &mut Vec<String>,
) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    for key in keys {
        let path = format!("{prefix}['{}']", escape_key(key));
        match &map[key] {
            Value::Object(nested) if !nested.is_empty() => walk(nested, &path, list_index, paths),
            Value::Array(_) => match list_index {
                Some(idx) => paths.push(format!("{path}[{idx}]")),
                None => paths.push(path),
            },
            _ => paths.push(path),
        }
    }
}

fn escape_key(key: &str) -> String {
    key.replace('\\', "\\\\").replace('\'', "\\'")
}
