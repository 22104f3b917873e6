//! Grasshopper data trees and solve payloads

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value};
use shared::{McpError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Branch used for single-item inputs and read back from outputs
pub const FIRST_BRANCH: &str = "{0}";

/// One named input tree, as Rhino.Compute expects it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTree {
    #[serde(rename = "ParamName")]
    pub param_name: String,

    #[serde(rename = "InnerTree")]
    pub inner_tree: BTreeMap<String, Vec<DataItem>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataItem {
    pub data: String,
}

impl DataTree {
    /// Tree holding a single value on branch `{0}`
    pub fn single(name: impl Into<String>, value: &Value) -> Self {
        let data = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let mut inner_tree = BTreeMap::new();
        inner_tree.insert(FIRST_BRANCH.to_string(), vec![DataItem { data }]);
        Self {
            param_name: name.into(),
            inner_tree,
        }
    }
}

/// Body of `POST grasshopper`
#[derive(Debug, Clone, Serialize)]
pub struct SolveRequest {
    pub algo: String,
    pub pointer: Option<String>,
    pub values: Vec<DataTree>,
}

impl SolveRequest {
    pub fn new(definition: &[u8], inputs: &Map<String, Value>) -> Self {
        Self {
            algo: general_purpose::STANDARD.encode(definition),
            pointer: None,
            values: inputs.iter().map(|(name, value)| DataTree::single(name, value)).collect(),
        }
    }
}

/// Decode the items of one branch of the first output parameter.
///
/// Each item's `data` has one layer of quotes stripped, then reads as a JSON
/// object (encoded geometry), a number, or falls back to the raw string.
pub fn decode_output(output: &Value, branch: &str) -> Result<Vec<Value>> {
    let items = output["values"]
        .get(0)
        .and_then(|v| v["InnerTree"].get(branch))
        .and_then(Value::as_array)
        .ok_or_else(|| McpError::Upstream(format!("no output branch {} in solve result", branch)))?;

    Ok(items.iter().map(|item| decode_item(&item["data"])).collect())
}

fn decode_item(data: &Value) -> Value {
    let Some(raw) = data.as_str() else {
        return data.clone();
    };

    let text = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    };

    if let Ok(object @ Value::Object(_)) = serde_json::from_str::<Value>(text) {
        return object;
    }

    let number = if text.contains('.') {
        text.parse::<f64>().ok().and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
    } else {
        text.parse::<i64>().ok().map(Value::from)
    };

    number.unwrap_or_else(|| Value::String(text.to_string()))
}

/// Absolute form of a possibly relative path
pub fn resolve_path(pointer: &str) -> Result<PathBuf> {
    let path = Path::new(pointer);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// `<dir>/<definition stem>_<YYYYmmdd_HHMMSS>.json`
pub fn output_file_path(dir: &Path, definition: &Path, at: DateTime<Local>) -> PathBuf {
    let stem = definition
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "definition".to_string());
    dir.join(format!("{}_{}.json", stem, at.format("%Y%m%d_%H%M%S")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_single_tree_shape() {
        let tree = DataTree::single("radius", &json!(2.5));
        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({"ParamName": "radius", "InnerTree": {"{0}": [{"data": "2.5"}]}})
        );
    }

    #[test]
    fn test_string_input_is_not_requoted() {
        let tree = DataTree::single("label", &json!("tower"));
        assert_eq!(tree.inner_tree[FIRST_BRANCH][0].data, "tower");
    }

    #[test]
    fn test_solve_request_encodes_definition() {
        let mut inputs = Map::new();
        inputs.insert("count".to_string(), json!(3));
        let request = SolveRequest::new(b"gh", &inputs);

        assert_eq!(request.algo, "Z2g=");
        assert!(request.pointer.is_none());
        assert_eq!(request.values[0].param_name, "count");
    }

    #[test]
    fn test_decode_output_mixed_items() {
        let output = json!({
            "values": [{
                "ParamName": "RH_OUT:result",
                "InnerTree": {"{0}": [
                    {"data": "\"10\""},
                    {"data": "3.25"},
                    {"data": "\"hello\""},
                    {"data": "{\"version\":10000,\"data\":\"AAA\"}"}
                ]}
            }]
        });

        let values = decode_output(&output, FIRST_BRANCH).unwrap();
        assert_eq!(values[0], json!(10));
        assert_eq!(values[1], json!(3.25));
        assert_eq!(values[2], json!("hello"));
        assert_eq!(values[3]["version"], 10000);
    }

    #[test]
    fn test_decode_output_missing_branch() {
        let err = decode_output(&json!({"values": []}), FIRST_BRANCH).unwrap_err();
        assert!(err.to_string().contains("no output branch"));
    }

    #[test]
    fn test_output_file_path() {
        let at = Local.with_ymd_and_hms(2025, 3, 14, 9, 5, 7).unwrap();
        let path = output_file_path(Path::new("outputs"), Path::new("/defs/Tower.gh"), at);
        assert_eq!(path, Path::new("outputs/Tower_20250314_090507.json"));
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn test_single_quote_char_is_kept() {
            assert_eq!(decode_item(&json!("\"")), json!("\""));
        }

        #[test]
        fn test_non_numeric_with_dot_is_string() {
            assert_eq!(decode_item(&json!("v1.2.3")), json!("v1.2.3"));
        }

        #[test]
        fn test_resolve_relative_path() {
            let path = resolve_path("defs/a.gh").unwrap();
            assert!(path.is_absolute());
            assert!(path.ends_with("defs/a.gh"));
        }
    }
}
