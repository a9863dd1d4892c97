//! JSON payloads, navigated with JSONPath (RFC 9535).

use serde_json::Value as Json;
use serde_json_path::JsonPath;
use tracing::debug;

use super::{ResponseFormat, Row, RowReader};

/// Reader for `application/json` payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReader;

impl RowReader for JsonReader {
    /// An empty path selects the document root. A single selected array is
    /// unwrapped into its elements; otherwise every selected node is a row.
    fn extract_array(&self, payload: &str, path: &str) -> Vec<Row> {
        let document: Json = match serde_json::from_str(payload) {
            Ok(doc) => doc,
            Err(e) => {
                debug!(error = %e, "malformed JSON payload, no rows");
                return Vec::new();
            }
        };

        let nodes = if path.trim().is_empty() {
            vec![document]
        } else {
            query(&document, path)
        };

        let elements = match <[Json; 1]>::try_from(nodes) {
            Ok([Json::Array(items)]) => items,
            Ok([single]) => vec![single],
            Err(nodes) => nodes,
        };

        elements
            .into_iter()
            .map(|data| Row::new(ResponseFormat::Json, data))
            .collect()
    }

    /// A path matching nothing yields `null`; a path matching several nodes
    /// yields them as an array.
    fn extract_field(&self, row: &Row, row_index: usize, path: &str) -> Json {
        let mut nodes = query(row.data(), path);
        match nodes.len() {
            0 => {
                debug!(row_index, path, "JSON path matched nothing");
                Json::Null
            }
            1 => nodes.swap_remove(0),
            _ => Json::Array(nodes),
        }
    }
}

/// Prefixes a root marker when the path lacks one.
fn normalize(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('$') {
        path.to_string()
    } else if path.starts_with('[') || path.starts_with('.') {
        format!("${path}")
    } else {
        format!("$.{path}")
    }
}

fn query(document: &Json, path: &str) -> Vec<Json> {
    let normalized = normalize(path);
    match JsonPath::parse(&normalized) {
        Ok(compiled) => compiled.query(document).all().into_iter().cloned().collect(),
        Err(e) => {
            debug!(path = %normalized, error = %e, "invalid JSON path");
            Vec::new()
        }
    }
}
