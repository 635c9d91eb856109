use serde_json::{json, Map, Value as JsonValue};

use super::ResultFormatter;

const KEPT_FIELDS: [&str; 3] = ["name", "path", "preview"];

/// Keeps only what the model needs to pick a document from a search.
pub struct DocSearchFormatter;

impl ResultFormatter for DocSearchFormatter {
    fn format(&self, raw: &JsonValue) -> JsonValue {
        let Some(results) = raw.get("results").and_then(JsonValue::as_array) else {
            return raw.clone();
        };

        let results: Vec<JsonValue> = results
            .iter()
            .map(|result| {
                let kept: Map<String, JsonValue> = KEPT_FIELDS
                    .iter()
                    .filter_map(|key| result.get(*key).map(|v| (key.to_string(), v.clone())))
                    .collect();
                JsonValue::Object(kept)
            })
            .collect();

        json!({
            "results": results,
            "total_count": raw.get("total_count").cloned().unwrap_or(JsonValue::Null),
            "has_more": raw.get("has_more").cloned().unwrap_or(JsonValue::Bool(false)),
        })
    }
}
