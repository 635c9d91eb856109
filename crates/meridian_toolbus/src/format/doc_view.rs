use serde_json::Value as JsonValue;

use super::ResultFormatter;

const STRIPPED_FIELDS: [&str; 3] = ["id", "updated_at", "word_count"];

/// Strips bookkeeping fields from document and folder views.
pub struct DocViewFormatter;

fn strip(value: &mut JsonValue) {
    if let Some(object) = value.as_object_mut() {
        for key in STRIPPED_FIELDS {
            object.remove(key);
        }
        if let Some(documents) = object.get_mut("documents").and_then(JsonValue::as_array_mut) {
            documents.iter_mut().for_each(strip);
        }
    }
}

impl ResultFormatter for DocViewFormatter {
    fn format(&self, raw: &JsonValue) -> JsonValue {
        let mut formatted = raw.clone();
        strip(&mut formatted);
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_doc_view_formatter_document() {
        let raw = json!({
            "type": "document",
            "name": "ch1",
            "path": "/ch1",
            "content": "text",
            "word_count": 1,
            "updated_at": null,
            "was_truncated": false
        });
        let formatted = DocViewFormatter.format(&raw);
        assert!(formatted.get("word_count").is_none());
        assert!(formatted.get("updated_at").is_none());
        assert_eq!(formatted["content"], "text");
    }

    #[test]
    fn test_doc_view_formatter_recurses_into_folder() {
        let raw = json!({
            "type": "folder",
            "path": "/drafts",
            "documents": [{"name": "ch1", "path": "/drafts/ch1", "word_count": 3, "updated_at": null}],
            "folders": [{"name": "old", "path": "/drafts/old"}]
        });
        let formatted = DocViewFormatter.format(&raw);
        assert_eq!(
            formatted["documents"],
            json!([{"name": "ch1", "path": "/drafts/ch1"}])
        );
        assert_eq!(formatted["folders"], raw["folders"]);
    }
}
