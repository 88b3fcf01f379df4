use serde_json::{Map, Value as JsonValue};

/// Strips unset (`null`) values from a record before it is written.
///
/// Nested objects are cleaned recursively and dropped when nothing is left;
/// arrays lose their unset elements and are dropped when empty.
pub fn sanitize(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(sanitize_object(map)),
        JsonValue::Array(items) => JsonValue::Array(sanitize_array(items)),
        other => other,
    }
}

fn sanitize_object(map: Map<String, JsonValue>) -> Map<String, JsonValue> {
    let mut cleaned = Map::with_capacity(map.len());
    for (key, value) in map {
        match value {
            JsonValue::Null => {}
            JsonValue::Object(nested) => {
                let nested = sanitize_object(nested);
                if !nested.is_empty() {
                    cleaned.insert(key, JsonValue::Object(nested));
                }
            }
            JsonValue::Array(items) => {
                let items = sanitize_array(items);
                if !items.is_empty() {
                    cleaned.insert(key, JsonValue::Array(items));
                }
            }
            other => {
                cleaned.insert(key, other);
            }
        }
    }
    cleaned
}

fn sanitize_array(items: Vec<JsonValue>) -> Vec<JsonValue> {
    items
        .into_iter()
        .filter(|item| !item.is_null())
        .map(sanitize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_unset_keys_recursively() {
        let record = json!({
            "status": "offer",
            "notes": null,
            "flags": { "provenTrack": null },
            "meta": { "source": "manual", "extra": null },
            "timeline": [
                { "id": "timeline_1", "notes": null },
                null
            ],
            "matchReasons": [null],
        });

        assert_eq!(
            sanitize(record),
            json!({
                "status": "offer",
                "meta": { "source": "manual" },
                "timeline": [ { "id": "timeline_1" } ],
            })
        );
    }

    #[test]
    fn keeps_falsy_but_set_values() {
        let record = json!({ "score": 0, "active": false, "name": "", "tags": ["a"] });
        assert_eq!(sanitize(record.clone()), record);
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(sanitize(json!(42)), json!(42));
        assert_eq!(sanitize(JsonValue::Null), JsonValue::Null);
    }
}
