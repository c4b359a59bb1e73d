// File: src/encoder.rs
// Purpose: Serialize values back into flat form entries for resubmission

use crate::form_data::{FieldValue, FormEntries};
use crate::value::Value;
use serde::Serialize;

/// Flatten the top-level fields of `data` into form entries
///
/// Arrays and objects are written as JSON text rather than expanded into
/// dotted keys, so they come back whole through JSON literal decoding.
/// Booleans and numbers use their display form, strings are written as-is,
/// `null` becomes `"null"` and files stay files. A non-object `data`
/// produces no entries.
pub fn encode_form_data(data: &Value) -> FormEntries {
    let Some(fields) = data.as_object() else {
        return FormEntries::new();
    };

    fields
        .iter()
        .map(|(key, value)| (key.clone(), encode_field(value)))
        .collect()
}

/// Encode `data` with the top-level fields of `extra` laid over it
///
/// Used to submit values that are not bound to form inputs (ids, tokens).
pub fn encode_submission(data: &Value, extra: Option<&Value>) -> FormEntries {
    let mut merged = data.as_object().cloned().unwrap_or_default();
    if let Some(extra) = extra.and_then(Value::as_object) {
        for (key, value) in extra {
            merged.insert(key.clone(), value.clone());
        }
    }
    encode_form_data(&Value::Object(merged))
}

/// Encode any serializable value
pub fn encode<T: Serialize>(data: &T) -> Result<FormEntries, serde_json::Error> {
    let value = serde_json::to_value(data).map(Value::from)?;
    Ok(encode_form_data(&value))
}

fn encode_field(value: &Value) -> FieldValue {
    match value {
        Value::File(file) => FieldValue::File(file.clone()),
        Value::String(text) => FieldValue::Text(text.clone()),
        other => FieldValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form_data::UploadedFile;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_scalars_and_containers() {
        let data = Value::from(json!({
            "name": "Ada",
            "age": 36,
            "ratio": 0.5,
            "admin": false,
            "nickname": null,
            "tags": ["a", "b"],
            "address": { "city": "London" }
        }));

        let form = encode_form_data(&data);
        let text = |key: &str| form.get(key).and_then(FieldValue::as_text).map(str::to_string);

        assert_eq!(form.len(), 7);
        assert_eq!(text("name").as_deref(), Some("Ada"));
        assert_eq!(text("age").as_deref(), Some("36"));
        assert_eq!(text("ratio").as_deref(), Some("0.5"));
        assert_eq!(text("admin").as_deref(), Some("false"));
        assert_eq!(text("nickname").as_deref(), Some("null"));
        assert_eq!(text("tags").as_deref(), Some(r#"["a","b"]"#));
        assert_eq!(text("address").as_deref(), Some(r#"{"city":"London"}"#));
    }

    #[test]
    fn test_files_stay_files() {
        let mut data = crate::value::Map::new();
        data.insert(
            "avatar".to_string(),
            Value::File(UploadedFile::new("me.png", "image/png", vec![1])),
        );

        let form = encode_form_data(&Value::Object(data));
        assert!(matches!(form.get("avatar"), Some(FieldValue::File(file)) if file.name == "me.png"));
    }

    #[test]
    fn test_non_object_root_is_empty() {
        assert!(encode_form_data(&Value::Null).is_empty());
        assert!(encode_form_data(&Value::from(json!([1, 2]))).is_empty());
    }

    #[test]
    fn test_extra_fields_override() {
        let data = Value::from(json!({ "title": "Draft", "id": 1 }));
        let extra = Value::from(json!({ "id": 42, "csrf": "token" }));

        let form = encode_submission(&data, Some(&extra));
        assert_eq!(form.len(), 3);
        assert_eq!(form.get("csrf"), Some(&FieldValue::from("token")));
        assert_eq!(form.get("id"), Some(&FieldValue::from("42")));
    }

    #[test]
    fn test_encode_struct() {
        #[derive(Serialize)]
        struct Profile {
            name: String,
            score: u32,
        }

        let form = encode(&Profile {
            name: "Ada".into(),
            score: 9,
        })
        .unwrap();
        assert_eq!(form.get("score"), Some(&FieldValue::from("9")));
    }
}
