// File: src/decoder.rs
// Purpose: Rebuild a nested value from flat, path-keyed form entries

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::form_data::{FieldValue, FormEntries, FormEntry};
use crate::literal::{JsonLiteral, LiteralDecoder};
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, trace};

/// Trailing `[]` or `[N]` on the last key segment
static ARRAY_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d*\]$").unwrap());

/// Largest index a dotted path may address inside an array
pub const DEFAULT_MAX_INDEX: usize = 10_000;

/// Null slots one decode may add when an index skips past the end of an array
pub const DEFAULT_MAX_PADDING: usize = 10_000;

/// Decodes flat form entries into a nested [`Value`]
///
/// Key grammar:
/// - `a.b` writes `b` inside object `a`
/// - `a.0.b` builds an array under `a` (next segment is digits) and writes
///   into element 0
/// - `a.0`, `a.1` append to the array `a` in encounter order
/// - `a[]` / `a[3]` append to the array `a` (the bracket index is ignored)
///
/// # Example
///
/// ```
/// use form_bridge::{FormEntries, PathKeyDecoder};
///
/// let form = FormEntries::new()
///     .with("user.name", "Ada")
///     .with("user.age", "36")
///     .with("tags[]", "math");
///
/// let value = PathKeyDecoder::new().decode(&form).unwrap();
/// assert_eq!(value.to_json(), serde_json::json!({
///     "user": { "name": "Ada", "age": 36 },
///     "tags": ["math"],
/// }));
/// ```
#[derive(Clone)]
pub struct PathKeyDecoder {
    literal: Arc<dyn LiteralDecoder>,
    preserve_stringified: bool,
    trim_values: bool,
    max_index: usize,
    max_padding: usize,
}

impl std::fmt::Debug for PathKeyDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathKeyDecoder")
            .field("preserve_stringified", &self.preserve_stringified)
            .field("trim_values", &self.trim_values)
            .field("max_index", &self.max_index)
            .field("max_padding", &self.max_padding)
            .finish()
    }
}

impl Default for PathKeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PathKeyDecoder {
    /// Decoder with JSON literal decoding enabled
    pub fn new() -> Self {
        Self {
            literal: Arc::new(JsonLiteral),
            preserve_stringified: false,
            trim_values: false,
            max_index: DEFAULT_MAX_INDEX,
            max_padding: DEFAULT_MAX_PADDING,
        }
    }

    /// Build a decoder from the `[decoder]` config section
    pub fn from_config(config: &DecoderConfig) -> Self {
        Self::new()
            .preserve_stringified(config.preserve_stringified)
            .trim_values(config.trim_values)
            .max_index(config.max_index)
            .max_padding(config.max_padding)
    }

    /// Replace the literal decoding strategy
    pub fn with_literal(mut self, literal: impl LiteralDecoder + 'static) -> Self {
        self.literal = Arc::new(literal);
        self
    }

    /// Keep every text value as a string, skipping literal decoding
    pub fn preserve_stringified(mut self, preserve: bool) -> Self {
        self.preserve_stringified = preserve;
        self
    }

    /// Trim surrounding whitespace from text values before decoding
    pub fn trim_values(mut self, trim: bool) -> Self {
        self.trim_values = trim;
        self
    }

    pub fn max_index(mut self, max_index: usize) -> Self {
        self.max_index = max_index;
        self
    }

    /// Cap on `null` slots added across one decode
    ///
    /// `items.9000.name` pads `items` with 9000 nulls; without this cap a
    /// short key could allocate one large array per path level.
    pub fn max_padding(mut self, max_padding: usize) -> Self {
        self.max_padding = max_padding;
        self
    }

    /// Decode entries into an object rooted value
    pub fn decode<'a, I>(&self, entries: I) -> Result<Value, DecodeError>
    where
        I: IntoIterator<Item = &'a FormEntry>,
    {
        let mut root = Value::object();
        let mut count = 0usize;
        let mut padded = 0usize;

        for entry in entries {
            let data = self.convert(&entry.value);
            trace!(key = %entry.key, kind = data.kind(), "decoding form entry");
            self.insert(&mut root, &entry.key, data, &mut padded).map_err(|err| {
                debug!(key = %entry.key, error = %err, "form entry rejected");
                err
            })?;
            count += 1;
        }

        debug!(entries = count, padded, "decoded form entries");
        Ok(root)
    }

    fn convert(&self, value: &FieldValue) -> Value {
        match value {
            FieldValue::File(file) => Value::File(file.clone()),
            FieldValue::Text(text) => {
                let text = if self.trim_values { text.trim() } else { text.as_str() };
                if self.preserve_stringified {
                    return Value::String(text.to_string());
                }
                self.literal
                    .decode(text)
                    .unwrap_or_else(|| Value::String(text.to_string()))
            }
        }
    }

    fn insert(
        &self,
        root: &mut Value,
        key: &str,
        data: Value,
        padded: &mut usize,
    ) -> Result<(), DecodeError> {
        let segments: Vec<&str> = key.split('.').collect();
        let Some((terminal, parents)) = segments.split_last() else {
            return Ok(());
        };

        let mut current = root;
        for (depth, segment) in parents.iter().enumerate() {
            let wants_array = is_index(segments[depth + 1]);
            let path = segments[..=depth].join(".");
            current = self.descend(current, segment, wants_array, &path, padded)?;
        }

        let parent_path = parents.join(".");

        if let Some(suffix) = ARRAY_SUFFIX.find(terminal) {
            let name = &terminal[..suffix.start()];
            let map = match current {
                Value::Object(map) => map,
                other => return Err(mismatch(&parent_path, "object", other.kind())),
            };
            let slot = map.entry(name.to_string()).or_insert(Value::Null);
            if !slot.is_truthy() {
                *slot = Value::Array(Vec::new());
            }
            return match slot {
                Value::Array(items) => {
                    items.push(data);
                    Ok(())
                }
                other => Err(mismatch(&join(&parent_path, name), "array", other.kind())),
            };
        }

        if is_index(terminal) {
            return match current {
                Value::Array(items) => {
                    items.push(data);
                    Ok(())
                }
                other => Err(mismatch(&parent_path, "array", other.kind())),
            };
        }

        match current {
            Value::Object(map) => {
                map.insert(terminal.to_string(), data);
                Ok(())
            }
            other => Err(mismatch(&parent_path, "object", other.kind())),
        }
    }

    /// Step into (creating if needed) the container named `segment`
    ///
    /// Falsy scalars count as absent, so a hole, an explicit `null` or an
    /// empty hidden input is replaced.
    fn descend<'v>(
        &self,
        current: &'v mut Value,
        segment: &str,
        wants_array: bool,
        path: &str,
        padded: &mut usize,
    ) -> Result<&'v mut Value, DecodeError> {
        let fresh = || {
            if wants_array {
                Value::Array(Vec::new())
            } else {
                Value::object()
            }
        };

        let current_kind = current.kind();
        let child = match current {
            Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
            Value::Array(items) if is_index(segment) => {
                let index = segment
                    .parse::<usize>()
                    .ok()
                    .filter(|index| *index <= self.max_index)
                    .ok_or_else(|| DecodeError::IndexOutOfRange {
                        path: path.to_string(),
                        limit: self.max_index,
                    })?;
                if index >= items.len() {
                    let padding = index - items.len();
                    if *padded + padding > self.max_padding {
                        return Err(DecodeError::PaddingExceeded {
                            path: path.to_string(),
                            limit: self.max_padding,
                        });
                    }
                    *padded += padding;
                    items.resize(index + 1, Value::Null);
                }
                &mut items[index]
            }
            _ => {
                let parent = path.rsplit_once('.').map(|(parent, _)| parent).unwrap_or("");
                return Err(mismatch(parent, "object", current_kind));
            }
        };

        if !child.is_truthy() {
            *child = fresh();
        }

        let found = child.kind();
        if child.is_container() {
            Ok(child)
        } else {
            Err(mismatch(path, "object or array", found))
        }
    }
}

/// Decode entries with JSON literal decoding unless `preserve_stringified`
pub fn generate_form_data(
    entries: &FormEntries,
    preserve_stringified: bool,
) -> Result<Value, DecodeError> {
    PathKeyDecoder::new()
        .preserve_stringified(preserve_stringified)
        .decode(entries)
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn mismatch(path: &str, expected: &'static str, found: &'static str) -> DecodeError {
    DecodeError::StructuralMismatch {
        path: path.to_string(),
        expected,
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form_data::UploadedFile;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn decode(pairs: &[(&str, &str)]) -> Result<serde_json::Value, DecodeError> {
        let form: FormEntries = pairs.iter().copied().collect();
        PathKeyDecoder::new().decode(&form).map(|value| value.to_json())
    }

    #[test]
    fn test_dotted_keys_build_objects() {
        let value = decode(&[("a.b", "\"v1\""), ("a.c", "v2")]).unwrap();
        assert_eq!(value, json!({ "a": { "b": "v1", "c": "v2" } }));
    }

    #[test]
    fn test_bracket_suffix_appends_in_encounter_order() {
        let value = decode(&[("a[]", "v1"), ("a[]", "v2")]).unwrap();
        assert_eq!(value, json!({ "a": ["v1", "v2"] }));

        // Index inside the brackets is ignored
        let value = decode(&[("a[5]", "v1"), ("a[0]", "v2")]).unwrap();
        assert_eq!(value, json!({ "a": ["v1", "v2"] }));
    }

    #[test]
    fn test_only_last_bracket_is_stripped() {
        let value = decode(&[("grid[0][1]", "x")]).unwrap();
        assert_eq!(value, json!({ "grid[0]": ["x"] }));
    }

    #[test]
    fn test_numeric_terminal_appends() {
        let value = decode(&[("a.0", "v0"), ("a.1", "v1")]).unwrap();
        assert_eq!(value, json!({ "a": ["v0", "v1"] }));

        let value = decode(&[("a.7", "first"), ("a.2", "second")]).unwrap();
        assert_eq!(value, json!({ "a": ["first", "second"] }));
    }

    #[test]
    fn test_array_of_objects() {
        let value = decode(&[
            ("items.0.name", "pen"),
            ("items.0.qty", "2"),
            ("items.1.name", "ink"),
        ])
        .unwrap();
        assert_eq!(
            value,
            json!({ "items": [{ "name": "pen", "qty": 2 }, { "name": "ink" }] })
        );
    }

    #[test]
    fn test_sparse_index_pads_with_null() {
        let value = decode(&[("items.2.name", "late")]).unwrap();
        assert_eq!(value, json!({ "items": [null, null, { "name": "late" }] }));

        let value = decode(&[("items.2.name", "late"), ("items.0.name", "early")]).unwrap();
        assert_eq!(
            value,
            json!({ "items": [{ "name": "early" }, null, { "name": "late" }] })
        );
    }

    #[test]
    fn test_index_limit() {
        let form = FormEntries::new().with("items.50.name", "x");
        let err = PathKeyDecoder::new().max_index(10).decode(&form).unwrap_err();
        assert_eq!(
            err,
            DecodeError::IndexOutOfRange {
                path: "items.50".to_string(),
                limit: 10,
            }
        );
    }

    #[test]
    fn test_literal_decoding_toggle() {
        let form = FormEntries::new().with("n", "123").with("flag", "true");

        let decoded = PathKeyDecoder::new().decode(&form).unwrap();
        assert_eq!(decoded.to_json(), json!({ "n": 123, "flag": true }));

        let raw = generate_form_data(&form, true).unwrap();
        assert_eq!(raw.to_json(), json!({ "n": "123", "flag": "true" }));
    }

    #[test]
    fn test_invalid_literal_kept_verbatim() {
        let value = decode(&[("note", "not json{")]).unwrap();
        assert_eq!(value, json!({ "note": "not json{" }));
    }

    #[test]
    fn test_json_literal_value_is_expanded() {
        let value = decode(&[("address", r#"{"city":"Oslo","zip":"0150"}"#)]).unwrap();
        assert_eq!(value, json!({ "address": { "city": "Oslo", "zip": "0150" } }));
    }

    #[test]
    fn test_last_write_wins_for_plain_keys() {
        let value = decode(&[("name", "a"), ("other", "x"), ("name", "b")]).unwrap();
        assert_eq!(value, json!({ "name": "b", "other": "x" }));
        let keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
        assert!(keys.contains(&"name".to_string()));
    }

    #[test]
    fn test_first_structure_wins() {
        // `a` is an object; appending to it as an array fails
        let err = decode(&[("a.b", "1"), ("a.0", "2")]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::StructuralMismatch {
                path: "a".to_string(),
                expected: "array",
                found: "object",
            }
        );

        // `a` is an array; a named child cannot be added
        let err = decode(&[("a.0", "1"), ("a.b", "2")]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::StructuralMismatch {
                path: "a".to_string(),
                expected: "object",
                found: "array",
            }
        );
    }

    #[test]
    fn test_scalar_cannot_become_container() {
        let err = decode(&[("a", "hello"), ("a.b", "x")]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::StructuralMismatch {
                path: "a".to_string(),
                expected: "object or array",
                found: "string",
            }
        );

        let err = decode(&[("tags", "solo"), ("tags[]", "x")]).unwrap_err();
        assert!(matches!(err, DecodeError::StructuralMismatch { expected: "array", .. }));
    }

    #[test]
    fn test_null_is_replaced_by_container() {
        let value = decode(&[("a", "null"), ("a.b", "x")]).unwrap();
        assert_eq!(value, json!({ "a": { "b": "x" } }));
    }

    #[test]
    fn test_empty_hidden_input_is_replaced() {
        let value = decode(&[("tags", ""), ("tags[]", "x")]).unwrap();
        assert_eq!(value, json!({ "tags": ["x"] }));

        let value = decode(&[("opts", "false"), ("opts.color", "red")]).unwrap();
        assert_eq!(value, json!({ "opts": { "color": "red" } }));

        let value = decode(&[("rows", "0"), ("rows.0.id", "7")]).unwrap();
        assert_eq!(value, json!({ "rows": [{ "id": 7 }] }));
    }

    #[test]
    fn test_padding_budget_spans_the_whole_decode() {
        let form = FormEntries::new().with("a.10000.10000.10000.x", "1");
        let err = PathKeyDecoder::new().decode(&form).unwrap_err();
        assert_eq!(
            err,
            DecodeError::PaddingExceeded {
                path: "a.10000.10000".to_string(),
                limit: DEFAULT_MAX_PADDING,
            }
        );

        // Two keys that each fit still share one budget
        let form = FormEntries::new()
            .with("a.6.x", "1")
            .with("b.6.x", "2");
        let err = PathKeyDecoder::new().max_padding(10).decode(&form).unwrap_err();
        assert!(matches!(err, DecodeError::PaddingExceeded { limit: 10, .. }));

        let value = PathKeyDecoder::new().max_padding(12).decode(&form).unwrap();
        assert_eq!(value.get("b").and_then(Value::as_array).map(Vec::len), Some(7));
    }

    #[test]
    fn test_files_are_not_decoded() {
        let form = FormEntries::new()
            .with("docs[]", UploadedFile::new("a.txt", "text/plain", b"123".to_vec()))
            .with("title", " spaced ");

        let value = PathKeyDecoder::new().trim_values(true).decode(&form).unwrap();
        assert!(matches!(value.get("docs"), Some(Value::Array(items)) if matches!(items[0], Value::File(_))));
        assert_eq!(value.get("title"), Some(&Value::from("spaced")));
    }

    #[test]
    fn test_custom_literal_decoder() {
        let form = FormEntries::new().with("agree", "on").with("count", "3");
        let decoder = PathKeyDecoder::new().with_literal(|raw: &str| match raw {
            "on" => Some(Value::Bool(true)),
            _ => None,
        });

        let value = decoder.decode(&form).unwrap();
        assert_eq!(value.to_json(), json!({ "agree": true, "count": "3" }));
    }

    #[test]
    fn test_empty_input_gives_empty_object() {
        assert_eq!(decode(&[]).unwrap(), json!({}));
    }
}
