// File: src/form_data.rs
// Purpose: Flat form submission entries (text and file values)

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{json, Value as JsonValue};
use std::borrow::Cow;

/// An uploaded file carried through the bridge without inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// JSON descriptor handed to validators in place of the raw bytes
    pub fn descriptor(&self) -> JsonValue {
        json!({
            "name": self.name,
            "contentType": self.content_type,
            "size": self.size(),
        })
    }
}

impl Serialize for UploadedFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("UploadedFile", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("contentType", &self.content_type)?;
        state.serialize_field("size", &self.size())?;
        state.end()
    }
}

/// Value half of a form entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    File(UploadedFile),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::File(_) => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<UploadedFile> for FieldValue {
    fn from(file: UploadedFile) -> Self {
        FieldValue::File(file)
    }
}

/// One `(key, value)` pair of a submission
///
/// The key may encode a nested destination, e.g. `address.city`,
/// `items.0.name` or `tags[]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormEntry {
    pub key: String,
    pub value: FieldValue,
}

impl FormEntry {
    pub fn new(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered form submission entries
///
/// Keys may repeat; order is the order in which entries were appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormEntries {
    entries: Vec<FormEntry>,
}

impl FormEntries {
    /// Create empty form entries
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text or file value under `key`
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.entries.push(FormEntry::new(key, value));
    }

    /// Builder variant of [`FormEntries::append`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.append(key, value);
        self
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    /// Every value stored under `key`, in submission order
    pub fn get_all(&self, key: &str) -> Vec<&FieldValue> {
        self.entries
            .iter()
            .filter(|entry| entry.key == key)
            .map(|entry| &entry.value)
            .collect()
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    /// Distinct keys in first-seen order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !keys.contains(&entry.key.as_str()) {
                keys.push(&entry.key);
            }
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FormEntry> {
        self.entries.iter()
    }

    /// Parse an `application/x-www-form-urlencoded` body
    ///
    /// `+` decodes to a space and invalid UTF-8 sequences are replaced.
    pub fn from_urlencoded(body: &str) -> Self {
        body.split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect()
    }

    /// Serialize text entries as `application/x-www-form-urlencoded`
    ///
    /// File entries have no urlencoded form and are skipped.
    pub fn to_urlencoded(&self) -> String {
        self.entries
            .iter()
            .filter_map(|entry| {
                entry.value.as_text().map(|text| {
                    format!(
                        "{}={}",
                        urlencoding::encode(&entry.key),
                        urlencoding::encode(text)
                    )
                })
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    let bytes: Cow<'_, [u8]> = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

impl<K, V> FromIterator<(K, V)> for FormEntries
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| FormEntry::new(key, value))
                .collect(),
        }
    }
}

impl IntoIterator for FormEntries {
    type Item = FormEntry;
    type IntoIter = std::vec::IntoIter<FormEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a FormEntries {
    type Item = &'a FormEntry;
    type IntoIter = std::slice::Iter<'a, FormEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_form_entries_empty() {
        let form = FormEntries::new();
        assert!(form.is_empty());
        assert_eq!(form.len(), 0);
        assert!(form.get("name").is_none());
    }

    #[test]
    fn test_repeated_keys_keep_order() {
        let form = FormEntries::new()
            .with("tags[]", "a")
            .with("name", "John")
            .with("tags[]", "b");

        assert_eq!(form.len(), 3);
        assert_eq!(form.keys(), vec!["tags[]", "name"]);
        assert_eq!(
            form.get_all("tags[]"),
            vec![&FieldValue::from("a"), &FieldValue::from("b")]
        );
        assert_eq!(form.get("tags[]"), Some(&FieldValue::from("a")));
        assert!(form.has("name"));
        assert!(!form.has("email"));
    }

    #[test]
    fn test_from_urlencoded() {
        let form = FormEntries::from_urlencoded("first+name=Jane%20Doe&age=30&flag&tags%5B%5D=x");

        assert_eq!(form.get("first name"), Some(&FieldValue::from("Jane Doe")));
        assert_eq!(form.get("age"), Some(&FieldValue::from("30")));
        assert_eq!(form.get("flag"), Some(&FieldValue::from("")));
        assert_eq!(form.get("tags[]"), Some(&FieldValue::from("x")));
    }

    #[test]
    fn test_to_urlencoded_skips_files() {
        let form = FormEntries::new()
            .with("name", "Jane Doe")
            .with("avatar", UploadedFile::new("a.png", "image/png", vec![0]))
            .with("note", "a&b");

        assert_eq!(form.to_urlencoded(), "name=Jane%20Doe&note=a%26b");
    }

    #[test]
    fn test_uploaded_file_descriptor() {
        let file = UploadedFile::new("report.pdf", "application/pdf", vec![0; 10]);
        assert_eq!(file.size(), 10);
        assert_eq!(
            serde_json::to_value(&file).unwrap(),
            json!({ "name": "report.pdf", "contentType": "application/pdf", "size": 10 })
        );
    }
}
