//! Validator backed by a type deriving [`garde::Validate`].

use super::{Resolution, Validator};
use crate::error::ValidatorFault;
use crate::errors::{split_path, ErrorTree, FORM_ERROR_KEY};
use crate::value::Value;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Runs garde rules on the candidate deserialized as `T`.
///
/// Report paths such as `items[0].name` become nested error tree entries
/// keyed the way the candidate spells them, so serde renames are honoured.
/// Struct-level errors land under [`FORM_ERROR_KEY`].
pub struct GardeValidator<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> GardeValidator<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for GardeValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Validator for GardeValidator<T>
where
    T: DeserializeOwned + Serialize + ::garde::Validate + Send,
    T::Context: Default,
{
    async fn validate(&self, candidate: &Value) -> Result<Resolution, ValidatorFault> {
        let typed: T = match serde_json::from_value(candidate.to_json()) {
            Ok(typed) => typed,
            Err(e) => {
                let mut errors = ErrorTree::new();
                errors.add("", format!("Failed to parse form data: {}", e));
                return Ok(Resolution::invalid(errors));
            }
        };

        if let Err(report) = ::garde::Validate::validate(&typed) {
            let mut errors = ErrorTree::new();
            for (path, error) in report.iter() {
                let field_path = path.to_string();
                match submitted_path(candidate, &field_path) {
                    Some(submitted) => errors.add(&submitted, error.message()),
                    None => {
                        let mut parent = split_path(&field_path);
                        parent.pop();
                        let target = submitted_path(candidate, &parent.join("."))
                            .map(|prefix| join_form_key(&prefix))
                            .unwrap_or_else(|| FORM_ERROR_KEY.to_string());
                        errors.add(&target, format!("{}: {}", field_path, error.message()));
                    }
                }
            }
            return Ok(Resolution::invalid(errors));
        }

        let values = serde_json::to_value(&typed).map_err(|e| ValidatorFault::new(e.to_string()))?;
        Ok(Resolution::valid(Value::from(values)))
    }
}

/// Spell a garde field path with the keys present in `candidate`
///
/// Field segments match keys ignoring case, `_` and `-`, so
/// `customer_name` finds `customerName`. Returns `None` when some segment
/// has no counterpart in the candidate.
fn submitted_path(candidate: &Value, field_path: &str) -> Option<String> {
    let mut node = candidate;
    let mut resolved = Vec::new();

    for segment in split_path(field_path) {
        let (key, child) = match node {
            Value::Object(map) => map
                .get_key_value(segment.as_str())
                .or_else(|| map.iter().find(|(key, _)| same_field(key, &segment)))
                .map(|(key, child)| (key.clone(), child))?,
            Value::Array(items) => {
                let child = segment.parse::<usize>().ok().and_then(|i| items.get(i))?;
                (segment, child)
            }
            _ => return None,
        };
        resolved.push(key);
        node = child;
    }
    Some(resolved.join("."))
}

fn same_field(key: &str, field: &str) -> bool {
    let fold = |s: &str| {
        s.chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect::<String>()
    };
    fold(key) == fold(field)
}

fn join_form_key(prefix: &str) -> String {
    if prefix.is_empty() {
        FORM_ERROR_KEY.to_string()
    } else {
        format!("{}.{}", prefix, FORM_ERROR_KEY)
    }
}
