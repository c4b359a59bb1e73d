// File: src/validation/typed.rs
// Purpose: Validator backed by a typed struct implementing `Validate`

use super::{Resolution, Validate, Validator};
use crate::error::ValidatorFault;
use crate::errors::ErrorTree;
use crate::value::Value;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Deserializes the candidate into `T` and runs `T::validate`
///
/// A candidate that does not fit `T` is reported as a form-level error.
/// On success the values are `T` serialized back, so coercions done by
/// deserialization are visible to the caller.
pub struct TypedValidator<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedValidator<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TypedValidator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedValidator")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<T> Validator for TypedValidator<T>
where
    T: DeserializeOwned + Serialize + Validate + Send,
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

        if let Err(fields) = typed.validate() {
            return Ok(Resolution::invalid(ErrorTree::from_field_map(&fields)));
        }

        let values = serde_json::to_value(&typed).map_err(|e| ValidatorFault::new(e.to_string()))?;
        Ok(Resolution::valid(Value::from(values)))
    }
}
