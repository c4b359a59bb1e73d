// File: src/validation/mod.rs
// Purpose: Validation capability trait and outcome of validating a submission

use crate::error::ValidatorFault;
use crate::errors::ErrorTree;
use crate::value::Value;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(feature = "garde")]
pub mod garde;
pub mod typed;

#[cfg(feature = "garde")]
pub use self::garde::GardeValidator;
pub use typed::TypedValidator;

/// Trait for types that can be validated
///
/// Returns Ok(()) if valid, or Err with a map of field names to error
/// messages. Field names may be paths such as `address.city` or `items[0].qty`.
pub trait Validate {
    fn validate(&self) -> Result<(), HashMap<String, Vec<String>>>;
}

/// What a validation capability reports for a candidate
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolution {
    /// Validated and possibly coerced values
    pub values: Value,
    /// Field errors; empty means the candidate passed
    pub errors: ErrorTree,
}

impl Resolution {
    pub fn valid(values: Value) -> Self {
        Self {
            values,
            errors: ErrorTree::new(),
        }
    }

    pub fn invalid(errors: ErrorTree) -> Self {
        Self {
            values: Value::object(),
            errors,
        }
    }
}

/// A pluggable schema engine
///
/// Implementations may do asynchronous work (remote lookups, database
/// checks). `Err` means the engine could not run at all; field problems
/// belong in [`Resolution::errors`].
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, candidate: &Value) -> Result<Resolution, ValidatorFault>;
}

#[async_trait]
impl<V: Validator + ?Sized> Validator for Box<V> {
    async fn validate(&self, candidate: &Value) -> Result<Resolution, ValidatorFault> {
        (**self).validate(candidate).await
    }
}

#[async_trait]
impl<V: Validator + ?Sized> Validator for Arc<V> {
    async fn validate(&self, candidate: &Value) -> Result<Resolution, ValidatorFault> {
        (**self).validate(candidate).await
    }
}

/// Synchronous closure used as a validator
pub struct FnValidator<F>(pub F);

#[async_trait]
impl<F> Validator for FnValidator<F>
where
    F: Fn(&Value) -> Result<Resolution, ValidatorFault> + Send + Sync,
{
    async fn validate(&self, candidate: &Value) -> Result<Resolution, ValidatorFault> {
        (self.0)(candidate)
    }
}

/// Result of validating a submission
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid(Value),
    Invalid(ErrorTree),
    /// The validator could not run. Treated as invalid, with no field errors.
    Faulted(ValidatorFault),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self, ValidationOutcome::Faulted(_))
    }

    /// Validated data if validation passed
    pub fn data(&self) -> Option<&Value> {
        match self {
            ValidationOutcome::Valid(data) => Some(data),
            _ => None,
        }
    }

    /// Field errors; a fault yields an empty tree
    pub fn errors(&self) -> Option<ErrorTree> {
        match self {
            ValidationOutcome::Valid(_) => None,
            ValidationOutcome::Invalid(errors) => Some(errors.clone()),
            ValidationOutcome::Faulted(_) => Some(ErrorTree::new()),
        }
    }
}

/// Runs candidates through a [`Validator`]
#[derive(Debug, Clone)]
pub struct SchemaValidator<V> {
    validator: V,
}

impl<V: Validator> SchemaValidator<V> {
    pub fn new(validator: V) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Validate a candidate, waiting for the capability to finish
    pub async fn validate(&self, candidate: &Value) -> ValidationOutcome {
        match self.validator.validate(candidate).await {
            Ok(resolution) if resolution.errors.is_empty() => {
                ValidationOutcome::Valid(resolution.values)
            }
            Ok(resolution) => {
                debug!(fields = ?resolution.errors.keys().collect::<Vec<_>>(), "validation failed");
                ValidationOutcome::Invalid(resolution.errors)
            }
            Err(fault) => {
                warn!(error = %fault, "validator failed to run");
                ValidationOutcome::Faulted(fault)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn require_name(candidate: &Value) -> Result<Resolution, ValidatorFault> {
        match candidate.get("name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => Ok(Resolution::valid(candidate.clone())),
            _ => Ok(Resolution::invalid(ErrorTree::new().with("name", "Name is required"))),
        }
    }

    #[tokio::test]
    async fn test_valid_candidate() {
        let validator = SchemaValidator::new(FnValidator(require_name));
        let candidate = Value::from(json!({ "name": "Ada" }));

        let outcome = validator.validate(&candidate).await;
        assert!(outcome.is_valid());
        assert_eq!(outcome.data(), Some(&candidate));
        assert_eq!(outcome.errors(), None);
    }

    #[tokio::test]
    async fn test_invalid_candidate() {
        let validator = SchemaValidator::new(FnValidator(require_name));
        let outcome = validator.validate(&Value::object()).await;

        assert!(!outcome.is_valid());
        assert_eq!(outcome.data(), None);
        assert_eq!(
            outcome.errors().unwrap().message("name"),
            Some("Name is required")
        );
    }

    #[tokio::test]
    async fn test_fault_is_fail_closed_but_distinct() {
        let validator = SchemaValidator::new(FnValidator(|_: &Value| -> Result<Resolution, ValidatorFault> {
            Err(ValidatorFault::new("schema service offline"))
        }));
        let outcome = validator.validate(&Value::object()).await;

        assert!(!outcome.is_valid());
        assert!(outcome.is_faulted());
        assert_eq!(outcome.errors(), Some(ErrorTree::new()));
        assert_eq!(
            outcome,
            ValidationOutcome::Faulted(ValidatorFault::new("schema service offline"))
        );
    }

    #[tokio::test]
    async fn test_values_are_taken_from_resolution() {
        // Validators may coerce values; the outcome carries their version
        let validator = SchemaValidator::new(FnValidator(|_: &Value| -> Result<Resolution, ValidatorFault> {
            Ok(Resolution::valid(Value::from(json!({ "age": 30 }))))
        }));
        let outcome = validator.validate(&Value::from(json!({ "age": "30" }))).await;
        assert_eq!(outcome.data(), Some(&Value::from(json!({ "age": 30 }))));
    }

    #[tokio::test]
    async fn test_boxed_validator() {
        let boxed: Box<dyn Validator> = Box::new(FnValidator(require_name));
        let validator = SchemaValidator::new(boxed);
        let outcome = validator.validate(&Value::from(json!({ "name": "" }))).await;
        assert!(!outcome.is_valid());
    }
}
