// File: src/pipeline.rs
// Purpose: Decode, validate and report a form submission in one call

use crate::config::BridgeConfig;
use crate::decoder::PathKeyDecoder;
use crate::error::{BridgeError, ValidatorFault};
use crate::errors::{merge_errors, AllowedKeys, ErrorTree};
use crate::form_data::FormEntries;
use crate::validation::{SchemaValidator, ValidationOutcome, Validator};
use crate::value::Value;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// What a request handler gets back for a submission
#[derive(Debug, Clone, PartialEq)]
pub struct FormSubmission {
    /// The decoded submission, before validation
    pub received_values: Value,
    /// Validated values, present only when validation passed
    pub data: Option<Value>,
    /// Field errors, present whenever validation did not pass
    pub errors: Option<ErrorTree>,
    /// Set when the validator could not run
    pub fault: Option<ValidatorFault>,
}

impl FormSubmission {
    fn from_outcome(received_values: Value, outcome: ValidationOutcome) -> Self {
        let errors = outcome.errors();
        match outcome {
            ValidationOutcome::Valid(data) => Self {
                received_values,
                data: Some(data),
                errors,
                fault: None,
            },
            ValidationOutcome::Invalid(_) => Self {
                received_values,
                data: None,
                errors,
                fault: None,
            },
            ValidationOutcome::Faulted(fault) => Self {
                received_values,
                data: None,
                errors,
                fault: Some(fault),
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        self.data.is_some()
    }

    /// Validated data, or an error describing why there is none
    pub fn require_valid(self) -> Result<Value, BridgeError> {
        if let Some(fault) = self.fault {
            return Err(BridgeError::ValidatorUnavailable(fault));
        }
        match self.data {
            Some(data) => Ok(data),
            None => Err(BridgeError::Invalid(self.errors.unwrap_or_default())),
        }
    }

    /// Validated data converted into `T`
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, BridgeError> {
        let data = self.clone().require_valid()?;
        Ok(serde_json::from_value(data.to_json())?)
    }

    /// Fold these (server) errors into errors tracked on the client
    pub fn merge_into(&self, client: ErrorTree, allowed: &AllowedKeys) -> ErrorTree {
        merge_errors(client, self.errors.as_ref(), allowed)
    }
}

/// Decoder and validator wired together
///
/// ```no_run
/// use form_bridge::{FormBridge, FormEntries, FnValidator, Resolution, Value, ValidatorFault};
///
/// async fn handle(form: FormEntries) -> Result<Value, form_bridge::BridgeError> {
///     let bridge = FormBridge::new(FnValidator(
///         |candidate: &Value| -> Result<Resolution, ValidatorFault> {
///             Ok(Resolution::valid(candidate.clone()))
///         },
///     ));
///     bridge.submit(&form).await?.require_valid()
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FormBridge<V> {
    decoder: PathKeyDecoder,
    validator: SchemaValidator<V>,
    lenient_decoding: bool,
}

impl<V: Validator> FormBridge<V> {
    pub fn new(validator: V) -> Self {
        Self {
            decoder: PathKeyDecoder::new(),
            validator: SchemaValidator::new(validator),
            lenient_decoding: false,
        }
    }

    pub fn from_config(validator: V, config: &BridgeConfig) -> Self {
        Self::new(validator)
            .with_decoder(PathKeyDecoder::from_config(&config.decoder))
            .lenient_decoding(config.validation.lenient_decoding)
    }

    pub fn with_decoder(mut self, decoder: PathKeyDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Validate an empty object instead of failing when decoding fails
    pub fn lenient_decoding(mut self, lenient: bool) -> Self {
        self.lenient_decoding = lenient;
        self
    }

    pub fn decoder(&self) -> &PathKeyDecoder {
        &self.decoder
    }

    /// Decode and validate a submission
    ///
    /// Fails only when the entries cannot be decoded (and lenient decoding
    /// is off). Validation problems, including a validator that could not
    /// run, are reported on the returned [`FormSubmission`].
    pub async fn submit(&self, entries: &FormEntries) -> Result<FormSubmission, BridgeError> {
        let received_values = match self.decoder.decode(entries) {
            Ok(value) => value,
            Err(err) if self.lenient_decoding => {
                warn!(error = %err, "form decoding failed, validating an empty object");
                Value::object()
            }
            Err(err) => return Err(err.into()),
        };

        let outcome = self.validator.validate(&received_values).await;
        debug!(valid = outcome.is_valid(), "form submission validated");
        Ok(FormSubmission::from_outcome(received_values, outcome))
    }
}

/// Decode `entries` with default settings and validate them
pub async fn get_validated_form_data<V: Validator>(
    entries: &FormEntries,
    validator: V,
) -> Result<FormSubmission, BridgeError> {
    FormBridge::new(validator).submit(entries).await
}
