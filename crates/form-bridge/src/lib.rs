// Form Bridge - browser form submissions to validated request data
// Path-keyed decoding, pluggable validation and error-tree merging

pub mod value;
pub mod form_data;

// Decoding and encoding
pub mod literal;
pub mod decoder;
pub mod encoder;

// Validation and error reporting
pub mod validation;
pub mod errors;
pub mod error;
pub mod pipeline;
pub mod config;

// Re-export core types
pub use value::{Map, Value};
pub use form_data::{FieldValue, FormEntries, FormEntry, UploadedFile};

pub use literal::{JsonLiteral, LiteralDecoder, RawLiteral};
pub use decoder::{generate_form_data, PathKeyDecoder, DEFAULT_MAX_INDEX, DEFAULT_MAX_PADDING};
pub use encoder::{encode, encode_form_data, encode_submission};

pub use validation::{
    FnValidator, Resolution, SchemaValidator, TypedValidator, Validate, ValidationOutcome,
    Validator,
};
#[cfg(feature = "garde")]
pub use validation::GardeValidator;

pub use errors::{merge_errors, split_path, AllowedKeys, ErrorNode, ErrorTree, FORM_ERROR_KEY};
pub use error::{BridgeError, DecodeError, ValidatorFault};
pub use pipeline::{get_validated_form_data, FormBridge, FormSubmission};
pub use config::BridgeConfig;

// Re-export commonly used dependency items
pub use async_trait::async_trait;
