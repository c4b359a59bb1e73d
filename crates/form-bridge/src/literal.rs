// File: src/literal.rs
// Purpose: Pluggable decoding of text field values into typed literals

use crate::value::Value;

/// Strategy for turning a submitted text value into a typed value
///
/// Returning `None` keeps the original string.
pub trait LiteralDecoder: Send + Sync {
    fn decode(&self, raw: &str) -> Option<Value>;
}

/// Decodes JSON literals: `123`, `true`, `null`, `[1,2]`, `{"a":1}`, `"quoted"`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLiteral;

impl LiteralDecoder for JsonLiteral {
    fn decode(&self, raw: &str) -> Option<Value> {
        serde_json::from_str::<serde_json::Value>(raw)
            .ok()
            .map(Value::from)
    }
}

/// Never decodes; every text value stays a string
#[derive(Debug, Clone, Copy, Default)]
pub struct RawLiteral;

impl LiteralDecoder for RawLiteral {
    fn decode(&self, _raw: &str) -> Option<Value> {
        None
    }
}

impl<F> LiteralDecoder for F
where
    F: Fn(&str) -> Option<Value> + Send + Sync,
{
    fn decode(&self, raw: &str) -> Option<Value> {
        self(raw)
    }
}
