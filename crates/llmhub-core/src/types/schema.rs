//! JSON Schema wrapper for structured output

use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON Schema document constraining a structured-output request.
///
/// Wraps a [`serde_json::Value`] and validates instances through the
/// [`jsonschema`] crate. The schema is compiled on each call; schemas used
/// here are small, fixed documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonSchema(Value);

impl JsonSchema {
    /// Creates a schema from a raw JSON value.
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    /// Returns a reference to the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Compiles the schema once for repeated validation.
    pub fn compile(&self) -> Result<CompiledSchema, String> {
        JSONSchema::compile(&self.0)
            .map(CompiledSchema)
            .map_err(|e| format!("invalid JSON schema: {}", e))
    }

    /// Fails if the schema document itself cannot be compiled.
    pub fn check(&self) -> Result<(), String> {
        self.compile().map(|_| ())
    }

    /// Validates `instance` against this schema.
    ///
    /// Compiles on every call; use [`compile`](Self::compile) when validating
    /// more than once.
    pub fn validate(&self, instance: &Value) -> Result<(), String> {
        self.compile()?.validate(instance)
    }
}

/// A [`JsonSchema`] compiled into a validator
pub struct CompiledSchema(JSONSchema);

impl CompiledSchema {
    /// On failure the error lists every violation, separated by `"; "`.
    pub fn validate(&self, instance: &Value) -> Result<(), String> {
        self.0
            .validate(instance)
            .map_err(|errors| errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; "))
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema").finish_non_exhaustive()
    }
}

impl From<Value> for JsonSchema {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
