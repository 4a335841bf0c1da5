//! Validators
//!
//! A validator turns an untyped JSON value into `T` or fails with a
//! [`SchemaError`]. It never hands back a partially coerced value.

use dstore_core::SchemaError;
use jsonschema::JSONSchema;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// Decode step applied to every record read
pub trait Validate<T>: Send + Sync {
    /// Check `raw` against the schema and produce a typed value
    ///
    /// # Errors
    /// `SchemaError` if `raw` does not conform
    fn validate(&self, raw: &Value) -> Result<T, SchemaError>;
}

impl<T, F> Validate<T> for F
where
    F: Fn(&Value) -> Result<T, SchemaError> + Send + Sync,
{
    fn validate(&self, raw: &Value) -> Result<T, SchemaError> {
        self(raw)
    }
}

/// Strict typed decode through serde
pub struct SerdeSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeSchema<T> {
    /// Create validator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SerdeSchema<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeSchema")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned> Validate<T> for SerdeSchema<T> {
    fn validate(&self, raw: &Value) -> Result<T, SchemaError> {
        decode(raw)
    }
}

fn decode<T: DeserializeOwned>(raw: &Value) -> Result<T, SchemaError> {
    T::deserialize(raw).map_err(|e| SchemaError::new("", e.to_string()))
}

/// JSON Schema check followed by a typed decode
///
/// Every violation is reported, not just the first.
pub struct JsonSchemaValidator<T> {
    compiled: JSONSchema,
    schema: Value,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> JsonSchemaValidator<T> {
    /// Compile an explicit schema document
    ///
    /// # Errors
    /// `SchemaError` if `schema` is not a valid JSON Schema
    pub fn new(schema: Value) -> Result<Self, SchemaError> {
        let compiled = JSONSchema::compile(&schema).map_err(|e| {
            SchemaError::new(e.schema_path.to_string(), format!("invalid schema: {e}"))
        })?;
        Ok(Self {
            compiled,
            schema,
            _marker: PhantomData,
        })
    }

    /// Derive the schema from `T`
    ///
    /// # Errors
    /// `SchemaError` if the derived schema cannot be compiled
    pub fn for_type() -> Result<Self, SchemaError>
    where
        T: JsonSchema,
    {
        let root = schemars::schema_for!(T);
        let schema = serde_json::to_value(&root)
            .map_err(|e| SchemaError::new("", format!("unserializable schema: {e}")))?;
        Self::new(schema)
    }

    /// Schema document this validator was compiled from
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }
}

impl<T> fmt::Debug for JsonSchemaValidator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("type", &std::any::type_name::<T>())
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl<T: DeserializeOwned> Validate<T> for JsonSchemaValidator<T> {
    fn validate(&self, raw: &Value) -> Result<T, SchemaError> {
        if let Err(errors) = self.compiled.validate(raw) {
            let violations = errors
                .map(|e| (e.instance_path.to_string(), e.to_string()))
                .collect();
            return Err(SchemaError::from_violations(violations));
        }
        decode(raw)
    }
}
