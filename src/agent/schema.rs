//! Declared output shapes and their validation.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A type the hosted runtime is asked to produce as JSON.
pub trait StructuredOutput: DeserializeOwned {
    /// Schema name sent with the request and used in error messages.
    const NAME: &'static str;

    /// JSON schema the response must satisfy before deserialization.
    fn schema() -> Value;
}

/// Check `instance` against `schema`, collecting every violation.
pub fn validate(name: &str, schema: &Value, instance: &Value) -> Result<()> {
    let validator = jsonschema::validator_for(schema).map_err(|e| Error::Schema {
        name: name.to_string(),
        message: e.to_string(),
    })?;

    let errors: Vec<String> = validator
        .iter_errors(instance)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation {
            name: name.to_string(),
            errors,
        })
    }
}

/// Validate then deserialize.
pub fn parse<T: StructuredOutput>(instance: Value) -> Result<T> {
    validate(T::NAME, &T::schema(), &instance)?;
    serde_json::from_value(instance).map_err(|e| Error::Deserialization(e.to_string()))
}
