//! Shape validation at store boundaries
//!
//! Every record that crosses the store boundary goes through [`validate`]:
//! structural shape is checked by deserializing into the target type, and
//! value-level refinements (ranges, cross-field rules) by [`Schema::check`].
//!
//! Fields that the target type does not declare are dropped during
//! deserialization. Client views rely on this to strip credentials.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::errors::ValidationError;

/// A validated record shape
pub trait Schema: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Refinements beyond structural shape
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// A record stored in an array-shaped collection, identified by `id`
pub trait Entity: Schema {
    fn id(&self) -> &str;
}

/// Validate a single JSON value against `T`
pub fn validate<T: Schema>(value: &JsonValue) -> Result<T, ValidationError> {
    let parsed = T::deserialize(value).map_err(|e| ValidationError::new(e.to_string()))?;
    parsed.check()?;
    Ok(parsed)
}

/// Validate a JSON array whose every element must match `T`
///
/// Issues from all elements are collected, each prefixed with its index.
pub fn validate_many<T: Schema>(value: &JsonValue) -> Result<Vec<T>, ValidationError> {
    let items = value.as_array().ok_or_else(|| {
        ValidationError::new(format!("expected an array, found {}", json_kind(value)))
    })?;

    let mut records = Vec::with_capacity(items.len());
    let mut issues = Vec::new();

    for (index, item) in items.iter().enumerate() {
        match validate::<T>(item) {
            Ok(record) => records.push(record),
            Err(err) => issues.extend(err.at(&format!("[{}]", index)).issues),
        }
    }

    if issues.is_empty() {
        Ok(records)
    } else {
        Err(ValidationError::from_issues(issues))
    }
}

/// Collects refinement failures for [`Schema::check`] implementations
#[derive(Debug, Default)]
pub struct Issues(Vec<String>);

impl Issues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` unless `condition` holds
    pub fn ensure(&mut self, condition: bool, message: impl FnOnce() -> String) {
        if !condition {
            self.0.push(message());
        }
    }

    /// Fold a nested record's failures in under `location`
    pub fn nested(&mut self, location: &str, result: Result<(), ValidationError>) {
        if let Err(err) = result {
            self.0.extend(err.at(location).issues);
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::from_issues(self.0))
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
