//! Partial updates applied by `Repository::update`

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::errors::{Result, StoreError};

/// A partial record: top-level field name → new value
pub type Fields = Map<String, JsonValue>;

/// Boxed compute-then-apply patch function
pub type PatchFn<'a, T> = Box<dyn FnOnce(&T) -> Result<Fields> + Send + 'a>;

/// Update payload
///
/// `Literal` is merged as-is. `Computed` receives the current record inside
/// the document lock and returns the fields to merge, so the read and the
/// write it derives from can never be split by another writer.
pub enum Patch<'a, T> {
    Literal(Fields),
    Computed(PatchFn<'a, T>),
}

impl<'a, T> Patch<'a, T> {
    /// Literal patch from any serializable object
    ///
    /// # Example
    ///
    /// ```
    /// use grimoire_core::model::ClientUser;
    /// use grimoire_core::repository::Patch;
    /// use serde_json::json;
    ///
    /// let patch = Patch::<ClientUser>::literal(json!({"enrollments": ["c-1"]})).unwrap();
    /// assert!(matches!(patch, Patch::Literal(_)));
    /// ```
    pub fn literal<P: Serialize>(partial: P) -> Result<Self> {
        Ok(Patch::Literal(to_fields(partial)?))
    }

    /// Computed patch; `compute` may fail to abort the update
    pub fn computed<F, P>(compute: F) -> Self
    where
        F: FnOnce(&T) -> Result<P> + Send + 'a,
        P: Serialize,
    {
        Patch::Computed(Box::new(move |current| to_fields(compute(current)?)))
    }

    pub(crate) fn resolve(self, current: &T) -> Result<Fields> {
        match self {
            Patch::Literal(fields) => Ok(fields),
            Patch::Computed(compute) => compute(current),
        }
    }
}

impl<T> std::fmt::Debug for Patch<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Patch::Literal(fields) => f.debug_tuple("Literal").field(fields).finish(),
            Patch::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Serialize `value` into a field map; non-objects are rejected
pub fn to_fields<P: Serialize>(value: P) -> Result<Fields> {
    match serde_json::to_value(value)? {
        JsonValue::Object(fields) => Ok(fields),
        other => Err(StoreError::InvalidInput(format!(
            "expected an object of fields, got {}",
            other
        ))),
    }
}

/// Shallow merge: every top-level field in `patch` replaces the current one
///
/// `id` is never overwritten.
pub(crate) fn shallow_merge<T: Serialize>(current: &T, patch: Fields) -> Result<JsonValue> {
    let mut merged = to_fields(current)?;
    for (field, value) in patch {
        if field == "id" {
            continue;
        }
        merged.insert(field, value);
    }
    Ok(JsonValue::Object(merged))
}

/// Field-equality match of a serialized record against `conditions`
pub(crate) fn matches_fields(record: &JsonValue, conditions: &Fields) -> bool {
    conditions
        .iter()
        .all(|(field, expected)| record.get(field) == Some(expected))
}
