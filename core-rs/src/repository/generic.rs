//! Repository - typed CRUD over an array-shaped document
//!
//! The backing document is a JSON array of records sharing an `id` field.
//! Reads validate the whole array; writes validate the record being written
//! and then persist the full array inside one store transaction.
//!
//! Lookups are linear scans. There is no index.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::marker::PhantomData;
use tracing::{debug, warn};
use uuid::Uuid;

use super::client_view::ClientView;
use super::patch::{matches_fields, shallow_merge, to_fields, Fields, Patch};
use crate::errors::Result;
use crate::schema::{validate, validate_many, Entity};
use crate::store::{Commit, DocumentStore};

/// Typed repository over one array document
pub struct Repository<T> {
    store: DocumentStore,
    key: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").field("key", &self.key).finish()
    }
}

impl<T: Entity> Repository<T> {
    /// Create a repository over document `key`
    ///
    /// # Example
    ///
    /// ```
    /// use grimoire_core::model::ServerUser;
    /// use grimoire_core::repository::Repository;
    /// use grimoire_core::store::DocumentStore;
    ///
    /// let store = DocumentStore::open("/tmp/grimoire-doc").unwrap();
    /// let users: Repository<ServerUser> = Repository::new(store, "core/users");
    /// assert_eq!(users.key(), "core/users");
    /// ```
    pub fn new(store: DocumentStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _record: PhantomData,
        }
    }

    /// Document key backing this repository
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Every record in the document
    ///
    /// If the stored data does not match `T` the failure is logged and an
    /// empty list is returned.
    pub async fn all(&self) -> Result<Vec<T>> {
        let raw: JsonValue = self.store.get(&self.key, empty_document()).await?;
        Ok(self.parse_or_empty(&raw))
    }

    /// Append a new record with a fresh id
    ///
    /// Any `id` present in `input` is replaced.
    pub async fn create<I: Serialize>(&self, input: I) -> Result<T> {
        let mut fields = to_fields(input)?;
        fields.insert(
            "id".to_string(),
            JsonValue::String(Uuid::new_v4().to_string()),
        );
        let record: T = validate(&JsonValue::Object(fields))?;

        self.store
            .transact(&self.key, empty_document(), |raw| {
                let mut records = self.parse_or_empty(&raw);
                records.push(record.clone());
                debug!(key = %self.key, id = record.id(), "record created");
                Ok(Commit::Write(serde_json::to_value(&records)?, record))
            })
            .await
    }

    /// Record with `id`, if any
    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        Ok(self.all().await?.into_iter().find(|record| record.id() == id))
    }

    /// First record whose fields equal every field in `conditions`
    ///
    /// Empty conditions match nothing.
    pub async fn find_first_where<C: Serialize>(&self, conditions: C) -> Result<Option<T>> {
        let conditions = to_fields(conditions)?;
        if conditions.is_empty() {
            return Ok(None);
        }
        Ok(filter_records(self.all().await?, &conditions)?.into_iter().next())
    }

    /// All records whose fields equal every field in `conditions`
    ///
    /// Empty conditions match everything.
    pub async fn find_many_where<C: Serialize>(&self, conditions: C) -> Result<Vec<T>> {
        let conditions = to_fields(conditions)?;
        let records = self.all().await?;
        if conditions.is_empty() {
            return Ok(records);
        }
        filter_records(records, &conditions)
    }

    /// Whether any record matches `conditions`
    ///
    /// Empty conditions match nothing.
    pub async fn exists_where<C: Serialize>(&self, conditions: C) -> Result<bool> {
        Ok(self.find_first_where(conditions).await?.is_some())
    }

    /// Shallow-merge `patch` onto the record with `id`
    ///
    /// Returns `None` (and writes nothing) when `id` is absent. The merged
    /// record is validated before it is persisted; a computed patch that
    /// fails aborts the update.
    pub async fn update(&self, id: &str, patch: Patch<'_, T>) -> Result<Option<T>> {
        self.store
            .transact(&self.key, empty_document(), |raw| self.apply_patch(&raw, id, patch))
            .await
    }

    /// [`Repository::update`] that leaves a missing document missing
    pub(crate) async fn update_existing(&self, id: &str, patch: Patch<'_, T>) -> Result<Option<T>> {
        let updated = self
            .store
            .transact_existing(&self.key, empty_document(), |raw| {
                self.apply_patch(&raw, id, patch)
            })
            .await?;
        Ok(updated.flatten())
    }

    /// [`Repository::find_by_id`] that leaves a missing document missing
    pub(crate) async fn find_existing(&self, id: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get_existing(&self.key, empty_document()).await? else {
            return Ok(None);
        };
        Ok(self.parse_or_empty(&raw).into_iter().find(|record| record.id() == id))
    }

    /// Remove the record with `id`
    ///
    /// Returns `false` without writing if `id` was never present.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        self.store
            .transact(&self.key, empty_document(), |raw| {
                let mut records = self.parse_or_empty(&raw);
                let Some(index) = records.iter().position(|record| record.id() == id) else {
                    return Ok(Commit::Skip(false));
                };

                records.remove(index);
                debug!(key = %self.key, id, "record removed");
                Ok(Commit::Write(serde_json::to_value(&records)?, true))
            })
            .await
    }

    /// Narrow projection of this repository
    ///
    /// Every record leaving the view is re-validated against `C`, so fields
    /// `C` does not declare never pass through.
    pub fn with_client_view<C: Entity>(&self) -> ClientView<T, C> {
        ClientView::new(self.clone())
    }

    fn apply_patch(
        &self,
        raw: &JsonValue,
        id: &str,
        patch: Patch<'_, T>,
    ) -> Result<Commit<JsonValue, Option<T>>> {
        let mut records = self.parse_or_empty(raw);
        let Some(index) = records.iter().position(|record| record.id() == id) else {
            return Ok(Commit::Skip(None));
        };

        let fields = patch.resolve(&records[index])?;
        let merged: T = validate(&shallow_merge(&records[index], fields)?)?;
        records[index] = merged.clone();

        debug!(key = %self.key, id, "record updated");
        Ok(Commit::Write(serde_json::to_value(&records)?, Some(merged)))
    }

    fn parse_or_empty(&self, raw: &JsonValue) -> Vec<T> {
        match validate_many::<T>(raw) {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    key = %self.key,
                    issues = %err,
                    "stored data does not match schema, treating collection as empty"
                );
                Vec::new()
            }
        }
    }
}

fn empty_document() -> JsonValue {
    JsonValue::Array(Vec::new())
}

fn filter_records<T: Serialize>(records: Vec<T>, conditions: &Fields) -> Result<Vec<T>> {
    let mut matched = Vec::new();
    for record in records {
        if matches_fields(&serde_json::to_value(&record)?, conditions) {
            matched.push(record);
        }
    }
    Ok(matched)
}
