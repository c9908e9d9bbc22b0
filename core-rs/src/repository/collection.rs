//! CollectionRepository - one document per entity
//!
//! Large aggregates (a class with all its users, quizzes and posts) live in
//! their own file: `<dir>/<id>.json`, holding a single-element array. Each
//! entity is then its own lock scope: concurrent updates to two different
//! classes never wait on each other, only updates to the same class
//! serialize.
//!
//! The directory listing is the index, so `all()` costs one read per file.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::marker::PhantomData;
use tracing::{debug, warn};
use uuid::Uuid;

use super::generic::Repository;
use super::patch::{matches_fields, to_fields, Patch};
use crate::errors::{Result, StoreError};
use crate::schema::{validate, Entity};
use crate::store::DocumentStore;

static ENTITY_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").unwrap_or_else(|e| panic!("invalid entity id pattern: {}", e))
});

/// Repository storing each entity in its own document
pub struct CollectionRepository<T> {
    store: DocumentStore,
    dir: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for CollectionRepository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            dir: self.dir.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for CollectionRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionRepository")
            .field("dir", &self.dir)
            .finish()
    }
}

impl<T: Entity> CollectionRepository<T> {
    /// Create a collection repository over directory key `dir`
    pub fn new(store: DocumentStore, dir: impl Into<String>) -> Self {
        Self {
            store,
            dir: dir.into(),
            _record: PhantomData,
        }
    }

    /// Directory key holding the entity documents
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// Singleton repository for one entity
    ///
    /// # Errors
    ///
    /// `AccessDenied` if `id` is not a plain `[A-Za-z0-9_-]+` identifier.
    pub fn entity(&self, id: &str) -> Result<Repository<T>> {
        Ok(Repository::new(self.store.clone(), self.entity_key(id)?))
    }

    /// Every entity in the directory
    ///
    /// Unreadable, invalid or empty documents are skipped.
    pub async fn all(&self) -> Result<Vec<T>> {
        let ids = self.store.list(&self.dir).await?;
        let mut entities = Vec::with_capacity(ids.len());

        for id in ids {
            let repository = match self.entity(&id) {
                Ok(repository) => repository,
                Err(e) => {
                    warn!(dir = %self.dir, id = %id, error = %e, "skipping entity document");
                    continue;
                }
            };

            match repository.all().await {
                Ok(records) => entities.extend(records.into_iter().next()),
                Err(e) => {
                    warn!(dir = %self.dir, id = %id, error = %e, "skipping unreadable entity");
                }
            }
        }

        Ok(entities)
    }

    /// Entity with `id`, if its document exists
    ///
    /// A missing document is not created.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        self.entity(id)?.find_existing(id).await
    }

    pub async fn find_first_where<C: Serialize>(&self, conditions: C) -> Result<Option<T>> {
        let conditions = to_fields(conditions)?;
        if conditions.is_empty() {
            return Ok(None);
        }
        for entity in self.all().await? {
            if matches_fields(&serde_json::to_value(&entity)?, &conditions) {
                return Ok(Some(entity));
            }
        }
        Ok(None)
    }

    pub async fn find_many_where<C: Serialize>(&self, conditions: C) -> Result<Vec<T>> {
        let conditions = to_fields(conditions)?;
        let entities = self.all().await?;
        if conditions.is_empty() {
            return Ok(entities);
        }

        let mut matched = Vec::new();
        for entity in entities {
            if matches_fields(&serde_json::to_value(&entity)?, &conditions) {
                matched.push(entity);
            }
        }
        Ok(matched)
    }

    pub async fn exists_where<C: Serialize>(&self, conditions: C) -> Result<bool> {
        Ok(self.find_first_where(conditions).await?.is_some())
    }

    /// Create a new entity document
    ///
    /// Uses `input.id` when present, otherwise a fresh UUID.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if a document for that id is already on disk.
    pub async fn create<I: Serialize>(&self, input: I) -> Result<T> {
        let mut fields = to_fields(input)?;
        let id = match fields.get("id").and_then(JsonValue::as_str) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        fields.insert("id".to_string(), JsonValue::String(id.clone()));

        let key = self.entity_key(&id)?;
        let entity: T = validate(&JsonValue::Object(fields))?;

        if !self.store.create_new(&key, &vec![&entity]).await? {
            return Err(StoreError::AlreadyExists(key));
        }

        debug!(dir = %self.dir, id = %id, "entity created");
        Ok(entity)
    }

    /// Update one entity under its own document lock
    ///
    /// Returns `None` if the entity's document is gone by the time the lock
    /// is held. A removed entity is never recreated.
    pub async fn update(&self, id: &str, patch: Patch<'_, T>) -> Result<Option<T>> {
        self.entity(id)?.update_existing(id, patch).await
    }

    /// Delete the entity document
    ///
    /// A missing document counts as removed.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let key = self.entity_key(id)?;
        if self.store.delete(&key).await? {
            debug!(dir = %self.dir, id, "entity removed");
        }
        Ok(true)
    }

    fn entity_key(&self, id: &str) -> Result<String> {
        if !ENTITY_ID.is_match(id) {
            return Err(StoreError::AccessDenied(format!(
                "invalid entity id '{}'",
                id
            )));
        }
        Ok(format!("{}/{}", self.dir, id))
    }
}
