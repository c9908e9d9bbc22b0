//! ClientView - narrow projection over a repository
//!
//! Wraps a `Repository<T>` and re-validates every record it hands out
//! against the narrower shape `C`. Whatever `T` grows to contain, only the
//! fields `C` declares reach a caller through this view.

use serde::Serialize;
use std::marker::PhantomData;

use super::generic::Repository;
use super::patch::Patch;
use crate::errors::Result;
use crate::schema::{validate, Entity};

/// Repository view exposing records as `C`
pub struct ClientView<T, C> {
    inner: Repository<T>,
    _client: PhantomData<fn() -> C>,
}

impl<T, C> Clone for ClientView<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _client: PhantomData,
        }
    }
}

impl<T, C> std::fmt::Debug for ClientView<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientView").field("inner", &self.inner).finish()
    }
}

impl<T: Entity, C: Entity> ClientView<T, C> {
    pub(crate) fn new(inner: Repository<T>) -> Self {
        Self {
            inner,
            _client: PhantomData,
        }
    }

    /// Project one internal record to the client shape
    pub fn project(record: &T) -> Result<C> {
        Ok(validate(&serde_json::to_value(record)?)?)
    }

    fn project_all(records: Vec<T>) -> Result<Vec<C>> {
        records.iter().map(Self::project).collect()
    }

    pub async fn all(&self) -> Result<Vec<C>> {
        Self::project_all(self.inner.all().await?)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<C>> {
        self.inner
            .find_by_id(id)
            .await?
            .as_ref()
            .map(Self::project)
            .transpose()
    }

    pub async fn find_first_where<Q: Serialize>(&self, conditions: Q) -> Result<Option<C>> {
        self.inner
            .find_first_where(conditions)
            .await?
            .as_ref()
            .map(Self::project)
            .transpose()
    }

    pub async fn find_many_where<Q: Serialize>(&self, conditions: Q) -> Result<Vec<C>> {
        Self::project_all(self.inner.find_many_where(conditions).await?)
    }

    pub async fn exists_where<Q: Serialize>(&self, conditions: Q) -> Result<bool> {
        self.inner.exists_where(conditions).await
    }

    /// Create through the full shape; the result is projected
    pub async fn create<I: Serialize>(&self, input: I) -> Result<C> {
        let created = self.inner.create(input).await?;
        Self::project(&created)
    }

    /// Update through the view
    ///
    /// A computed patch sees the projected record, never the full one.
    pub async fn update<'a>(&self, id: &str, patch: Patch<'a, C>) -> Result<Option<C>> {
        let patch: Patch<'a, T> = match patch {
            Patch::Literal(fields) => Patch::Literal(fields),
            Patch::Computed(compute) => Patch::Computed(Box::new(move |current: &T| {
                let client = Self::project(current)?;
                compute(&client)
            })),
        };

        self.inner
            .update(id, patch)
            .await?
            .as_ref()
            .map(Self::project)
            .transpose()
    }

    pub async fn remove(&self, id: &str) -> Result<bool> {
        self.inner.remove(id).await
    }
}
