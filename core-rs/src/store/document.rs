//! DocumentStore - locked JSON persistence under a data root
//!
//! A document key is a namespaced relative path without extension
//! (`core/users`, `classes/9f2c…`). It resolves to `<root>/<key>.json`.
//! Keys that would escape the root are rejected with `AccessDenied`.
//!
//! Every file access goes through the [`LockManager`] keyed on the resolved
//! absolute path, so one document never sees interleaved read-modify-write
//! cycles.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::errors::{Result, StoreError};
use crate::lock::LockManager;

const DOCUMENT_EXTENSION: &str = "json";

/// Outcome of a [`DocumentStore::transact`] callback
#[derive(Debug)]
pub enum Commit<T, R> {
    /// Persist the new document, then return `R`
    Write(T, R),
    /// Leave the document untouched and return `R`
    Skip(R),
}

/// JSON document store rooted at a data directory
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
    locks: Arc<LockManager>,
}

impl DocumentStore {
    /// Create a store from config, sharing `locks` with other stores
    ///
    /// Stores that may touch the same files must share one lock manager.
    pub fn new(config: &StoreConfig, locks: Arc<LockManager>) -> Result<Self> {
        config.validate()?;
        let root = std::path::absolute(&config.data_dir)?;
        Ok(Self { root, locks })
    }

    /// Create a store with its own lock manager
    ///
    /// # Example
    ///
    /// ```
    /// use grimoire_core::store::DocumentStore;
    ///
    /// let store = DocumentStore::open("/srv/grimoire/data").unwrap();
    /// assert!(store.root().is_absolute());
    /// ```
    pub fn open<P: Into<PathBuf>>(data_dir: P) -> Result<Self> {
        Self::new(
            &StoreConfig::with_data_dir(data_dir),
            Arc::new(LockManager::new()),
        )
    }

    /// Absolute data root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lock manager serializing this store's file access
    pub fn locks(&self) -> &Arc<LockManager> {
        &self.locks
    }

    /// Resolve a document key to its absolute file path
    ///
    /// # Errors
    ///
    /// `AccessDenied` if the key contains `..`, is absolute, or otherwise
    /// resolves outside the data root.
    pub fn resolve(&self, key: &str) -> Result<PathBuf> {
        self.safe_join(key, Some(DOCUMENT_EXTENSION))
    }

    /// Read a document, creating it with `fallback` if it does not exist
    ///
    /// Read and parse failures are not errors: they are logged and `fallback`
    /// is returned instead.
    pub async fn get<T>(&self, key: &str, fallback: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let path = self.resolve(key)?;

        self.locks
            .with_lock(&path, || async {
                ensure_exists(&path, &fallback).await?;
                Ok(read_or_fallback(&path, fallback).await)
            })
            .await
    }

    /// Overwrite a document with pretty-printed JSON
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.resolve(key)?;
        let contents = serde_json::to_string_pretty(value)?;

        self.locks
            .with_lock(&path, || async { write_document(&path, &contents).await })
            .await
    }

    /// Read, transform and optionally rewrite a document under one lock
    ///
    /// The read follows [`DocumentStore::get`] semantics (lazy create,
    /// fail-soft parse). If `apply` returns an error nothing is written.
    pub async fn transact<T, R, F>(&self, key: &str, fallback: T, apply: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(T) -> Result<Commit<T, R>>,
    {
        let path = self.resolve(key)?;

        self.locks
            .with_lock(&path, || async {
                ensure_exists(&path, &fallback).await?;
                let current = read_or_fallback(&path, fallback).await;
                commit(&path, apply(current)?).await
            })
            .await
    }

    /// Read a document under its lock without creating it
    ///
    /// `None` when the file is absent at the moment the lock is held. Parse
    /// failures fall back as in [`DocumentStore::get`].
    pub async fn get_existing<T>(&self, key: &str, fallback: T) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let path = self.resolve(key)?;

        self.locks
            .with_lock(&path, || async {
                if !fs::try_exists(&path).await? {
                    return Ok(None);
                }
                Ok(Some(read_or_fallback(&path, fallback).await))
            })
            .await
    }

    /// [`DocumentStore::transact`] for documents that must already exist
    ///
    /// The existence check happens under the lock, so a document deleted by
    /// an earlier queued task is never recreated; `apply` is not called and
    /// `None` is returned.
    pub async fn transact_existing<T, R, F>(
        &self,
        key: &str,
        fallback: T,
        apply: F,
    ) -> Result<Option<R>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(T) -> Result<Commit<T, R>>,
    {
        let path = self.resolve(key)?;

        self.locks
            .with_lock(&path, || async {
                if !fs::try_exists(&path).await? {
                    return Ok(None);
                }
                let current = read_or_fallback(&path, fallback).await;
                commit(&path, apply(current)?).await.map(Some)
            })
            .await
    }

    /// Write a document only if it does not exist yet
    ///
    /// Returns `false` (and writes nothing) when the file is already there.
    pub async fn create_new<T: Serialize>(&self, key: &str, value: &T) -> Result<bool> {
        let path = self.resolve(key)?;
        let contents = serde_json::to_string_pretty(value)?;

        self.locks
            .with_lock(&path, || async {
                if fs::try_exists(&path).await? {
                    return Ok(false);
                }
                write_document(&path, &contents).await?;
                Ok(true)
            })
            .await
    }

    /// Delete a document
    ///
    /// Returns `false` if the file was already absent.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;

        self.locks
            .with_lock(&path, || async {
                match fs::remove_file(&path).await {
                    Ok(()) => {
                        debug!(path = %path.display(), "document deleted");
                        Ok(true)
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                    Err(e) => Err(StoreError::Io(e)),
                }
            })
            .await
    }

    /// Whether a document file exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    /// List document keys (file stems) directly inside `dir_key`
    ///
    /// Returns an empty list if the directory does not exist. Results are
    /// sorted so scans are deterministic.
    pub async fn list(&self, dir_key: &str) -> Result<Vec<String>> {
        let dir = self.safe_join(dir_key, None)?;

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut stems = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_string());
            }
        }

        stems.sort();
        Ok(stems)
    }

    fn safe_join(&self, key: &str, extension: Option<&str>) -> Result<PathBuf> {
        if key.is_empty() || key.contains("..") {
            return Err(StoreError::AccessDenied(format!(
                "invalid document key '{}'",
                key
            )));
        }

        let relative = match extension {
            Some(ext) => PathBuf::from(format!("{}.{}", key, ext)),
            None => PathBuf::from(key),
        };

        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StoreError::AccessDenied(format!(
                "document key '{}' resolves outside the data directory",
                key
            )));
        }

        let full = self.root.join(relative);
        if !full.starts_with(&self.root) {
            return Err(StoreError::AccessDenied(format!(
                "document key '{}' resolves outside the data directory",
                key
            )));
        }

        Ok(full)
    }
}

async fn ensure_exists<T: Serialize>(path: &Path, initial: &T) -> Result<()> {
    if fs::try_exists(path).await? {
        return Ok(());
    }

    debug!(path = %path.display(), "creating document with fallback");
    let contents = serde_json::to_string_pretty(initial)?;
    write_document(path, &contents).await
}

async fn read_or_fallback<T: DeserializeOwned>(path: &Path, fallback: T) -> T {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read document, using fallback");
            return fallback;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse document, using fallback");
            fallback
        }
    }
}

async fn commit<T: Serialize, R>(path: &Path, outcome: Commit<T, R>) -> Result<R> {
    match outcome {
        Commit::Write(next, output) => {
            let contents = serde_json::to_string_pretty(&next)?;
            write_document(path, &contents).await?;
            Ok(output)
        }
        Commit::Skip(output) => Ok(output),
    }
}

async fn write_document(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, contents).await?;
    debug!(path = %path.display(), bytes = contents.len(), "document written");
    Ok(())
}
