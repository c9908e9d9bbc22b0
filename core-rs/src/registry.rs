/**
 * registry.rs
 * The application's repositories, wired over one DocumentStore
 *
 * Layout under the data root:
 * - core/users.json     array of ServerUser
 * - classes/<id>.json   single-element array holding one ClassEntity
 */

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::errors::Result;
use crate::lock::LockManager;
use crate::model::{ClassEntity, ClientUser, ServerUser};
use crate::repository::{ClientView, CollectionRepository, Repository};
use crate::store::DocumentStore;

pub const USERS_KEY: &str = "core/users";
pub const CLASSES_DIR: &str = "classes";

/// Shared handle to every repository
///
/// Cheap to clone; clones share the same store and lock manager.
#[derive(Debug, Clone)]
pub struct Repositories {
    /// Full user records, credentials included
    pub users_internal: Repository<ServerUser>,
    /// User records without credentials
    pub users: ClientView<ServerUser, ClientUser>,
    pub classes: CollectionRepository<ClassEntity>,
}

impl Repositories {
    pub fn new(store: DocumentStore) -> Self {
        let users_internal = Repository::new(store.clone(), USERS_KEY);
        let users = users_internal.with_client_view();
        let classes = CollectionRepository::new(store, CLASSES_DIR);

        Self {
            users_internal,
            users,
            classes,
        }
    }

    /// Open repositories from config with a fresh lock manager
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let store = DocumentStore::new(config, Arc::new(LockManager::new()))?;
        Ok(Self::new(store))
    }
}
