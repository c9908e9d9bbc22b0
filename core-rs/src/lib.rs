//! # Grimoire Core - document store and gamification engine
//!
//! Grimoire keeps the state of a gamified classroom (users, classes,
//! quizzes, shop, missions) as plain JSON documents on disk, and applies
//! quiz rewards as single atomic updates of a class document.
//!
//! ## Core Principle
//!
//! **Every read-modify-write is one lock scope**: a document is only ever
//! touched inside the per-path FIFO lock, and repository updates compute
//! their patch from the record read under that same lock.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  services (quiz submission, shop, catalog)  │
//! └──────────────────────┬──────────────────────┘
//!                        │ Patch::Computed
//!     ┌──────────────────┴──────────────────┐
//!     │ Repository / ClientView /            │
//!     │ CollectionRepository                 │
//!     └──────────────────┬──────────────────┘
//!                 ┌──────┴──────┐
//!                 │DocumentStore│──► <dataDir>/<key>.json
//!                 └──────┬──────┘
//!                 ┌──────┴──────┐
//!                 │ LockManager │  per-path FIFO
//!                 └─────────────┘
//! ```

pub mod config;
pub mod errors;
pub mod lock;
pub mod model;
pub mod registry;
pub mod repository;
pub mod schema;
pub mod services;
pub mod store;

pub use config::StoreConfig;
pub use errors::{Result, StoreError, ValidationError};
pub use lock::LockManager;
pub use model::{ClassEntity, ClassUser, ClientUser, ServerUser};
pub use registry::Repositories;
pub use repository::{ClientView, CollectionRepository, Patch, Repository};
pub use schema::{Entity, Schema};
pub use services::{ClassServices, SubmissionResult};
pub use store::{Commit, DocumentStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
