// store/mod.rs - Durable document storage

pub mod document;

pub use document::{Commit, DocumentStore};
