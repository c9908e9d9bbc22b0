//! Lock subsystem
//!
//! Provides the per-document FIFO lock used by the durable store.

mod manager;

pub use manager::LockManager;
