// repository/mod.rs - Typed repositories over the document store

pub mod client_view;
pub mod collection;
pub mod generic;
pub mod patch;

pub use client_view::ClientView;
pub use collection::CollectionRepository;
pub use generic::Repository;
pub use patch::{to_fields, Fields, Patch};
