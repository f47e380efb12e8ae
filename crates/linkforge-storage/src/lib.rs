//! Storage backends for linkforge.
//!
//! Both backends implement [`MappingStore`] on top of the same keyed
//! [`MappingIndex`], and share the creator and query engine from
//! `linkforge_core`.

pub mod error;
pub mod file;
pub mod index;
pub mod memory;

pub use error::StorageError;
pub use file::FileMappingStore;
pub use index::MappingIndex;
pub use linkforge_core::MappingStore;
pub use memory::InMemoryMappingStore;
