//! Storage adapters for the semrepo catalog.
//!
//! Both stores implement [`semrepo_core::MetadataStore`]:
//! - [`MemoryStore`]: concurrent in-memory maps, used by tests and catalog files
//! - [`RedbStore`]: persistent redb database with JSON encoded values
//!
//! [`Catalog`] is the JSON fixture format used to seed either store.

pub mod catalog;
pub mod error;
pub mod memory;
pub mod redb_store;

pub use catalog::Catalog;
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use redb_store::RedbStore;
