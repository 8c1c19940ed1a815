//! Storage abstraction for the media core
//!
//! Defines the [`ObjectStorage`] contract all backends implement, the shared
//! key-naming conventions, and an in-memory backend used by tests and local
//! development.
//!
//! **Key format:** originals live at `images/{owner_id}_{file_name}`,
//! derivatives at `images/{asset_id}/variants/{width}w.{format}`. See
//! [`keys`] for the helpers every caller must use.

pub mod keys;
pub mod memory;
pub mod traits;

pub use memory::MemoryObjectStorage;
pub use traits::{ObjectInfo, ObjectStorage, PresignMethod, StorageError, StorageResult};
