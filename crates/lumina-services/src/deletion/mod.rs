//! Cascade deletion of media assets
//!
//! The engine plans and executes cross-system removal: object bytes
//! (original and variants), the metadata record, search-index entries, cache
//! entries, and best-effort repair of referencing posts/drafts. Single and
//! batched deletion both aggregate partial failures instead of aborting.

pub mod engine;
pub mod references;

pub use engine::DeletionEngine;
pub use references::{MemoryReferenceStore, ReferenceStore};
