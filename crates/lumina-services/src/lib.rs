//! Service layer of the media core
//!
//! Request flow: every entry point passes the [`access::AccessController`]
//! and, for write-heavy operations, the [`rate_limit::RateLimiter`]. On
//! success it touches the metadata store and/or the URL transform service;
//! destructive requests route through the [`deletion::DeletionEngine`].

pub mod access;
pub mod deletion;
pub mod rate_limit;
pub mod telemetry;
pub mod upload;
pub mod url;

pub use access::{AccessContext, AccessController, PolicyStore};
pub use deletion::{DeletionEngine, MemoryReferenceStore, ReferenceStore};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use upload::UploadService;
pub use url::{ParsedTransformUrl, UrlTransformService};
