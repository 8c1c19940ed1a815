//! Lumina Core Library
//!
//! This crate provides the domain models, error types, configuration, and
//! validation shared across all Lumina components: media assets and their
//! variants, access policies, deletion plans/results, search queries, and the
//! transformation parameter codec used by signed transformation URLs.

pub mod config;
pub mod error;
pub mod models;
pub mod transform;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, LogLevel};
pub use models::asset::{ImageVariant, MediaAsset, MediaAssetUpdate, TransformationRecord};
pub use models::policy::{AccessPolicy, Actor, PolicyCondition, PolicyEffect};
pub use transform::{TransformParams, TransformValidation};
