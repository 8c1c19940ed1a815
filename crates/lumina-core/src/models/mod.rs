pub mod asset;
pub mod deletion;
pub mod policy;
pub mod search;
pub mod upload;

pub use asset::{
    ImageVariant, MediaAsset, MediaAssetUpdate, TransformationKind, TransformationRecord,
    Visibility,
};
pub use deletion::{
    BatchDeletionResult, BatchDeletionSummary, DeletionOptions, DeletionPlan, DeletionResult,
    DeletionState,
};
pub use policy::{AccessPolicy, Actor, PolicyCondition, PolicyEffect};
pub use search::{
    size_bucket_label, FacetCount, Facets, SearchPage, SearchQuery, SortBy, SortOrder,
    SIZE_BUCKETS,
};
pub use upload::{UploadUrlRequest, UploadUrlResponse};
