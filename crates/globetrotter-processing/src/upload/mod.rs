//! Upload pipeline: validate → extract → render variants → store.

pub mod pipeline;
pub mod types;

pub use pipeline::upload_image;
pub use types::{ProcessedAsset, StoredVariant, UploadError, UploadOptions};
