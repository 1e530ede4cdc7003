//! Types for the upload pipeline.

use crate::error::ProcessingError;
use crate::metadata::ImageMetadata;
use crate::validator::ValidationError;
use chrono::{DateTime, Utc};
use globetrotter_core::{AppError, ProcessingConfig};
use globetrotter_storage::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    /// Keep the uploaded bytes next to the variants
    pub store_original: bool,
    /// Strip EXIF from the stored original (variants never carry it)
    pub remove_exif: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            store_original: false,
            remove_exif: true,
        }
    }
}

impl UploadOptions {
    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self {
            store_original: config.store_original,
            remove_exif: config.remove_exif,
        }
    }
}

/// One object written to storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVariant {
    pub storage_key: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Everything the pipeline produced for one upload, ready to be persisted
/// by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedAsset {
    pub id: Uuid,
    pub original_filename: String,
    pub metadata: ImageMetadata,
    pub variants: BTreeMap<String, StoredVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<StoredVariant>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Image rejected: {0}")]
    Rejected(ValidationError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Rejected(reason) => AppError::ValidationRejected(reason.to_string()),
            UploadError::Processing(e) => e.into(),
            UploadError::Storage(e) => e.into(),
        }
    }
}
