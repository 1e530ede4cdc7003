//! GlobeTrotter Storage Library
//!
//! Blob storage contract used by the upload pipeline, plus a local filesystem
//! backend.
//!
//! # Storage key format
//!
//! Processed images are stored per asset:
//!
//! - **Variants**: `images/{asset_id}/{preset}.{ext}`
//! - **Original**: `images/{asset_id}/original.{ext}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation lives in the
//! `keys` module so every backend stays consistent.

pub mod keys;
pub mod local;
pub mod traits;

pub use keys::{asset_key, ORIGINAL_KEY_NAME};
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};

use globetrotter_core::AppError;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(key),
            other => AppError::Storage(other.to_string()),
        }
    }
}
