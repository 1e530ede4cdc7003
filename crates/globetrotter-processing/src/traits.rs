//! Core traits for media processing
//!
//! The processor/transformer split keeps read-only inspection apart from
//! operations that produce new encoded output.

use crate::error::ProcessingError;
use async_trait::async_trait;
use bytes::Bytes;

/// Transform type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformType {
    ImageResize,
    ImageWatermark,
    ImageFormatConvert,
    ImageOptimize,
}

/// Media processor trait - handles metadata extraction and validation
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    type Metadata: Send + Sync;

    /// Extract metadata from media data
    async fn extract_metadata(&self, data: &[u8]) -> Result<Self::Metadata, ProcessingError>;

    /// Validate media data (format, magic bytes, etc.)
    fn validate(&self, data: &[u8]) -> Result<(), ProcessingError>;

    /// Get media dimensions if applicable (width, height)
    fn get_dimensions(&self, data: &[u8]) -> Option<(u32, u32)>;
}

/// Media transformer trait - handles transformations
#[async_trait]
pub trait MediaTransformer: Send + Sync {
    type Options: Send + Sync;

    /// Apply transformation to media data
    async fn transform(&self, data: &[u8], options: Self::Options)
        -> Result<Bytes, ProcessingError>;

    /// List supported transform types
    fn supported_transforms(&self) -> Vec<TransformType>;
}
