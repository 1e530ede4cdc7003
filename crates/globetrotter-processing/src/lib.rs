//! GlobeTrotter Image Processing Library
//!
//! The image pipeline behind photo uploads: metadata extraction (EXIF, GPS),
//! size-tier variant generation, format conversion and web optimization,
//! watermarking and upload validation.

pub mod compression;
pub mod error;
pub mod image;
pub mod metadata;
pub mod traits;
pub mod upload;
pub mod validator;

// Re-export commonly used types
pub use compression::{EncodeOptions, EncodedImage, ImageCompressor, OutputFormat};
pub use error::ProcessingError;
pub use crate::image::{
    FitMode, Gravity, ImageOrientation, ImageProcessor, ImageTransformOptions, ImageTransformer,
    ProcessedVariant, ResizeOptions, SizePreset, VariantGenerator, Watermark, WatermarkConfig,
    WatermarkSize, WebOptimizeOptions,
};
pub use metadata::{ExifData, GpsLocation, ImageMetadata};
pub use traits::{MediaProcessor, MediaTransformer, TransformType};
pub use upload::{upload_image, ProcessedAsset, StoredVariant, UploadError, UploadOptions};
pub use validator::{ImageValidator, ValidationError, ValidationPolicy, ValidationResult};
