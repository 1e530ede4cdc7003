//! Image processing module
//!
//! This module provides image processing capabilities including:
//! - Metadata and EXIF extraction (processor, exif)
//! - Single-image transforms (transformer, resize, orientation, watermark)
//! - Size-tier renditions (variants)

pub mod exif;
pub mod orientation;
pub mod processor;
pub mod resize;
pub mod transformer;
pub mod variants;
pub mod watermark;

pub use processor::ImageProcessor;
pub use transformer::{ImageTransformOptions, ImageTransformer, WebOptimizeOptions};

// Re-export commonly used types
pub use orientation::ImageOrientation;
pub use resize::{FitMode, Gravity, ImageResize, ResizeOptions};
pub use variants::{ProcessedVariant, SizePreset, VariantGenerator};
pub use watermark::{Watermark, WatermarkConfig, WatermarkSize};
