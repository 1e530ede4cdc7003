//! Image transformer - format conversion, web optimization, resizing and
//! watermarking of single images.

use super::processor::ImageProcessor;
use super::resize::{ImageResize, ResizeOptions};
use super::watermark::{Watermark, WatermarkConfig};
use crate::compression::{EncodeOptions, EncodedImage, ImageCompressor, OutputFormat};
use crate::error::ProcessingError;
use crate::traits::{MediaTransformer, TransformType};
use async_trait::async_trait;
use bytes::Bytes;
use globetrotter_core::ProcessingConfig;
use image::GenericImageView;

/// Bounding box and encoding for web delivery
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebOptimizeOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub format: OutputFormat,
    pub quality: u8,
}

impl Default for WebOptimizeOptions {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            format: OutputFormat::WebP,
            quality: 85,
        }
    }
}

impl WebOptimizeOptions {
    pub fn from_config(config: &ProcessingConfig) -> Result<Self, ProcessingError> {
        Ok(Self {
            max_width: config.web_max_width,
            max_height: config.web_max_height,
            format: OutputFormat::parse(&config.web_format)?,
            quality: config.web_quality,
        })
    }

    /// Dimensions after fitting `width`x`height` into the bounding box.
    ///
    /// Both sides are scaled by `min(max_width / width, max_height / height)`
    /// when the image exceeds the box; smaller images keep their size.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if width <= self.max_width && height <= self.max_height {
            return (width, height);
        }

        let ratio = (self.max_width as f64 / width as f64).min(self.max_height as f64 / height as f64);
        let new_width = ((width as f64 * ratio).round() as u32).clamp(1, self.max_width);
        let new_height = ((height as f64 * ratio).round() as u32).clamp(1, self.max_height);
        (new_width, new_height)
    }
}

/// Options for [`MediaTransformer::transform`] on images
#[derive(Debug, Clone)]
pub enum ImageTransformOptions {
    Convert {
        format: String,
        encode: EncodeOptions,
    },
    OptimizeForWeb(WebOptimizeOptions),
    Resize {
        resize: ResizeOptions,
        format: OutputFormat,
        encode: EncodeOptions,
    },
    Watermark {
        watermark: Bytes,
        config: WatermarkConfig,
        format: OutputFormat,
        encode: EncodeOptions,
    },
}

pub struct ImageTransformer;

impl ImageTransformer {
    /// Re-encode `data` as `format` (`jpeg`, `png`, `webp`, `avif` or `tiff`).
    ///
    /// The target is checked before anything is decoded, so an unsupported
    /// format never produces output. Pixels are kept as stored.
    pub fn convert(
        data: &[u8],
        format: &str,
        encode: &EncodeOptions,
    ) -> Result<EncodedImage, ProcessingError> {
        let target = OutputFormat::parse(format)?;
        encode.validate()?;

        let (img, source_format) = ImageProcessor::decode(data)?;
        let encoded = ImageCompressor::encode(&img, target, encode)?;

        tracing::info!(
            from = ?source_format,
            to = %target,
            input_bytes = data.len(),
            output_bytes = encoded.data.len(),
            "Converted image"
        );

        Ok(encoded)
    }

    /// Upright, bounding-box limited, re-encoded copy for web delivery
    pub fn optimize_for_web(
        data: &[u8],
        options: &WebOptimizeOptions,
    ) -> Result<EncodedImage, ProcessingError> {
        if options.max_width == 0 || options.max_height == 0 {
            return Err(ProcessingError::InvalidOptions(
                "Web bounding box must be non-zero".to_string(),
            ));
        }
        let encode = EncodeOptions::with_quality(options.quality);
        encode.validate()?;

        let img = ImageProcessor::decode_oriented(data)?;
        let (width, height) = img.dimensions();
        let (target_width, target_height) = options.target_dimensions(width, height);

        // The box already has the image's aspect ratio, so fitting it with
        // contain is an exact resize with no padding.
        let img = if (target_width, target_height) != (width, height) {
            ImageResize::resize_image(&img, target_width, target_height)
        } else {
            img
        };

        let encoded = ImageCompressor::encode(&img, options.format, &encode)?;

        tracing::info!(
            original_width = width,
            original_height = height,
            width = encoded.width,
            height = encoded.height,
            format = %options.format,
            output_bytes = encoded.data.len(),
            "Optimized image for web"
        );

        Ok(encoded)
    }

    /// Upright copy resized into `resize`'s box
    pub fn resize(
        data: &[u8],
        resize: &ResizeOptions,
        format: OutputFormat,
        encode: &EncodeOptions,
    ) -> Result<EncodedImage, ProcessingError> {
        resize.validate()?;
        encode.validate()?;

        let img = ImageProcessor::decode_oriented(data)?;
        let resized = ImageResize::apply(&img, resize);
        ImageCompressor::encode(&resized, format, encode)
    }

    /// Upright copy with `watermark` overlaid
    pub fn watermark(
        data: &[u8],
        watermark: &[u8],
        config: &WatermarkConfig,
        format: OutputFormat,
        encode: &EncodeOptions,
    ) -> Result<EncodedImage, ProcessingError> {
        config.validate()?;
        encode.validate()?;

        let img = ImageProcessor::decode_oriented(data)?;
        let marked = Watermark::apply(img, watermark, config)?;
        ImageCompressor::encode(&marked, format, encode)
    }

    fn apply(data: &[u8], options: ImageTransformOptions) -> Result<EncodedImage, ProcessingError> {
        match options {
            ImageTransformOptions::Convert { format, encode } => {
                Self::convert(data, &format, &encode)
            }
            ImageTransformOptions::OptimizeForWeb(web) => Self::optimize_for_web(data, &web),
            ImageTransformOptions::Resize {
                resize,
                format,
                encode,
            } => Self::resize(data, &resize, format, &encode),
            ImageTransformOptions::Watermark {
                watermark,
                config,
                format,
                encode,
            } => Self::watermark(data, &watermark, &config, format, &encode),
        }
    }
}

#[async_trait]
impl MediaTransformer for ImageTransformer {
    type Options = ImageTransformOptions;

    async fn transform(&self, data: &[u8], options: Self::Options) -> Result<Bytes, ProcessingError> {
        let data = data.to_vec();
        let encoded = tokio::task::spawn_blocking(move || Self::apply(&data, options)).await??;
        Ok(encoded.data)
    }

    fn supported_transforms(&self) -> Vec<TransformType> {
        vec![
            TransformType::ImageFormatConvert,
            TransformType::ImageOptimize,
            TransformType::ImageResize,
            TransformType::ImageWatermark,
        ]
    }
}
