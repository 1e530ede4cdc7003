//! Upload gate: byte size, pixel dimensions and format allow-list.
//!
//! Policy rejections are returned as values; nothing here panics or aborts
//! the caller. The size check runs before the buffer is touched, and the
//! dimension check reads only the header, so oversized inputs are turned
//! away without a full decode.

use crate::image::processor::{format_name, ImageProcessor};
use crate::metadata::ImageMetadata;
use globetrotter_core::constants::{
    BYTES_PER_MB, DEFAULT_ALLOWED_FORMATS, DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_MAX_IMAGE_HEIGHT,
    DEFAULT_MAX_IMAGE_WIDTH,
};
use globetrotter_core::ProcessingConfig;
use serde::{Deserialize, Serialize};

/// Reasons an upload is turned away
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("File size exceeds {limit_mb}MB limit")]
    FileTooLarge { limit_mb: f64 },

    #[error("Image dimensions exceed {max_width}x{max_height} limit")]
    DimensionsTooLarge { max_width: u32, max_height: u32 },

    #[error("Image format '{format}' is not allowed. Allowed formats: {}", allowed.join(", "))]
    FormatNotAllowed { format: String, allowed: Vec<String> },

    #[error("Invalid image file")]
    InvalidImage,
}

/// Limits applied by [`ImageValidator`]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationPolicy {
    pub max_size_bytes: usize,
    pub max_width: u32,
    pub max_height: u32,
    /// Lower-case format names, `jpg` folded into `jpeg`
    pub allowed_formats: Vec<String>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_FILE_SIZE_MB * BYTES_PER_MB,
            max_width: DEFAULT_MAX_IMAGE_WIDTH,
            max_height: DEFAULT_MAX_IMAGE_HEIGHT,
            allowed_formats: DEFAULT_ALLOWED_FORMATS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

impl ValidationPolicy {
    pub fn new(
        max_size_bytes: usize,
        max_width: u32,
        max_height: u32,
        allowed_formats: &[String],
    ) -> Self {
        Self {
            max_size_bytes,
            max_width,
            max_height,
            allowed_formats: allowed_formats
                .iter()
                .map(|f| normalize_format(f))
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(
            config.max_file_size_bytes,
            config.max_image_width,
            config.max_image_height,
            &config.allowed_formats,
        )
    }

    fn limit_mb(&self) -> f64 {
        self.max_size_bytes as f64 / BYTES_PER_MB as f64
    }
}

fn normalize_format(format: &str) -> String {
    match format.trim().to_lowercase().as_str() {
        "jpg" => "jpeg".to_string(),
        "tif" => "tiff".to_string(),
        other => other.to_string(),
    }
}

/// Outcome of [`ImageValidator::validate`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
}

#[derive(Debug, Clone, Default)]
pub struct ImageValidator {
    policy: ValidationPolicy,
}

impl ImageValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Run every check in order, stopping at the first rejection.
    ///
    /// On success the full metadata (including EXIF) is returned.
    pub fn check(&self, data: &[u8]) -> Result<ImageMetadata, ValidationError> {
        if data.len() > self.policy.max_size_bytes {
            return Err(ValidationError::FileTooLarge {
                limit_mb: self.policy.limit_mb(),
            });
        }

        let (format, width, height) = ImageProcessor::read_header(data).map_err(|e| {
            tracing::debug!(error = %e, "Rejected undecodable upload");
            ValidationError::InvalidImage
        })?;

        if width > self.policy.max_width || height > self.policy.max_height {
            return Err(ValidationError::DimensionsTooLarge {
                max_width: self.policy.max_width,
                max_height: self.policy.max_height,
            });
        }

        let format = format_name(format);
        if !self.policy.allowed_formats.contains(&format) {
            return Err(ValidationError::FormatNotAllowed {
                format,
                allowed: self.policy.allowed_formats.clone(),
            });
        }

        ImageProcessor::read_metadata(data).map_err(|e| {
            tracing::debug!(error = %e, "Rejected undecodable upload");
            ValidationError::InvalidImage
        })
    }

    pub fn validate(&self, data: &[u8]) -> ValidationResult {
        match self.check(data) {
            Ok(metadata) => ValidationResult {
                valid: true,
                error: None,
                metadata: Some(metadata),
            },
            Err(e) => {
                tracing::info!(size_bytes = data.len(), reason = %e, "Image rejected");
                ValidationResult {
                    valid: false,
                    error: Some(e.to_string()),
                    metadata: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([90, 160, 40]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    #[test]
    fn test_accepts_valid_image() {
        let data = encode(120, 80, ImageFormat::Png);
        let result = ImageValidator::default().validate(&data);

        assert!(result.valid);
        assert_eq!(result.error, None);
        let metadata = result.metadata.unwrap();
        assert_eq!((metadata.width, metadata.height), (120, 80));
        assert_eq!(metadata.format, "png");
    }

    #[test]
    fn test_size_checked_before_decoding() {
        let validator = ImageValidator::new(ValidationPolicy {
            max_size_bytes: 16,
            ..ValidationPolicy::default()
        });
        let result = validator.validate(&[0u8; 17]);
        assert!(!result.valid);
        assert!(result.metadata.is_none());

        let error = result.error.unwrap();
        assert!(error.starts_with("File size exceeds"), "{}", error);
        assert!(error.ends_with("MB limit"), "{}", error);
    }

    #[test]
    fn test_size_limit_in_whole_megabytes() {
        let err = ValidationError::FileTooLarge { limit_mb: 10.0 };
        assert_eq!(err.to_string(), "File size exceeds 10MB limit");
    }

    #[test]
    fn test_rejects_large_dimensions() {
        let validator = ImageValidator::new(ValidationPolicy {
            max_width: 100,
            max_height: 100,
            ..ValidationPolicy::default()
        });
        let result = validator.validate(&encode(101, 50, ImageFormat::Png));
        assert_eq!(
            result.error.as_deref(),
            Some("Image dimensions exceed 100x100 limit")
        );
    }

    #[test]
    fn test_rejects_disallowed_format() {
        let validator = ImageValidator::new(ValidationPolicy::new(
            BYTES_PER_MB,
            4096,
            4096,
            &["JPG".to_string(), " png ".to_string()],
        ));
        assert_eq!(validator.policy().allowed_formats, vec!["jpeg", "png"]);

        let result = validator.validate(&encode(10, 10, ImageFormat::Bmp));
        assert_eq!(
            result.error.as_deref(),
            Some("Image format 'bmp' is not allowed. Allowed formats: jpeg, png")
        );

        assert!(validator.validate(&encode(10, 10, ImageFormat::Jpeg)).valid);
    }

    #[test]
    fn test_rejects_undecodable_input() {
        let result = ImageValidator::default().validate(b"definitely not an image");
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Invalid image file"));

        // Valid header, truncated pixel data
        let img = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, (x ^ y) as u8]));
        let mut data = Vec::new();
        img.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();
        data.truncate(data.len() / 2);
        assert_eq!(
            ImageValidator::default().check(&data),
            Err(ValidationError::InvalidImage)
        );
    }

    #[test]
    fn test_result_serializes_without_absent_fields() {
        let result = ImageValidator::default().validate(b"nope");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "valid": false, "error": "Invalid image file" })
        );
    }
}
