//! Configuration module
//!
//! Processing limits, size presets, web-optimization defaults and the local
//! storage location. Values come from the environment (after loading `.env`)
//! or from a [`ConfigStore`]; every field has a constant default.

use std::collections::HashSet;
use std::env;

use crate::config_store::ConfigStore;
use crate::constants::*;
use crate::error::AppError;

/// One named output rendition, as configured (`thumbnail:300x300:70`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresetConfig {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl PresetConfig {
    /// Parse a single `name:WIDTHxHEIGHT:QUALITY` entry
    pub fn parse(s: &str) -> Result<Self, AppError> {
        let invalid = || {
            AppError::Config(format!(
                "Invalid preset '{}'. Expected: name:WIDTHxHEIGHT:QUALITY",
                s
            ))
        };

        let mut parts = s.trim().split(':');
        let name = parts.next().map(str::trim).filter(|n| !n.is_empty());
        let dims = parts.next();
        let quality = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }

        let name = name.ok_or_else(invalid)?;
        let (width, height) = dims
            .and_then(|d| d.trim().split_once('x'))
            .ok_or_else(invalid)?;
        let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = height.trim().parse::<u32>().map_err(|_| invalid())?;
        let quality = quality
            .ok_or_else(invalid)?
            .trim()
            .parse::<u8>()
            .map_err(|_| invalid())?;

        Ok(PresetConfig {
            name: name.to_string(),
            width,
            height,
            quality,
        })
    }

    /// Parse a comma separated preset list
    pub fn parse_list(s: &str) -> Result<Vec<Self>, AppError> {
        s.split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}

/// Image pipeline configuration
#[derive(Clone, Debug)]
pub struct ProcessingConfig {
    pub environment: String,
    // Validator policy
    pub max_file_size_bytes: usize,
    pub max_image_width: u32,
    pub max_image_height: u32,
    pub allowed_formats: Vec<String>,
    // Variant generation
    pub variant_presets: Vec<PresetConfig>,
    pub variant_format: String,
    pub variant_fit: String,
    pub variant_position: String,
    // Web optimization
    pub web_max_width: u32,
    pub web_max_height: u32,
    pub web_format: String,
    pub web_quality: u8,
    // Watermarking
    pub watermark_position: String,
    pub watermark_opacity: f32,
    pub watermark_margin: u32,
    // Upload behavior
    pub remove_exif: bool,
    pub store_original: bool,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    // Read by the request-handling collaborator; kept here so the config
    // store is the single place it is edited.
    pub rate_limit_per_minute: u32,
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_bool_or(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| v.trim().to_lowercase())
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(default)
}

fn parse_list(value: Option<String>, default: &[&str]) -> Vec<String> {
    match value {
        Some(v) => v
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect(),
        None => default.iter().map(|s| s.to_string()).collect(),
    }
}

impl ProcessingConfig {
    /// Load configuration from the process environment, reading `.env` first.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a config store (e.g. an edited `.env` file).
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self, AppError> {
        Self::from_lookup(|key| store.get(key))
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Unparseable numbers and booleans fall back to their defaults; preset
    /// syntax errors and out-of-range values are rejected by [`Self::validate`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let max_file_size_mb: usize = parse_or(lookup("MAX_FILE_SIZE_MB"), DEFAULT_MAX_FILE_SIZE_MB);
        let max_file_size_bytes = max_file_size_mb.checked_mul(BYTES_PER_MB).ok_or_else(|| {
            AppError::Config(format!(
                "MAX_FILE_SIZE_MB is too large: {}",
                max_file_size_mb
            ))
        })?;

        let variant_presets = PresetConfig::parse_list(
            &lookup("IMAGE_VARIANTS").unwrap_or_else(|| DEFAULT_IMAGE_VARIANTS.to_string()),
        )?;

        let config = ProcessingConfig {
            environment,
            max_file_size_bytes,
            max_image_width: parse_or(lookup("MAX_IMAGE_WIDTH"), DEFAULT_MAX_IMAGE_WIDTH),
            max_image_height: parse_or(lookup("MAX_IMAGE_HEIGHT"), DEFAULT_MAX_IMAGE_HEIGHT),
            allowed_formats: parse_list(lookup("ALLOWED_IMAGE_FORMATS"), DEFAULT_ALLOWED_FORMATS),
            variant_presets,
            variant_format: lookup("VARIANT_FORMAT")
                .unwrap_or_else(|| DEFAULT_VARIANT_FORMAT.to_string())
                .to_lowercase(),
            variant_fit: lookup("VARIANT_FIT")
                .unwrap_or_else(|| DEFAULT_VARIANT_FIT.to_string())
                .to_lowercase(),
            variant_position: lookup("VARIANT_POSITION")
                .unwrap_or_else(|| DEFAULT_VARIANT_POSITION.to_string())
                .to_lowercase(),
            web_max_width: parse_or(lookup("WEB_MAX_WIDTH"), DEFAULT_WEB_MAX_WIDTH),
            web_max_height: parse_or(lookup("WEB_MAX_HEIGHT"), DEFAULT_WEB_MAX_HEIGHT),
            web_format: lookup("WEB_FORMAT")
                .unwrap_or_else(|| DEFAULT_WEB_FORMAT.to_string())
                .to_lowercase(),
            web_quality: parse_or(lookup("WEB_QUALITY"), DEFAULT_WEB_QUALITY),
            watermark_position: lookup("WATERMARK_POSITION")
                .unwrap_or_else(|| DEFAULT_WATERMARK_POSITION.to_string())
                .to_lowercase(),
            watermark_opacity: parse_or(lookup("WATERMARK_OPACITY"), DEFAULT_WATERMARK_OPACITY),
            watermark_margin: parse_or(lookup("WATERMARK_MARGIN"), DEFAULT_WATERMARK_MARGIN),
            remove_exif: parse_bool_or(lookup("REMOVE_EXIF"), true),
            store_original: parse_bool_or(lookup("STORE_ORIGINAL"), false),
            local_storage_path: lookup("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|| DEFAULT_LOCAL_STORAGE_PATH.to_string()),
            local_storage_base_url: lookup("LOCAL_STORAGE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LOCAL_STORAGE_BASE_URL.to_string()),
            rate_limit_per_minute: parse_or(
                lookup("RATE_LIMIT_PER_MINUTE"),
                DEFAULT_RATE_LIMIT_PER_MINUTE,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_file_size_bytes == 0 {
            return Err(AppError::Config(
                "MAX_FILE_SIZE_MB must be greater than 0".to_string(),
            ));
        }

        if self.max_image_width == 0 || self.max_image_height == 0 {
            return Err(AppError::Config(
                "MAX_IMAGE_WIDTH and MAX_IMAGE_HEIGHT must be greater than 0".to_string(),
            ));
        }

        if self.allowed_formats.is_empty() {
            return Err(AppError::Config(
                "ALLOWED_IMAGE_FORMATS must list at least one format".to_string(),
            ));
        }

        if self.variant_presets.is_empty() {
            return Err(AppError::Config(
                "IMAGE_VARIANTS must define at least one preset".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for preset in &self.variant_presets {
            if !seen.insert(preset.name.as_str()) {
                return Err(AppError::Config(format!(
                    "Duplicate preset name in IMAGE_VARIANTS: {}",
                    preset.name
                )));
            }
            if preset.width == 0 || preset.height == 0 {
                return Err(AppError::Config(format!(
                    "Preset '{}' must have non-zero dimensions",
                    preset.name
                )));
            }
            if !(1..=100).contains(&preset.quality) {
                return Err(AppError::Config(format!(
                    "Preset '{}' quality must be between 1 and 100",
                    preset.name
                )));
            }
        }

        if self.web_max_width == 0 || self.web_max_height == 0 {
            return Err(AppError::Config(
                "WEB_MAX_WIDTH and WEB_MAX_HEIGHT must be greater than 0".to_string(),
            ));
        }

        if !(1..=100).contains(&self.web_quality) {
            return Err(AppError::Config(
                "WEB_QUALITY must be between 1 and 100".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.watermark_opacity) {
            return Err(AppError::Config(
                "WATERMARK_OPACITY must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }
}
