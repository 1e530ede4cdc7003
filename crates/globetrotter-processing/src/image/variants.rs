//! Size-tier variant generation
//!
//! One upload becomes several renditions (thumbnail, medium, large, ...).
//! The source is decoded and oriented once; every preset is then resized
//! and encoded on its own blocking task.

use super::processor::ImageProcessor;
use super::resize::{FitMode, Gravity, ImageResize, ResizeOptions};
use crate::compression::{EncodeOptions, EncodedImage, ImageCompressor, OutputFormat};
use crate::error::ProcessingError;
use bytes::Bytes;
use globetrotter_core::ProcessingConfig;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Target box and quality for one rendition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizePreset {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl SizePreset {
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width,
            height,
            quality,
        }
    }

    /// thumbnail 300x300 q70, medium 800x800 q80, large 1200x1200 q90
    pub fn defaults() -> BTreeMap<String, SizePreset> {
        BTreeMap::from([
            ("thumbnail".to_string(), SizePreset::new(300, 300, 70)),
            ("medium".to_string(), SizePreset::new(800, 800, 80)),
            ("large".to_string(), SizePreset::new(1200, 1200, 90)),
        ])
    }
}

/// One encoded rendition, tagged with the preset that produced it
#[derive(Debug, Clone)]
pub struct ProcessedVariant {
    pub name: String,
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

impl ProcessedVariant {
    fn from_encoded(name: String, encoded: EncodedImage) -> Self {
        Self {
            name,
            data: encoded.data,
            width: encoded.width,
            height: encoded.height,
            format: encoded.format,
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Renders every configured preset from a single source image
#[derive(Debug, Clone)]
pub struct VariantGenerator {
    presets: BTreeMap<String, SizePreset>,
    format: OutputFormat,
    fit: FitMode,
    gravity: Gravity,
    encode: EncodeOptions,
}

impl Default for VariantGenerator {
    fn default() -> Self {
        Self {
            presets: SizePreset::defaults(),
            format: OutputFormat::Jpeg,
            fit: FitMode::Cover,
            gravity: Gravity::Center,
            encode: EncodeOptions::default(),
        }
    }
}

impl VariantGenerator {
    pub fn new(presets: BTreeMap<String, SizePreset>) -> Result<Self, ProcessingError> {
        if presets.is_empty() {
            return Err(ProcessingError::InvalidOptions(
                "At least one size preset is required".to_string(),
            ));
        }
        for (name, preset) in &presets {
            if preset.width == 0 || preset.height == 0 {
                return Err(ProcessingError::InvalidOptions(format!(
                    "Preset '{}' must have non-zero dimensions",
                    name
                )));
            }
            if !(1..=100).contains(&preset.quality) {
                return Err(ProcessingError::InvalidOptions(format!(
                    "Preset '{}' quality must be between 1 and 100",
                    name
                )));
            }
        }

        Ok(Self {
            presets,
            ..Self::default()
        })
    }

    /// Build from the `IMAGE_VARIANTS` / `VARIANT_*` settings
    pub fn from_config(config: &ProcessingConfig) -> Result<Self, ProcessingError> {
        let presets = config
            .variant_presets
            .iter()
            .map(|p| (p.name.clone(), SizePreset::new(p.width, p.height, p.quality)))
            .collect();

        Ok(Self::new(presets)?
            .with_format(OutputFormat::parse(&config.variant_format)?)
            .with_fit(FitMode::parse(&config.variant_fit)?)
            .with_gravity(Gravity::parse(&config.variant_position)?))
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_fit(mut self, fit: FitMode) -> Self {
        self.fit = fit;
        self
    }

    pub fn with_gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = gravity;
        self
    }

    /// Encoder settings shared by every preset; `quality` is replaced by the
    /// preset's own value.
    pub fn with_encode_options(mut self, encode: EncodeOptions) -> Self {
        self.encode = encode;
        self
    }

    pub fn presets(&self) -> &BTreeMap<String, SizePreset> {
        &self.presets
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Produce one variant per preset.
    ///
    /// Renders run concurrently on the blocking pool. The first failure
    /// aborts the batch; no partial map is returned.
    pub async fn generate(
        &self,
        data: Bytes,
    ) -> Result<BTreeMap<String, ProcessedVariant>, ProcessingError> {
        let start = std::time::Instant::now();
        let source =
            Arc::new(tokio::task::spawn_blocking(move || ImageProcessor::decode_oriented(&data)).await??);

        let mut tasks = JoinSet::new();
        for (name, preset) in &self.presets {
            let source = Arc::clone(&source);
            let name = name.clone();
            let preset = *preset;
            let (format, fit, gravity, encode) = (self.format, self.fit, self.gravity, self.encode);

            tasks.spawn_blocking(move || {
                let options = ResizeOptions {
                    width: preset.width,
                    height: preset.height,
                    fit,
                    gravity,
                    without_enlargement: true,
                };
                let encode = EncodeOptions {
                    quality: preset.quality,
                    ..encode
                };
                render(&source, &options, format, &encode)
                    .map(|encoded| ProcessedVariant::from_encoded(name, encoded))
            });
        }

        let mut variants = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let variant = match joined {
                Ok(Ok(variant)) => variant,
                Ok(Err(e)) => {
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(e.into());
                }
            };

            tracing::debug!(
                variant = %variant.name,
                width = variant.width,
                height = variant.height,
                size_bytes = variant.size_bytes(),
                "Rendered variant"
            );
            variants.insert(variant.name.clone(), variant);
        }

        tracing::info!(
            variants = variants.len(),
            format = %self.format,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Generated image variants"
        );

        Ok(variants)
    }
}

fn render(
    source: &DynamicImage,
    options: &ResizeOptions,
    format: OutputFormat,
    encode: &EncodeOptions,
) -> Result<EncodedImage, ProcessingError> {
    let resized = ImageResize::apply(source, options);
    ImageCompressor::encode(&resized, format, encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use globetrotter_core::PresetConfig;
    use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Bytes {
        let img = RgbaImage::from_pixel(width, height, Rgba([20, 120, 220, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        Bytes::from(buffer)
    }

    #[test]
    fn test_default_presets_match_config_defaults() {
        let from_config =
            PresetConfig::parse_list(globetrotter_core::constants::DEFAULT_IMAGE_VARIANTS).unwrap();
        let defaults = SizePreset::defaults();

        assert_eq!(from_config.len(), defaults.len());
        for preset in from_config {
            assert_eq!(
                defaults[&preset.name],
                SizePreset::new(preset.width, preset.height, preset.quality)
            );
        }
    }

    #[test]
    fn test_new_rejects_bad_presets() {
        assert!(VariantGenerator::new(BTreeMap::new()).is_err());

        let zero = BTreeMap::from([("tiny".to_string(), SizePreset::new(0, 10, 50))]);
        assert!(VariantGenerator::new(zero).is_err());

        let quality = BTreeMap::from([("q".to_string(), SizePreset::new(10, 10, 0))]);
        assert!(VariantGenerator::new(quality).is_err());
    }

    #[tokio::test]
    async fn test_generate_one_variant_per_preset() {
        let generator = VariantGenerator::default();
        let variants = generator.generate(png(1600, 1000)).await.unwrap();

        let names: Vec<&str> = variants.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["large", "medium", "thumbnail"]);

        for (name, variant) in &variants {
            let preset = generator.presets()[name];
            assert_eq!(variant.name, *name);
            assert!(variant.width <= preset.width && variant.height <= preset.height);
            assert_eq!(variant.content_type(), "image/jpeg");

            let decoded = image::load_from_memory(&variant.data).unwrap();
            assert_eq!(decoded.dimensions(), (variant.width, variant.height));
        }

        assert_eq!(
            (variants["thumbnail"].width, variants["thumbnail"].height),
            (300, 300)
        );
        assert_eq!((variants["large"].width, variants["large"].height), (1200, 1000));
    }

    #[tokio::test]
    async fn test_generate_never_enlarges_small_sources() {
        let variants = VariantGenerator::default().generate(png(120, 90)).await.unwrap();
        for variant in variants.values() {
            assert_eq!((variant.width, variant.height), (120, 90));
        }
    }

    #[tokio::test]
    async fn test_generate_with_custom_format_and_fit() {
        let presets = BTreeMap::from([("card".to_string(), SizePreset::new(200, 200, 75))]);
        let generator = VariantGenerator::new(presets)
            .unwrap()
            .with_format(OutputFormat::WebP)
            .with_fit(FitMode::Inside);

        let variants = generator.generate(png(800, 400)).await.unwrap();
        let card = &variants["card"];
        assert_eq!((card.width, card.height), (200, 100));
        assert_eq!(card.content_type(), "image/webp");
    }

    #[tokio::test]
    async fn test_generate_fails_whole_batch_when_a_render_fails() {
        let generator = VariantGenerator::default()
            .with_format(OutputFormat::Png)
            .with_encode_options(EncodeOptions {
                compression_level: 12,
                ..EncodeOptions::default()
            });

        let result = generator.generate(png(640, 480)).await;
        assert!(
            matches!(result, Err(ProcessingError::InvalidOptions(_))),
            "{:?}",
            result.map(|variants| variants.into_keys().collect::<Vec<_>>())
        );
    }

    #[tokio::test]
    async fn test_generate_rejects_non_image() {
        let result = VariantGenerator::default()
            .generate(Bytes::from_static(b"not an image"))
            .await;
        assert!(matches!(result, Err(ProcessingError::Decode(_))));
    }
}
