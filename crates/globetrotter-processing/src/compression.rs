use crate::error::ProcessingError;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

/// Output format for encoded images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
    Avif,
    Tiff,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::WebP,
        OutputFormat::Avif,
        OutputFormat::Tiff,
    ];

    pub fn parse(s: &str) -> Result<Self, ProcessingError> {
        match s.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            "tiff" | "tif" => Ok(OutputFormat::Tiff),
            _ => Err(ProcessingError::UnsupportedFormat(format!(
                "'{}' (supported: jpeg, png, webp, avif, tiff)",
                s
            ))),
        }
    }

    /// Lower-case name, as used in configuration and metadata
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Tiff => "tiff",
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Avif => "image/avif",
            OutputFormat::Tiff => "image/tiff",
        }
    }

    /// File extension used for storage keys
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Tiff => "tiff",
        }
    }

    pub fn to_image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::WebP => ImageFormat::WebP,
            OutputFormat::Avif => ImageFormat::Avif,
            OutputFormat::Tiff => ImageFormat::Tiff,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encoder settings. Each field only applies to the formats noted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeOptions {
    /// 1-100; JPEG, WebP (lossy) and AVIF
    pub quality: u8,
    /// JPEG progressive scans
    pub progressive: bool,
    /// WebP lossless mode
    pub lossless: bool,
    /// PNG deflate effort, 0-9
    pub compression_level: u8,
    /// AVIF encoder speed, 1 (slowest) to 10
    pub speed: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            quality: 80,
            progressive: true,
            lossless: false,
            compression_level: 6,
            speed: 6,
        }
    }
}

impl EncodeOptions {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ProcessingError> {
        if !(1..=100).contains(&self.quality) {
            return Err(ProcessingError::InvalidOptions(format!(
                "quality must be between 1 and 100, got {}",
                self.quality
            )));
        }
        if self.compression_level > 9 {
            return Err(ProcessingError::InvalidOptions(format!(
                "compression_level must be between 0 and 9, got {}",
                self.compression_level
            )));
        }
        if !(1..=10).contains(&self.speed) {
            return Err(ProcessingError::InvalidOptions(format!(
                "speed must be between 1 and 10, got {}",
                self.speed
            )));
        }
        Ok(())
    }
}

/// An encoded image together with the properties of its pixels
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

impl EncodedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Main compression service
pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode `img` as `format`
    pub fn encode(
        img: &DynamicImage,
        format: OutputFormat,
        options: &EncodeOptions,
    ) -> Result<EncodedImage, ProcessingError> {
        options.validate()?;
        let (width, height) = img.dimensions();

        let data = match format {
            OutputFormat::Jpeg if options.progressive => Self::compress_jpeg(img, options)?,
            OutputFormat::Jpeg => Self::compress_jpeg_baseline(img, options)?,
            OutputFormat::Png => Self::compress_png(img, options)?,
            OutputFormat::WebP => Self::compress_webp(img, options)?,
            OutputFormat::Avif => Self::compress_avif(img, options)?,
            OutputFormat::Tiff => Self::compress_tiff(img)?,
        };

        tracing::debug!(
            format = %format,
            width = width,
            height = height,
            quality = options.quality,
            size_bytes = data.len(),
            "Encoded image"
        );

        Ok(EncodedImage {
            data,
            width,
            height,
            format,
        })
    }

    /// Progressive JPEG using mozjpeg
    fn compress_jpeg(img: &DynamicImage, options: &EncodeOptions) -> Result<Bytes, ProcessingError> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(options.quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp
            .start_compress(Vec::new())
            .map_err(|e| ProcessingError::encode("jpeg", e))?;
        comp.write_scanlines(&rgb_img)
            .map_err(|e| ProcessingError::encode("jpeg", e))?;
        let jpeg_data = comp
            .finish()
            .map_err(|e| ProcessingError::encode("jpeg", e))?;

        Ok(Bytes::from(jpeg_data))
    }

    /// Baseline JPEG. mozjpeg's defaults always emit progressive scans, so
    /// the image crate's encoder handles this case.
    fn compress_jpeg_baseline(
        img: &DynamicImage,
        options: &EncodeOptions,
    ) -> Result<Bytes, ProcessingError> {
        let rgb_img = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, options.quality);
        rgb_img
            .write_with_encoder(encoder)
            .map_err(|e| ProcessingError::encode("jpeg", e))?;
        Ok(Bytes::from(buffer))
    }

    fn compress_png(img: &DynamicImage, options: &EncodeOptions) -> Result<Bytes, ProcessingError> {
        let compression = match options.compression_level {
            0..=3 => CompressionType::Fast,
            4..=6 => CompressionType::Default,
            _ => CompressionType::Best,
        };

        let mut buffer = Vec::new();
        let encoder = PngEncoder::new_with_quality(&mut buffer, compression, PngFilter::Adaptive);
        img.write_with_encoder(encoder)
            .map_err(|e| ProcessingError::encode("png", e))?;

        Ok(Bytes::from(buffer))
    }

    fn compress_webp(img: &DynamicImage, options: &EncodeOptions) -> Result<Bytes, ProcessingError> {
        let (width, height) = img.dimensions();

        // Convert to RGBA for WebP encoding
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder
            .encode_simple(options.lossless, options.quality as f32)
            .map_err(|e| ProcessingError::encode("webp", format!("{:?}", e)))?;

        Ok(Bytes::copy_from_slice(&webp_data))
    }

    #[cfg(feature = "avif")]
    fn compress_avif(img: &DynamicImage, options: &EncodeOptions) -> Result<Bytes, ProcessingError> {
        let (width, height) = img.dimensions();

        let encoder = ravif::Encoder::new()
            .with_quality(options.quality as f32)
            .with_speed(options.speed);

        let result = if img.color().has_alpha() {
            let rgba_img = img.to_rgba8();
            let pixels: Vec<rgb::RGBA8> = rgba_img
                .as_raw()
                .chunks_exact(4)
                .map(|p| rgb::RGBA8::new(p[0], p[1], p[2], p[3]))
                .collect();
            encoder.encode_rgba(ravif::Img::new(
                pixels.as_slice(),
                width as usize,
                height as usize,
            ))
        } else {
            let rgb_img = img.to_rgb8();
            let pixels: Vec<rgb::RGB8> = rgb_img
                .as_raw()
                .chunks_exact(3)
                .map(|p| rgb::RGB8::new(p[0], p[1], p[2]))
                .collect();
            encoder.encode_rgb(ravif::Img::new(
                pixels.as_slice(),
                width as usize,
                height as usize,
            ))
        };
        let encoded = result.map_err(|e| ProcessingError::encode("avif", e))?;

        Ok(Bytes::from(encoded.avif_file))
    }

    #[cfg(not(feature = "avif"))]
    fn compress_avif(_img: &DynamicImage, _options: &EncodeOptions) -> Result<Bytes, ProcessingError> {
        Err(ProcessingError::UnsupportedFormat(
            "avif (built without the `avif` feature)".to_string(),
        ))
    }

    fn compress_tiff(img: &DynamicImage) -> Result<Bytes, ProcessingError> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        // Keep TIFF output at 8 bits per channel.
        let normalised = if img.color().has_alpha() {
            DynamicImage::ImageRgba8(img.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(img.to_rgb8())
        };
        normalised
            .write_to(&mut cursor, ImageFormat::Tiff)
            .map_err(|e| ProcessingError::encode("tiff", e))?;

        Ok(Bytes::from(buffer))
    }
}
