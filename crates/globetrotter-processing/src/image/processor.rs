//! Image processor - metadata extraction, decoding and EXIF stripping

use super::exif;
use super::orientation::ImageOrientation;
use crate::error::ProcessingError;
use crate::metadata::ImageMetadata;
use crate::traits::MediaProcessor;
use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use img_parts::{DynImage, ImageEXIF};
use std::io::Cursor;

pub struct ImageProcessor;

/// Lower-case name for a decoded container format
pub fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Avif => "avif".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        other => other
            .extensions_str()
            .first()
            .map(|ext| ext.to_string())
            .unwrap_or_else(|| format!("{:?}", other).to_lowercase()),
    }
}

impl ImageProcessor {
    /// Sniff the container format and read pixel dimensions from the header,
    /// without decoding pixel data.
    pub fn read_header(data: &[u8]) -> Result<(ImageFormat, u32, u32), ProcessingError> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| ProcessingError::Decode("Unrecognized image format".to_string()))?;
        let (width, height) = reader.into_dimensions().map_err(ProcessingError::decode)?;
        Ok((format, width, height))
    }

    /// Decode pixels exactly as stored
    pub fn decode(data: &[u8]) -> Result<(DynamicImage, ImageFormat), ProcessingError> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| ProcessingError::Decode("Unrecognized image format".to_string()))?;
        let img = reader.decode().map_err(ProcessingError::decode)?;
        Ok((img, format))
    }

    /// Decode pixels and apply the EXIF orientation, giving the upright image
    pub fn decode_oriented(data: &[u8]) -> Result<DynamicImage, ProcessingError> {
        let (img, _) = Self::decode(data)?;
        Ok(ImageOrientation::apply(img, exif::read_orientation(data)))
    }

    /// Base properties from a full decode plus best-effort EXIF.
    ///
    /// A buffer that does not decode is an error; EXIF problems are not.
    pub fn read_metadata(data: &[u8]) -> Result<ImageMetadata, ProcessingError> {
        let (img, format) = Self::decode(data)?;
        let (width, height) = img.dimensions();

        let metadata = ImageMetadata {
            width,
            height,
            format: format_name(format),
            size_bytes: data.len() as u64,
            exif: exif::extract_exif(data),
        };

        tracing::debug!(
            width = metadata.width,
            height = metadata.height,
            format = %metadata.format,
            size_bytes = metadata.size_bytes,
            has_exif = metadata.exif.is_some(),
            "Extracted image metadata"
        );

        Ok(metadata)
    }

    /// Remove EXIF metadata from JPEG, PNG and WebP containers without
    /// re-encoding. Other inputs are returned unchanged.
    pub fn remove_exif(data: Bytes) -> Bytes {
        let container = match DynImage::from_bytes(data.clone()) {
            Ok(Some(container)) => container,
            Ok(None) => return data,
            Err(e) => {
                tracing::debug!(error = %e, "Could not parse container, keeping EXIF as is");
                return data;
            }
        };

        if container.exif().is_none() {
            return data;
        }

        let stripped = match container {
            DynImage::Jpeg(mut jpeg) => {
                jpeg.set_exif(None);
                jpeg.encoder().bytes()
            }
            DynImage::Png(mut png) => {
                png.set_exif(None);
                png.encoder().bytes()
            }
            DynImage::WebP(mut webp) => {
                webp.set_exif(None);
                webp.encoder().bytes()
            }
            #[allow(unreachable_patterns)]
            _ => return data,
        };

        tracing::debug!(
            original_bytes = data.len(),
            stripped_bytes = stripped.len(),
            "Removed EXIF block"
        );

        stripped
    }
}

#[async_trait]
impl MediaProcessor for ImageProcessor {
    type Metadata = ImageMetadata;

    async fn extract_metadata(&self, data: &[u8]) -> Result<Self::Metadata, ProcessingError> {
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || Self::read_metadata(&data)).await?
    }

    fn validate(&self, data: &[u8]) -> Result<(), ProcessingError> {
        Self::decode(data).map(|_| ())
    }

    fn get_dimensions(&self, data: &[u8]) -> Option<(u32, u32)> {
        Self::read_header(data).ok().map(|(_, width, height)| (width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn create_test_image() -> Vec<u8> {
        let img = RgbaImage::from_pixel(100, 80, Rgba([255, 0, 0, 255]));
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        buffer
    }

    #[tokio::test]
    async fn test_extract_metadata() {
        let processor = ImageProcessor;
        let image_data = create_test_image();

        let metadata = processor.extract_metadata(&image_data).await.unwrap();

        assert_eq!(metadata.width, 100);
        assert_eq!(metadata.height, 80);
        assert_eq!(metadata.format, "png");
        assert_eq!(metadata.size_bytes, image_data.len() as u64);
        assert_eq!(metadata.exif, None);
    }

    #[tokio::test]
    async fn test_extract_metadata_invalid_image() {
        let processor = ImageProcessor;
        let result = processor.extract_metadata(b"not an image").await;
        assert!(matches!(result, Err(ProcessingError::Decode(_))));
    }

    #[test]
    fn test_validate() {
        let processor = ImageProcessor;
        assert!(processor.validate(&create_test_image()).is_ok());
        assert!(processor.validate(b"not an image").is_err());
    }

    #[test]
    fn test_get_dimensions() {
        let processor = ImageProcessor;
        assert_eq!(processor.get_dimensions(&create_test_image()), Some((100, 80)));
        assert_eq!(processor.get_dimensions(b"not an image"), None);
    }

    #[test]
    fn test_read_header() {
        let data = create_test_image();
        let (format, width, height) = ImageProcessor::read_header(&data).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!((width, height), (100, 80));

        assert!(ImageProcessor::read_header(b"GIF89a").is_err());
        assert!(ImageProcessor::read_header(b"plain text").is_err());
    }

    #[test]
    fn test_format_name() {
        assert_eq!(format_name(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_name(ImageFormat::WebP), "webp");
        assert_eq!(format_name(ImageFormat::Bmp), "bmp");
        assert_eq!(format_name(ImageFormat::Ico), "ico");
    }

    #[test]
    fn test_remove_exif_without_exif_is_unchanged() {
        let image_data = Bytes::from(create_test_image());
        let result = ImageProcessor::remove_exif(image_data.clone());
        assert_eq!(result, image_data);
    }

    #[test]
    fn test_remove_exif_invalid_format() {
        let invalid = Bytes::from_static(b"not an image");
        assert_eq!(ImageProcessor::remove_exif(invalid.clone()), invalid);
    }
}
