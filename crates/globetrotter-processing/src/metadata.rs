//! Image metadata types

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Properties of an image buffer as it was received.
///
/// `width` and `height` describe the stored pixels, before any EXIF
/// orientation is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// Lower-case format name (`jpeg`, `png`, `webp`, ...)
    pub format: String,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exif: Option<ExifData>,
}

/// Camera-reported EXIF fields; any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExifData {
    pub camera: Option<String>,
    pub date_taken: Option<DateTime<FixedOffset>>,
    pub location: Option<GpsLocation>,
    pub orientation: Option<u16>,
}

/// Decimal-degree coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_metadata_serialization() {
        let metadata = ImageMetadata {
            width: 4032,
            height: 3024,
            format: "jpeg".to_string(),
            size_bytes: 2_048_000,
            exif: Some(ExifData {
                camera: Some("Pixel 7".to_string()),
                date_taken: DateTime::parse_from_rfc3339("2023-07-14T09:30:00+09:00").ok(),
                location: Some(GpsLocation {
                    latitude: 35.6586,
                    longitude: 139.7454,
                }),
                orientation: Some(6),
            }),
        };

        let json = serde_json::to_string(&metadata).unwrap();
        let deserialized: ImageMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(metadata, deserialized);
    }

    #[test]
    fn test_missing_exif_is_omitted() {
        let metadata = ImageMetadata {
            width: 100,
            height: 100,
            format: "png".to_string(),
            size_bytes: 1000,
            exif: None,
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert!(json.get("exif").is_none());
        assert_eq!(json["format"], "png");

        let deserialized: ImageMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized.exif, None);
    }
}
