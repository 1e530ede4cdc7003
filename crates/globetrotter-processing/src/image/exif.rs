//! EXIF extraction
//!
//! EXIF is read independently of pixel decoding and never fails the caller:
//! a missing block is normal (debug log), a corrupt one is logged as a
//! warning and treated as absent.

use crate::metadata::{ExifData, GpsLocation};
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use exif::{Exif, Field, In, Reader, Tag, Value};
use image::ImageFormat;
use img_parts::{DynImage, ImageEXIF};
use std::io::Cursor;

/// Locate and parse the EXIF block of `data`.
///
/// JPEG, PNG and WebP containers are handled by `img-parts`; TIFF and AVIF
/// go through kamadak-exif's own container reader.
pub fn read_exif(data: &[u8]) -> Option<Exif> {
    let parsed = match DynImage::from_bytes(Bytes::copy_from_slice(data)) {
        Ok(Some(container)) => match container.exif() {
            Some(raw) => Reader::new().read_raw(raw.to_vec()),
            None => {
                tracing::debug!("Image has no EXIF block");
                return None;
            }
        },
        Ok(None) | Err(_) => match image::guess_format(data) {
            Ok(ImageFormat::Tiff) | Ok(ImageFormat::Avif) => {
                Reader::new().read_from_container(&mut Cursor::new(data))
            }
            _ => {
                tracing::debug!("Image container does not carry EXIF");
                return None;
            }
        },
    };

    match parsed {
        Ok(exif) => Some(exif),
        Err(exif::Error::NotFound(_)) => {
            tracing::debug!("Image has no EXIF block");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring corrupt EXIF block");
            None
        }
    }
}

/// Camera, capture time, GPS and orientation from the EXIF block, if any.
///
/// Returns `Some` whenever an EXIF block parses, even if none of the
/// fields of interest are present.
pub fn extract_exif(data: &[u8]) -> Option<ExifData> {
    read_exif(data).map(|exif| exif_data(&exif))
}

/// EXIF orientation (1-8) of `data`, if tagged
pub fn read_orientation(data: &[u8]) -> Option<u16> {
    read_exif(data).and_then(|exif| orientation(&exif))
}

pub(crate) fn exif_data(exif: &Exif) -> ExifData {
    ExifData {
        camera: ascii_field(exif, Tag::Model).or_else(|| ascii_field(exif, Tag::Make)),
        date_taken: date_taken(exif),
        location: gps_location(exif),
        orientation: orientation(exif),
    }
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    match exif.get_field(tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Ascii(values)) => values
            .iter()
            .map(|v| {
                String::from_utf8_lossy(v)
                    .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                    .to_string()
            })
            .find(|v| !v.is_empty()),
        _ => None,
    }
}

fn orientation(exif: &Exif) -> Option<u16> {
    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .and_then(|v| u16::try_from(v).ok())
}

/// `DateTimeOriginal` (falling back to `DateTime`), with `OffsetTimeOriginal`
/// applied when present. Timestamps without an offset are taken as UTC.
fn date_taken(exif: &Exif) -> Option<DateTime<FixedOffset>> {
    let raw = ascii_field(exif, Tag::DateTimeOriginal).or_else(|| ascii_field(exif, Tag::DateTime))?;

    let naive = match NaiveDateTime::parse_from_str(&raw, "%Y:%m:%d %H:%M:%S") {
        Ok(naive) => naive,
        Err(e) => {
            tracing::debug!(value = %raw, error = %e, "Unparseable EXIF timestamp");
            return None;
        }
    };

    let offset = ascii_field(exif, Tag::OffsetTimeOriginal)
        .and_then(|o| o.parse::<FixedOffset>().ok());

    match offset {
        Some(offset) => naive.and_local_timezone(offset).single(),
        None => Some(naive.and_utc().fixed_offset()),
    }
}

fn gps_location(exif: &Exif) -> Option<GpsLocation> {
    let latitude = exif.get_field(Tag::GPSLatitude, In::PRIMARY)?;
    let longitude = exif.get_field(Tag::GPSLongitude, In::PRIMARY)?;

    let lat_ref = ascii_field(exif, Tag::GPSLatitudeRef);
    let lon_ref = ascii_field(exif, Tag::GPSLongitudeRef);

    Some(GpsLocation {
        latitude: dms_to_decimal(rationals(latitude).as_deref(), lat_ref.as_deref()),
        longitude: dms_to_decimal(rationals(longitude).as_deref(), lon_ref.as_deref()),
    })
}

/// Rational components as floats; a zero denominator makes the whole value
/// malformed.
fn rationals(field: &Field) -> Option<Vec<f64>> {
    match &field.value {
        Value::Rational(values) => values
            .iter()
            .map(|r| (r.denom != 0).then(|| r.to_f64()))
            .collect(),
        _ => None,
    }
}

/// Convert degrees/minutes/seconds to signed decimal degrees.
///
/// Missing or short input yields `0.0`; `S` and `W` references negate.
pub fn dms_to_decimal(dms: Option<&[f64]>, reference: Option<&str>) -> f64 {
    let decimal = match dms {
        Some([degrees, minutes, seconds, ..]) => degrees + minutes / 60.0 + seconds / 3600.0,
        _ => return 0.0,
    };
    if !decimal.is_finite() {
        return 0.0;
    }

    match reference.map(str::trim) {
        Some(r) if r.eq_ignore_ascii_case("S") || r.eq_ignore_ascii_case("W") => -decimal,
        _ => decimal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::experimental::Writer;
    use exif::Rational;
    use image::{codecs::jpeg::JpegEncoder, DynamicImage, RgbImage};
    use img_parts::jpeg::Jpeg;

    fn ascii(tag: Tag, value: &str) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![value.as_bytes().to_vec()]),
        }
    }

    fn dms(tag: Tag, d: u32, m: u32, s: u32) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Rational(vec![
                Rational::from((d, 1)),
                Rational::from((m, 1)),
                Rational::from((s, 1)),
            ]),
        }
    }

    fn jpeg_with_fields(fields: &[Field]) -> Vec<u8> {
        let mut writer = Writer::new();
        for field in fields {
            writer.push_field(field);
        }
        let mut tiff = Cursor::new(Vec::new());
        writer.write(&mut tiff, false).unwrap();

        let mut jpeg_bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(8, 8))
            .write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg_bytes, 90))
            .unwrap();

        let mut jpeg = Jpeg::from_bytes(jpeg_bytes.into()).unwrap();
        jpeg.set_exif(Some(tiff.into_inner().into()));
        jpeg.encoder().bytes().to_vec()
    }

    #[test]
    fn test_dms_to_decimal() {
        assert_eq!(dms_to_decimal(Some(&[10.0, 30.0, 0.0]), Some("N")), 10.5);
        assert_eq!(dms_to_decimal(Some(&[10.0, 30.0, 0.0]), Some("S")), -10.5);
        assert!((dms_to_decimal(Some(&[73.0, 59.0, 24.0]), Some("W")) + 73.99).abs() < 1e-9);
        assert_eq!(dms_to_decimal(Some(&[10.0, 30.0, 0.0]), None), 10.5);
    }

    #[test]
    fn test_dms_to_decimal_malformed() {
        assert_eq!(dms_to_decimal(None, Some("N")), 0.0);
        assert_eq!(dms_to_decimal(Some(&[]), Some("N")), 0.0);
        assert_eq!(dms_to_decimal(Some(&[10.0, 30.0]), Some("S")), 0.0);
    }

    #[test]
    fn test_extract_full_exif() {
        let data = jpeg_with_fields(&[
            ascii(Tag::Make, "Google"),
            ascii(Tag::Model, "Pixel 7"),
            ascii(Tag::DateTimeOriginal, "2023:07:14 09:30:00"),
            ascii(Tag::OffsetTimeOriginal, "+09:00"),
            Field {
                tag: Tag::Orientation,
                ifd_num: In::PRIMARY,
                value: Value::Short(vec![6]),
            },
            dms(Tag::GPSLatitude, 35, 39, 30),
            ascii(Tag::GPSLatitudeRef, "N"),
            dms(Tag::GPSLongitude, 139, 45, 0),
            ascii(Tag::GPSLongitudeRef, "E"),
        ]);

        let exif = extract_exif(&data).unwrap();
        assert_eq!(exif.camera.as_deref(), Some("Pixel 7"));
        assert_eq!(exif.orientation, Some(6));
        assert_eq!(
            exif.date_taken.unwrap().to_rfc3339(),
            "2023-07-14T09:30:00+09:00"
        );

        let location = exif.location.unwrap();
        assert!((location.latitude - 35.658_333).abs() < 1e-5);
        assert!((location.longitude - 139.75).abs() < 1e-9);

        assert_eq!(read_orientation(&data), Some(6));
    }

    #[test]
    fn test_camera_falls_back_to_make_and_naive_time_is_utc() {
        let data = jpeg_with_fields(&[
            ascii(Tag::Make, "Canon"),
            ascii(Tag::DateTime, "2021:01:02 03:04:05"),
        ]);

        let exif = extract_exif(&data).unwrap();
        assert_eq!(exif.camera.as_deref(), Some("Canon"));
        assert_eq!(
            exif.date_taken.unwrap().to_rfc3339(),
            "2021-01-02T03:04:05+00:00"
        );
        assert_eq!(exif.location, None);
        assert_eq!(exif.orientation, None);
    }

    #[test]
    fn test_location_requires_both_coordinates() {
        let data = jpeg_with_fields(&[
            dms(Tag::GPSLatitude, 10, 30, 0),
            ascii(Tag::GPSLatitudeRef, "S"),
        ]);

        let exif = extract_exif(&data).unwrap();
        assert_eq!(exif.location, None);
    }

    #[test]
    fn test_non_rational_coordinates_become_zero() {
        let data = jpeg_with_fields(&[
            Field {
                tag: Tag::GPSLatitude,
                ifd_num: In::PRIMARY,
                value: Value::Short(vec![10, 30, 0]),
            },
            dms(Tag::GPSLongitude, 20, 15, 0),
            ascii(Tag::GPSLongitudeRef, "W"),
        ]);

        let location = extract_exif(&data).unwrap().location.unwrap();
        assert_eq!(location.latitude, 0.0);
        assert_eq!(location.longitude, -20.25);
    }

    #[test]
    fn test_zero_denominator_coordinates_become_zero() {
        let data = jpeg_with_fields(&[
            Field {
                tag: Tag::GPSLatitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![
                    Rational::from((10, 0)),
                    Rational::from((30, 1)),
                    Rational::from((0, 1)),
                ]),
            },
            ascii(Tag::GPSLatitudeRef, "N"),
            dms(Tag::GPSLongitude, 20, 15, 0),
            ascii(Tag::GPSLongitudeRef, "E"),
        ]);

        let exif = extract_exif(&data).unwrap();
        let location = exif.location.unwrap();
        assert_eq!(location.latitude, 0.0);
        assert_eq!(location.longitude, 20.25);

        // Persisted metadata must survive a JSON round trip
        let json = serde_json::to_string(&exif).unwrap();
        let restored: ExifData = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, exif);
    }

    #[test]
    fn test_dms_to_decimal_non_finite() {
        assert_eq!(dms_to_decimal(Some(&[f64::INFINITY, 0.0, 0.0]), Some("N")), 0.0);
        assert_eq!(dms_to_decimal(Some(&[f64::NAN, 30.0, 0.0]), Some("S")), 0.0);
    }

    #[test]
    fn test_corrupt_exif_is_ignored() {
        let mut jpeg_bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(8, 8))
            .write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg_bytes, 90))
            .unwrap();
        let mut jpeg = Jpeg::from_bytes(jpeg_bytes.into()).unwrap();
        jpeg.set_exif(Some(Bytes::from_static(b"garbage")));
        let data = jpeg.encoder().bytes();

        assert_eq!(extract_exif(&data), None);
        assert_eq!(read_orientation(&data), None);
    }

    #[test]
    fn test_non_image_has_no_exif() {
        assert_eq!(extract_exif(b"definitely not an image"), None);
    }
}
