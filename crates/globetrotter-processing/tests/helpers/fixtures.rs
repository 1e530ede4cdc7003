//! Image buffers for the integration suite.

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use img_parts::jpeg::Jpeg;
use img_parts::ImageEXIF;
use std::io::Cursor;

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

pub fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_to(&mut Cursor::new(&mut buffer), format)
        .unwrap();
    buffer
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, 90))
        .unwrap();
    buffer
}

fn with_exif_block(jpeg_bytes: Vec<u8>, exif: Vec<u8>) -> Vec<u8> {
    let mut jpeg = Jpeg::from_bytes(jpeg_bytes.into()).unwrap();
    jpeg.set_exif(Some(exif.into()));
    jpeg.encoder().bytes().to_vec()
}

fn ascii(tag: Tag, value: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![value.as_bytes().to_vec()]),
    }
}

fn dms(tag: Tag, degrees: u32, minutes: u32, seconds: u32) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(vec![
            Rational::from((degrees, 1)),
            Rational::from((minutes, 1)),
            Rational::from((seconds, 1)),
        ]),
    }
}

/// JPEG shot at 10°30'0"N 20°15'0"W with the given orientation tag
pub fn geotagged_jpeg(width: u32, height: u32, orientation: u16) -> Vec<u8> {
    let fields = [
        ascii(Tag::Make, "Canon"),
        ascii(Tag::Model, "Canon EOS R6"),
        ascii(Tag::DateTimeOriginal, "2024:03:02 18:45:10"),
        Field {
            tag: Tag::Orientation,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![orientation]),
        },
        dms(Tag::GPSLatitude, 10, 30, 0),
        ascii(Tag::GPSLatitudeRef, "N"),
        dms(Tag::GPSLongitude, 20, 15, 0),
        ascii(Tag::GPSLongitudeRef, "W"),
    ];

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();

    with_exif_block(jpeg(width, height), tiff.into_inner())
}

/// JPEG whose APP1 block claims to be EXIF but is not parseable
pub fn corrupt_exif_jpeg(width: u32, height: u32) -> Vec<u8> {
    with_exif_block(jpeg(width, height), b"garbage, not a TIFF header".to_vec())
}
