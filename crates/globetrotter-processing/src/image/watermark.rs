use super::resize::{Gravity, ImageResize};
use crate::error::ProcessingError;
use globetrotter_core::ProcessingConfig;
use image::{imageops, DynamicImage, GenericImageView};

/// Watermark configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkConfig {
    pub position: Gravity,
    pub size: WatermarkSize,
    /// 0.0 (invisible) to 1.0 (as-is)
    pub opacity: f32,
    /// Distance in pixels from the edges the mark is anchored to
    pub margin: u32,
}

/// Watermark size
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WatermarkSize {
    /// Keep the mark's own pixel size
    Original,
    Absolute { width: u32, height: u32 },
    /// Mark width as a percentage of the base image width; aspect ratio kept
    Relative { percent: f32 },
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            position: Gravity::SouthEast,
            size: WatermarkSize::Relative { percent: 20.0 },
            opacity: 0.5,
            margin: 10,
        }
    }
}

impl WatermarkConfig {
    pub fn from_config(config: &ProcessingConfig) -> Result<Self, ProcessingError> {
        let watermark = Self {
            position: Gravity::parse(&config.watermark_position)?,
            opacity: config.watermark_opacity,
            margin: config.watermark_margin,
            ..Self::default()
        };
        watermark.validate()?;
        Ok(watermark)
    }

    pub fn validate(&self) -> Result<(), ProcessingError> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(ProcessingError::InvalidOptions(format!(
                "Watermark opacity must be between 0 and 1, got {}",
                self.opacity
            )));
        }
        match self.size {
            WatermarkSize::Absolute { width, height } if width == 0 || height == 0 => {
                Err(ProcessingError::InvalidOptions(
                    "Watermark size must be non-zero".to_string(),
                ))
            }
            WatermarkSize::Relative { percent } if !(percent > 0.0 && percent <= 100.0) => {
                Err(ProcessingError::InvalidOptions(format!(
                    "Watermark percentage must be in (0, 100], got {}",
                    percent
                )))
            }
            _ => Ok(()),
        }
    }
}

pub struct Watermark;

impl Watermark {
    /// Overlay the watermark image `watermark_data` onto `img`
    pub fn apply(
        img: DynamicImage,
        watermark_data: &[u8],
        config: &WatermarkConfig,
    ) -> Result<DynamicImage, ProcessingError> {
        config.validate()?;

        let mut watermark_img = image::load_from_memory(watermark_data)
            .map_err(|e| ProcessingError::Decode(format!("watermark: {}", e)))?
            .to_rgba8();

        let (img_width, img_height) = img.dimensions();
        let (wm_width, wm_height) = watermark_img.dimensions();

        let (target_wm_width, target_wm_height) = match config.size {
            WatermarkSize::Original => (wm_width, wm_height),
            WatermarkSize::Absolute { width, height } => (width, height),
            WatermarkSize::Relative { percent } => {
                let w = (img_width as f32 * percent / 100.0).round().max(1.0);
                let h = (w * wm_height as f32 / wm_width as f32).round().max(1.0);
                (w as u32, h as u32)
            }
        };
        let target_wm_width = target_wm_width.min(img_width).max(1);
        let target_wm_height = target_wm_height.min(img_height).max(1);

        // Resize watermark if needed
        if wm_width != target_wm_width || wm_height != target_wm_height {
            let filter =
                ImageResize::select_filter(wm_width, wm_height, target_wm_width, target_wm_height);
            watermark_img =
                imageops::resize(&watermark_img, target_wm_width, target_wm_height, filter);
        }

        if config.opacity < 1.0 {
            for pixel in watermark_img.pixels_mut() {
                pixel[3] = (pixel[3] as f32 * config.opacity).round() as u8;
            }
        }

        let (x, y) = config.position.place(
            (img_width, img_height),
            (target_wm_width, target_wm_height),
            config.margin,
        );

        tracing::debug!(
            x = x,
            y = y,
            width = target_wm_width,
            height = target_wm_height,
            opacity = config.opacity,
            "Applying watermark"
        );

        let mut img_rgba = img.to_rgba8();
        imageops::overlay(&mut img_rgba, &watermark_img, x, y);

        Ok(DynamicImage::ImageRgba8(img_rgba))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, WHITE))
    }

    fn create_test_watermark(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, BLACK);
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn opaque(position: Gravity, margin: u32) -> WatermarkConfig {
        WatermarkConfig {
            position,
            size: WatermarkSize::Original,
            opacity: 1.0,
            margin,
        }
    }

    #[test]
    fn test_watermark_south_east_with_margin() {
        let img = create_test_image(200, 200);
        let result =
            Watermark::apply(img, &create_test_watermark(50, 50), &opaque(Gravity::SouthEast, 10))
                .unwrap();

        assert_eq!(result.dimensions(), (200, 200));
        assert_eq!(result.get_pixel(140, 140), BLACK);
        assert_eq!(result.get_pixel(189, 189), BLACK);
        assert_eq!(result.get_pixel(190, 190), WHITE);
        assert_eq!(result.get_pixel(139, 139), WHITE);
    }

    #[test]
    fn test_watermark_north_west() {
        let img = create_test_image(200, 200);
        let result =
            Watermark::apply(img, &create_test_watermark(50, 50), &opaque(Gravity::NorthWest, 0))
                .unwrap();
        assert_eq!(result.get_pixel(0, 0), BLACK);
        assert_eq!(result.get_pixel(50, 50), WHITE);
    }

    #[test]
    fn test_watermark_center() {
        let img = create_test_image(200, 200);
        let result =
            Watermark::apply(img, &create_test_watermark(50, 50), &opaque(Gravity::Center, 10))
                .unwrap();
        assert_eq!(result.get_pixel(100, 100), BLACK);
        assert_eq!(result.get_pixel(70, 70), WHITE);
    }

    #[test]
    fn test_watermark_relative_size_keeps_aspect_ratio() {
        let img = create_test_image(400, 200);
        let config = WatermarkConfig {
            position: Gravity::NorthWest,
            size: WatermarkSize::Relative { percent: 25.0 },
            opacity: 1.0,
            margin: 0,
        };

        // 100x50 mark scaled to 25% of 400px width
        let result = Watermark::apply(img, &create_test_watermark(100, 50), &config).unwrap();
        assert_eq!(result.get_pixel(99, 49), BLACK);
        assert_eq!(result.get_pixel(100, 10), WHITE);
        assert_eq!(result.get_pixel(10, 50), WHITE);
    }

    #[test]
    fn test_watermark_opacity_blends() {
        let img = create_test_image(100, 100);
        let config = WatermarkConfig {
            opacity: 0.5,
            ..opaque(Gravity::NorthWest, 0)
        };

        let result = Watermark::apply(img, &create_test_watermark(10, 10), &config).unwrap();
        let pixel = result.get_pixel(5, 5);
        assert!(pixel[0] > 100 && pixel[0] < 160, "got {:?}", pixel);
    }

    #[test]
    fn test_watermark_size_larger_than_image() {
        let img = create_test_image(100, 100);
        let config = WatermarkConfig {
            size: WatermarkSize::Absolute {
                width: 200,
                height: 200,
            },
            ..opaque(Gravity::NorthWest, 0)
        };

        // Should clamp to image size
        let result = Watermark::apply(img, &create_test_watermark(50, 50), &config).unwrap();
        assert_eq!(result.dimensions(), (100, 100));
        assert_eq!(result.get_pixel(99, 99), BLACK);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let img = create_test_image(100, 100);
        let config = WatermarkConfig {
            opacity: 1.5,
            ..WatermarkConfig::default()
        };
        let result = Watermark::apply(img.clone(), &create_test_watermark(10, 10), &config);
        assert!(matches!(result, Err(ProcessingError::InvalidOptions(_))));

        let result = Watermark::apply(img, b"not an image", &WatermarkConfig::default());
        assert!(matches!(result, Err(ProcessingError::Decode(_))));
    }
}
