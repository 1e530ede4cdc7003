use crate::error::ProcessingError;
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an image is fitted into a target box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Scale to fill the box, cropping the overflow at the gravity anchor
    #[default]
    Cover,
    /// Scale to fit inside the box and pad the rest with white
    Contain,
    /// Stretch to the exact box, ignoring aspect ratio
    Fill,
    /// Scale to fit inside the box without padding
    Inside,
}

impl FitMode {
    pub fn parse(s: &str) -> Result<Self, ProcessingError> {
        match s.trim().to_lowercase().as_str() {
            "cover" => Ok(FitMode::Cover),
            "contain" => Ok(FitMode::Contain),
            "fill" => Ok(FitMode::Fill),
            "inside" => Ok(FitMode::Inside),
            _ => Err(ProcessingError::InvalidOptions(format!(
                "Invalid fit mode: {} (expected cover, contain, fill or inside)",
                s
            ))),
        }
    }
}

impl FromStr for FitMode {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Anchor used for cropping and overlay placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gravity {
    #[default]
    Center,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Start,
    Middle,
    End,
}

impl Gravity {
    pub fn parse(s: &str) -> Result<Self, ProcessingError> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();

        match normalized.as_str() {
            "center" | "centre" => Ok(Gravity::Center),
            "north" | "top" => Ok(Gravity::North),
            "northeast" | "topright" | "righttop" => Ok(Gravity::NorthEast),
            "east" | "right" => Ok(Gravity::East),
            "southeast" | "bottomright" | "rightbottom" => Ok(Gravity::SouthEast),
            "south" | "bottom" => Ok(Gravity::South),
            "southwest" | "bottomleft" | "leftbottom" => Ok(Gravity::SouthWest),
            "west" | "left" => Ok(Gravity::West),
            "northwest" | "topleft" | "lefttop" => Ok(Gravity::NorthWest),
            _ => Err(ProcessingError::InvalidOptions(format!(
                "Invalid position: {}",
                s
            ))),
        }
    }

    fn anchors(self) -> (Anchor, Anchor) {
        match self {
            Gravity::Center => (Anchor::Middle, Anchor::Middle),
            Gravity::North => (Anchor::Middle, Anchor::Start),
            Gravity::NorthEast => (Anchor::End, Anchor::Start),
            Gravity::East => (Anchor::End, Anchor::Middle),
            Gravity::SouthEast => (Anchor::End, Anchor::End),
            Gravity::South => (Anchor::Middle, Anchor::End),
            Gravity::SouthWest => (Anchor::Start, Anchor::End),
            Gravity::West => (Anchor::Start, Anchor::Middle),
            Gravity::NorthWest => (Anchor::Start, Anchor::Start),
        }
    }

    /// Top-left corner for an `item` placed inside a `container`, kept
    /// `margin` pixels away from the edges it is anchored to.
    pub fn place(
        self,
        container: (u32, u32),
        item: (u32, u32),
        margin: u32,
    ) -> (i64, i64) {
        let (horizontal, vertical) = self.anchors();
        (
            Self::axis_offset(horizontal, container.0, item.0, margin),
            Self::axis_offset(vertical, container.1, item.1, margin),
        )
    }

    fn axis_offset(anchor: Anchor, container: u32, item: u32, margin: u32) -> i64 {
        let free = container as i64 - item as i64;
        match anchor {
            Anchor::Start => (margin as i64).min(free.max(0)),
            Anchor::Middle => (free / 2).max(0),
            Anchor::End => (free - margin as i64).max(0),
        }
    }
}

impl FromStr for Gravity {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gravity::Center => "center",
            Gravity::North => "north",
            Gravity::NorthEast => "northeast",
            Gravity::East => "east",
            Gravity::SouthEast => "southeast",
            Gravity::South => "south",
            Gravity::SouthWest => "southwest",
            Gravity::West => "west",
            Gravity::NorthWest => "northwest",
        };
        f.write_str(name)
    }
}

/// Target box and fitting rules for a single resize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeOptions {
    pub width: u32,
    pub height: u32,
    pub fit: FitMode,
    pub gravity: Gravity,
    /// Never scale the source above its native resolution
    pub without_enlargement: bool,
}

impl ResizeOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fit: FitMode::default(),
            gravity: Gravity::default(),
            without_enlargement: true,
        }
    }

    pub fn with_fit(mut self, fit: FitMode) -> Self {
        self.fit = fit;
        self
    }

    pub fn with_gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn allow_enlargement(mut self) -> Self {
        self.without_enlargement = false;
        self
    }

    pub fn validate(&self) -> Result<(), ProcessingError> {
        if self.width == 0 || self.height == 0 {
            return Err(ProcessingError::InvalidOptions(format!(
                "Resize target must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width.max(1) as f32;
        let height_ratio = orig_height as f32 / new_height.max(1) as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            imageops::FilterType::CatmullRom
        } else {
            imageops::FilterType::Lanczos3
        }
    }

    /// Resize image to exact dimensions
    pub fn resize_image(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        if (orig_width, orig_height) == (width, height) {
            return img.clone();
        }
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }

    fn scaled(orig_width: u32, orig_height: u32, scale: f64) -> (u32, u32) {
        (
            ((orig_width as f64 * scale).round() as u32).max(1),
            ((orig_height as f64 * scale).round() as u32).max(1),
        )
    }

    /// Resize `img` into the box described by `options`.
    ///
    /// With `without_enlargement`, a source that already fits the box is
    /// returned unchanged and no scale factor above 1 is ever used.
    pub fn apply(img: &DynamicImage, options: &ResizeOptions) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (target_width, target_height) = (options.width, options.height);

        if options.without_enlargement && orig_width <= target_width && orig_height <= target_height
        {
            return img.clone();
        }

        let width_ratio = target_width as f64 / orig_width as f64;
        let height_ratio = target_height as f64 / orig_height as f64;
        let clamp = |scale: f64| {
            if options.without_enlargement {
                scale.min(1.0)
            } else {
                scale
            }
        };

        match options.fit {
            FitMode::Cover => {
                let scale = clamp(width_ratio.max(height_ratio));
                let (scaled_width, scaled_height) = Self::scaled(orig_width, orig_height, scale);
                let resized = Self::resize_image(img, scaled_width, scaled_height);

                let crop_width = target_width.min(scaled_width);
                let crop_height = target_height.min(scaled_height);
                let (x, y) = options.gravity.place(
                    (scaled_width, scaled_height),
                    (crop_width, crop_height),
                    0,
                );
                resized.crop_imm(x as u32, y as u32, crop_width, crop_height)
            }
            FitMode::Contain => {
                let scale = clamp(width_ratio.min(height_ratio));
                let (scaled_width, scaled_height) = Self::scaled(orig_width, orig_height, scale);
                let scaled_width = scaled_width.min(target_width);
                let scaled_height = scaled_height.min(target_height);
                let resized = Self::resize_image(img, scaled_width, scaled_height);

                if (scaled_width, scaled_height) == (target_width, target_height) {
                    return resized;
                }

                let background = Rgba([255u8, 255u8, 255u8, 255u8]);
                let mut canvas = RgbaImage::from_pixel(target_width, target_height, background);
                let (x, y) = options.gravity.place(
                    (target_width, target_height),
                    (scaled_width, scaled_height),
                    0,
                );
                imageops::overlay(&mut canvas, &resized.to_rgba8(), x, y);
                DynamicImage::ImageRgba8(canvas)
            }
            FitMode::Inside => {
                let scale = clamp(width_ratio.min(height_ratio));
                let (scaled_width, scaled_height) = Self::scaled(orig_width, orig_height, scale);
                Self::resize_image(
                    img,
                    scaled_width.min(target_width),
                    scaled_height.min(target_height),
                )
            }
            FitMode::Fill => {
                let (width, height) = if options.without_enlargement {
                    (target_width.min(orig_width), target_height.min(orig_height))
                } else {
                    (target_width, target_height)
                };
                Self::resize_image(img, width, height)
            }
        }
    }
}
