use image::DynamicImage;

/// EXIF orientation handling (rotation and flipping)
pub struct ImageOrientation;

impl ImageOrientation {
    /// Rotation and flips that turn stored pixels into the upright image.
    ///
    /// Returns (clockwise rotation, flip horizontal, flip vertical); the
    /// rotation is applied before the flips.
    pub fn transforms(orientation: u16) -> (Option<u16>, bool, bool) {
        match orientation {
            1 => (None, false, false),      // Normal
            2 => (None, true, false),       // Mirror horizontal
            3 => (Some(180), false, false), // Rotate 180
            4 => (None, false, true),       // Mirror vertical
            5 => (Some(90), true, false),   // Transpose
            6 => (Some(90), false, false),  // Rotate 90 CW
            7 => (Some(270), true, false),  // Transverse
            8 => (Some(270), false, false), // Rotate 270 CW
            _ => (None, false, false),      // Invalid, treat as normal
        }
    }

    /// Apply an EXIF orientation value to decoded pixels
    pub fn apply(mut img: DynamicImage, orientation: Option<u16>) -> DynamicImage {
        let Some(orientation) = orientation else {
            return img;
        };
        let (rotate, flip_h, flip_v) = Self::transforms(orientation);

        if rotate.is_some() || flip_h || flip_v {
            tracing::debug!(
                orientation = orientation,
                rotate = ?rotate,
                flip_horizontal = flip_h,
                flip_vertical = flip_v,
                "Applying EXIF orientation"
            );
        }

        if let Some(angle) = rotate {
            img = Self::rotate_by_angle(img, angle);
        }
        if flip_h {
            img = img.fliph();
        }
        if flip_v {
            img = img.flipv();
        }

        img
    }

    /// Rotate image by specified angle (90, 180, or 270 degrees clockwise)
    pub fn rotate_by_angle(img: DynamicImage, angle: u16) -> DynamicImage {
        match angle {
            90 => img.rotate90(),
            180 => img.rotate180(),
            270 => img.rotate270(),
            _ => img,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    /// 3x2 image with a distinct colour in every pixel
    fn marked() -> DynamicImage {
        let mut img = RgbaImage::new(3, 2);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 60) as u8, (y * 100) as u8, 0, 255]);
        }
        DynamicImage::ImageRgba8(img)
    }

    fn px(img: &DynamicImage, x: u32, y: u32) -> Rgba<u8> {
        img.get_pixel(x, y)
    }

    #[test]
    fn test_rotation_dimension_changes() {
        let img = marked();
        for orientation in 1..=4 {
            assert_eq!(ImageOrientation::apply(img.clone(), Some(orientation)).dimensions(), (3, 2));
        }
        for orientation in 5..=8 {
            assert_eq!(ImageOrientation::apply(img.clone(), Some(orientation)).dimensions(), (2, 3));
        }
    }

    #[test]
    fn test_transpose_and_transverse() {
        let img = marked();

        // Orientation 5: stored (x, y) lands at (y, x)
        let transposed = ImageOrientation::apply(img.clone(), Some(5));
        assert_eq!(px(&transposed, 1, 2), px(&img, 2, 1));
        assert_eq!(px(&transposed, 0, 1), px(&img, 1, 0));

        // Orientation 7: stored (x, y) lands at (h-1-y, w-1-x)
        let transversed = ImageOrientation::apply(img.clone(), Some(7));
        assert_eq!(px(&transversed, 1, 2), px(&img, 0, 0));
        assert_eq!(px(&transversed, 0, 0), px(&img, 2, 1));
    }

    #[test]
    fn test_rotate_90_moves_bottom_left_to_top_left() {
        let img = marked();
        let rotated = ImageOrientation::apply(img.clone(), Some(6));
        assert_eq!(px(&rotated, 0, 0), px(&img, 0, 1));
    }

    #[test]
    fn test_mirror() {
        let img = marked();
        let mirrored = ImageOrientation::apply(img.clone(), Some(2));
        assert_eq!(px(&mirrored, 0, 0), px(&img, 2, 0));

        let flipped = ImageOrientation::apply(img.clone(), Some(4));
        assert_eq!(px(&flipped, 0, 0), px(&img, 0, 1));
    }

    #[test]
    fn test_missing_or_invalid_orientation_is_noop() {
        let img = marked();
        assert_eq!(ImageOrientation::apply(img.clone(), None), img);
        assert_eq!(ImageOrientation::apply(img.clone(), Some(0)), img);
        assert_eq!(ImageOrientation::apply(img.clone(), Some(9)), img);
        assert_eq!(ImageOrientation::transforms(255), (None, false, false));
    }
}
