//! Geometric normalization applied after pixel conversion: horizontal
//! mirroring for selfie-style capture and an optional small rotation.
//! Neither operation changes image dimensions.

use crate::frame::NormalizedImage;

/// Flip an image horizontally (mirror for front-facing capture).
pub fn mirror_horizontal(image: &NormalizedImage) -> NormalizedImage {
    let mut flipped = NormalizedImage::new(image.width, image.height);
    for y in 0..image.height {
        for x in 0..image.width {
            let src_x = image.width - 1 - x;
            flipped.set_pixel(x, y, image.get_pixel(src_x, y));
        }
    }
    flipped
}

/// Rotate an image about its center by `degrees`, preserving dimensions.
///
/// Destination pixels are inverse-mapped onto the source with
/// nearest-neighbor sampling; pixels whose source falls outside the canvas
/// stay transparent black.
pub fn rotate_about_center(image: &NormalizedImage, degrees: f32) -> NormalizedImage {
    if degrees == 0.0 {
        return image.clone();
    }

    let mut rotated = NormalizedImage::new(image.width, image.height);
    let (sin, cos) = degrees.to_radians().sin_cos();
    let cx = (image.width as f32 - 1.0) / 2.0;
    let cy = (image.height as f32 - 1.0) / 2.0;

    for y in 0..image.height {
        for x in 0..image.width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let sx = (cx + dx * cos + dy * sin).round();
            let sy = (cy - dx * sin + dy * cos).round();
            if sx < 0.0 || sy < 0.0 {
                continue;
            }
            let (sx, sy) = (sx as u32, sy as u32);
            if sx < image.width && sy < image.height {
                rotated.set_pixel(x, y, image.get_pixel(sx, sy));
            }
        }
    }
    rotated
}

/// Apply the capture-orientation corrections in order: mirror first, then
/// rotation.
pub fn normalize_orientation(
    image: NormalizedImage,
    mirror: bool,
    rotation_degrees: f32,
) -> NormalizedImage {
    let image = if mirror {
        mirror_horizontal(&image)
    } else {
        image
    };
    if rotation_degrees == 0.0 {
        image
    } else {
        rotate_about_center(&image, rotation_degrees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(width: u32, height: u32) -> NormalizedImage {
        let mut img = NormalizedImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = ((x + y * width) % 251) as u8;
                img.set_pixel(x, y, [v, v.wrapping_add(40), v.wrapping_add(80), 255]);
            }
        }
        img
    }

    #[test]
    fn mirror_moves_left_edge_to_right_edge() {
        let mut img = NormalizedImage::new(10, 4);
        img.set_pixel(0, 2, [255, 0, 0, 255]);
        let flipped = mirror_horizontal(&img);
        assert_eq!(flipped.get_pixel(9, 2), [255, 0, 0, 255]);
        assert_eq!(flipped.get_pixel(0, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn mirror_twice_is_identity() {
        let img = gradient_image(7, 5);
        let round_trip = mirror_horizontal(&mirror_horizontal(&img));
        assert_eq!(round_trip, img);
    }

    #[test]
    fn rotation_preserves_dimensions() {
        let img = gradient_image(9, 4);
        let rotated = rotate_about_center(&img, 90.0);
        assert_eq!(rotated.width, 9);
        assert_eq!(rotated.height, 4);
    }

    #[test]
    fn half_turn_moves_corner_to_opposite_corner() {
        let mut img = NormalizedImage::new(3, 3);
        img.set_pixel(0, 0, [1, 2, 3, 255]);
        let rotated = rotate_about_center(&img, 180.0);
        assert_eq!(rotated.get_pixel(2, 2), [1, 2, 3, 255]);
    }

    #[test]
    fn zero_rotation_is_identity() {
        let img = gradient_image(6, 6);
        assert_eq!(rotate_about_center(&img, 0.0), img);
    }

    #[test]
    fn center_pixel_is_fixed_under_rotation() {
        let mut img = NormalizedImage::new(5, 5);
        img.set_pixel(2, 2, [9, 9, 9, 255]);
        let rotated = rotate_about_center(&img, 10.0);
        assert_eq!(rotated.get_pixel(2, 2), [9, 9, 9, 255]);
    }

    #[test]
    fn out_of_canvas_sources_stay_unset() {
        let white =
            NormalizedImage::from_rgba(4, 4, vec![255u8; 4 * 4 * 4]).unwrap();
        let rotated = rotate_about_center(&white, 45.0);
        assert_eq!(rotated.width, 4);
        assert_eq!(rotated.height, 4);
        assert_eq!(rotated.get_pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn orientation_applies_mirror_before_rotation() {
        let mut img = NormalizedImage::new(4, 4);
        img.set_pixel(0, 1, [5, 5, 5, 255]);
        let oriented = normalize_orientation(img, true, 0.0);
        assert_eq!(oriented.get_pixel(3, 1), [5, 5, 5, 255]);
    }
}
