//! Pixel conversion from planar camera frames to interleaved RGBA8.
//!
//! Three-plane frames take the full BT.601 luma/chroma path; anything else
//! falls back to a grayscale rendition of the first plane with adaptive
//! contrast correction.

use crate::error::PoseError;
use crate::frame::{NormalizedImage, RawFrame};

/// Which conversion path produced an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionPath {
    FullColor,
    GrayscaleFallback,
}

impl ConversionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullColor => "full_color",
            Self::GrayscaleFallback => "grayscale_fallback",
        }
    }
}

/// Result of a frame conversion.
#[derive(Debug)]
pub struct ConversionOutcome {
    pub image: NormalizedImage,
    pub path: ConversionPath,
    /// Pixels left unset because a stride-derived index fell outside its
    /// plane buffer.
    pub skipped_pixels: u64,
}

/// Convert a raw planar frame into an RGBA8 image of identical dimensions.
///
/// Device-reported strides are not trusted: any sample index beyond its
/// plane's buffer skips that pixel, leaving it zeroed, rather than faulting.
pub fn normalize_frame(frame: &RawFrame) -> Result<ConversionOutcome, PoseError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(PoseError::decode(format!(
            "frame has degenerate dimensions {}x{}",
            frame.width, frame.height
        )));
    }
    if frame.planes.is_empty() {
        return Err(PoseError::decode("frame carries no planes"));
    }

    if frame.is_full_color() {
        Ok(convert_full_color(frame))
    } else {
        Ok(convert_grayscale(frame))
    }
}

fn convert_full_color(frame: &RawFrame) -> ConversionOutcome {
    let mut image = NormalizedImage::new(frame.width, frame.height);
    let mut skipped = 0u64;

    let y = &frame.planes[0];
    let u = &frame.planes[1];
    let v = &frame.planes[2];

    for row in 0..frame.height as usize {
        for col in 0..frame.width as usize {
            let y_idx = y.row_stride * row + col;
            // Chroma is subsampled 2x2; each chroma plane is indexed with
            // its own strides.
            let u_idx = u.row_stride * (row / 2) + (col / 2) * u.pixel_stride;
            let v_idx = v.row_stride * (row / 2) + (col / 2) * v.pixel_stride;

            let (Some(&ys), Some(&us), Some(&vs)) =
                (y.data.get(y_idx), u.data.get(u_idx), v.data.get(v_idx))
            else {
                skipped += 1;
                continue;
            };

            let yf = ys as f32;
            let uf = us as f32 - 128.0;
            let vf = vs as f32 - 128.0;

            // BT.601 coefficients.
            let r = (yf + 1.370705 * vf).clamp(0.0, 255.0) as u8;
            let g = (yf - 0.698001 * vf - 0.337633 * uf).clamp(0.0, 255.0) as u8;
            let b = (yf + 1.732446 * uf).clamp(0.0, 255.0) as u8;

            image.set_pixel(col as u32, row as u32, [r, g, b, 255]);
        }
    }

    ConversionOutcome {
        image,
        path: ConversionPath::FullColor,
        skipped_pixels: skipped,
    }
}

fn convert_grayscale(frame: &RawFrame) -> ConversionOutcome {
    let mut image = NormalizedImage::new(frame.width, frame.height);
    let mut skipped = 0u64;

    let plane = &frame.planes[0];
    let mean = if plane.data.is_empty() {
        0.0
    } else {
        plane.data.iter().map(|&b| b as u64).sum::<u64>() as f32 / plane.data.len() as f32
    };

    // Dark frames get a stronger contrast stretch and a brightness boost.
    let (contrast, brightness) = if mean < 100.0 { (1.5, 1.2) } else { (1.3, 1.0) };

    for row in 0..frame.height as usize {
        for col in 0..frame.width as usize {
            let idx = plane.row_stride * row + col;
            let Some(&luma) = plane.data.get(idx) else {
                skipped += 1;
                continue;
            };

            let enhanced =
                ((luma as f32 - 128.0) * contrast + 128.0 * brightness).clamp(0.0, 255.0) as u8;
            image.set_pixel(col as u32, row as u32, [enhanced, enhanced, enhanced, 255]);
        }
    }

    ConversionOutcome {
        image,
        path: ConversionPath::GrayscaleFallback,
        skipped_pixels: skipped,
    }
}
