//! Frame contracts shared between the capture boundary and the conversion
//! pipeline.

/// Pixel format tag for three-plane YUV 4:2:0 frames. Matches the constant
/// reported by Android's `ImageFormat.YUV_420_888`.
pub const FORMAT_YUV_420_888: u32 = 35;

/// One plane of a planar camera frame.
///
/// Device-reported strides are unreliable; every read derived from them must
/// be bounds-checked against `data.len()`.
#[derive(Debug, Clone)]
pub struct Plane {
    /// Raw plane bytes.
    pub data: Vec<u8>,
    /// Bytes per row.
    pub row_stride: usize,
    /// Bytes per sample within a row.
    pub pixel_stride: usize,
}

impl Plane {
    pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }
}

/// A raw camera frame as delivered by the capture boundary.
///
/// Ownership is transient: the frame is consumed synchronously by the
/// conversion engine and never mutated after creation.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format tag (see [`FORMAT_YUV_420_888`]).
    pub format: u32,
    /// Luma plane first, then the two chroma planes for full-color formats.
    pub planes: Vec<Plane>,
    /// Capture timestamp in milliseconds, carried through to live results.
    pub timestamp_ms: u64,
}

impl RawFrame {
    /// Whether the frame qualifies for the full-color conversion path.
    pub fn is_full_color(&self) -> bool {
        self.format == FORMAT_YUV_420_888 && self.planes.len() == 3
    }
}

/// Interleaved RGBA8 bitmap produced by the conversion engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 pixel data, row-major.
    pub data: Vec<u8>,
}

impl NormalizedImage {
    /// Create a zero-filled image (fully transparent black).
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 4],
        }
    }

    /// Wrap an existing RGBA8 buffer, validating its length.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, crate::error::PoseError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(crate::error::PoseError::decode(format!(
                "rgba buffer length {} does not match {}x{} ({} bytes expected)",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Get pixel at (x, y) as [R, G, B, A]; out-of-bounds reads yield zeros.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 0];
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Set pixel at (x, y); out-of-bounds writes are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        self.data[idx] = rgba[0];
        self.data[idx + 1] = rgba[1];
        self.data[idx + 2] = rgba[2];
        self.data[idx + 3] = rgba[3];
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
