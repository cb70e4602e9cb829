use chrono::{DateTime, Utc};

use super::error::IngestError;

/// Pixel layout of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One byte per pixel.
    Gray8,
    /// Three bytes per pixel, blue-green-red order.
    Bgr24,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Bgr24 => 3,
        }
    }
}

/// Width and height of a frame in pixels. `(0, 0)` stands for "no frame yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An owned 2-D pixel buffer plus its capture timestamp.
///
/// Frames are never mutated after they are stored. Crossing a thread boundary
/// moves the buffer; nothing keeps a second reference to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: Vec<u8>,
    dimensions: FrameDimensions,
    format: PixelFormat,
    captured_at: DateTime<Utc>,
}

impl Frame {
    /// Build a frame stamped with the current wall-clock time.
    pub fn new(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, IngestError> {
        Self::with_timestamp(pixels, width, height, format, Utc::now())
    }

    pub fn with_timestamp(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, IngestError> {
        let expected = width as usize * height as usize * format.channels();
        if pixels.len() != expected {
            return Err(IngestError::Decode(format!(
                "buffer of {} bytes does not match {}x{} {:?} ({} bytes)",
                pixels.len(),
                width,
                height,
                format,
                expected
            )));
        }
        Ok(Self {
            pixels,
            dimensions: FrameDimensions::new(width, height),
            format,
            captured_at,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn dimensions(&self) -> FrameDimensions {
        self.dimensions
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Raise the timestamp to `floor` if it is earlier, keeping delivery
    /// order monotonic when the wall clock steps backwards.
    pub(crate) fn clamp_timestamp(&mut self, floor: Option<DateTime<Utc>>) {
        if let Some(floor) = floor {
            if self.captured_at < floor {
                self.captured_at = floor;
            }
        }
    }

    /// Three-channel copy of this frame. Grayscale values are replicated.
    pub fn to_bgr(&self) -> Frame {
        match self.format {
            PixelFormat::Bgr24 => self.clone(),
            PixelFormat::Gray8 => {
                let mut pixels = Vec::with_capacity(self.pixels.len() * 3);
                for &v in &self.pixels {
                    pixels.extend_from_slice(&[v, v, v]);
                }
                Frame {
                    pixels,
                    dimensions: self.dimensions,
                    format: PixelFormat::Bgr24,
                    captured_at: self.captured_at,
                }
            }
        }
    }
}
