use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::models::error::IngestError;
use crate::models::frame::{Frame, FrameDimensions, PixelFormat};
use crate::processing::y4m_format;
use crate::traits::frame_encoder::{EncoderFactory, FrameEncoder};

/// Built-in encoder writing uncompressed YUV4MPEG2 (4:4:4).
///
/// Every frame in a file must share the dimensions the file was opened with.
pub struct Y4mEncoder {
    file: Option<BufWriter<File>>,
    dimensions: FrameDimensions,
    total_bytes_written: u64,
    scratch: Vec<u8>,
}

impl Y4mEncoder {
    /// Create the file and write the stream header.
    pub fn create(path: &Path, dimensions: FrameDimensions, fps: f64) -> Result<Self, IngestError> {
        if dimensions.is_empty() {
            return Err(IngestError::Encoding("cannot open a stream for an empty frame".into()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| IngestError::Write(format!("failed to create directory: {}", e)))?;
        }
        let file = File::create(path)
            .map_err(|e| IngestError::Write(format!("failed to create {}: {}", path.display(), e)))?;

        let mut encoder = Self {
            file: Some(BufWriter::new(file)),
            dimensions,
            total_bytes_written: 0,
            scratch: Vec::with_capacity(y4m_format::frame_size(dimensions)),
        };
        let header = y4m_format::stream_header(dimensions, fps);
        encoder.write_raw(header.as_bytes())?;
        Ok(encoder)
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), IngestError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| IngestError::Write("stream is closed".into()))?;
        file.write_all(data)
            .map_err(|e| IngestError::Write(format!("write failed: {}", e)))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }
}

impl FrameEncoder for Y4mEncoder {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), IngestError> {
        if frame.dimensions() != self.dimensions {
            return Err(IngestError::Encoding(format!(
                "frame is {}x{}, stream is {}x{}",
                frame.width(),
                frame.height(),
                self.dimensions.width,
                self.dimensions.height
            )));
        }
        if frame.format() != PixelFormat::Bgr24 {
            return Err(IngestError::Encoding(format!("unsupported pixel format {:?}", frame.format())));
        }

        let mut payload = std::mem::take(&mut self.scratch);
        payload.clear();
        payload.extend_from_slice(y4m_format::FRAME_HEADER);
        y4m_format::bgr_to_yuv444(frame.pixels(), &mut payload);
        let result = self.write_raw(&payload);
        self.scratch = payload;
        result
    }

    fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    fn finish(&mut self) -> Result<(), IngestError> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        file.flush().map_err(|e| IngestError::Write(e.to_string()))?;
        file.get_ref()
            .sync_all()
            .map_err(|e| IngestError::Write(e.to_string()))?;
        Ok(())
    }
}

/// Opens a `Y4mEncoder` for every new segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Y4mEncoderFactory;

impl EncoderFactory for Y4mEncoderFactory {
    fn create(
        &self,
        path: &Path,
        dimensions: FrameDimensions,
        fps: f64,
    ) -> Result<Box<dyn FrameEncoder>, IngestError> {
        Ok(Box::new(Y4mEncoder::create(path, dimensions, fps)?))
    }
}
