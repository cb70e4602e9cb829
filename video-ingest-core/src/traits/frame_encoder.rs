use std::path::Path;

use crate::models::error::IngestError;
use crate::models::frame::{Frame, FrameDimensions};

/// Streaming encoder for one output file.
///
/// The codec behind it is a black box: any failure is reported as an
/// `IngestError` and the writer decides whether it is fatal (it never is).
pub trait FrameEncoder: Send {
    /// Encode one three-channel frame.
    fn write_frame(&mut self, frame: &Frame) -> Result<(), IngestError>;

    /// Bytes handed to the file so far, container overhead included.
    fn bytes_written(&self) -> u64;

    /// Flush and close the file. The encoder is unusable afterwards.
    fn finish(&mut self) -> Result<(), IngestError>;
}

/// Creates an encoder for each new segment file.
pub trait EncoderFactory: Send + Sync {
    fn create(
        &self,
        path: &Path,
        dimensions: FrameDimensions,
        fps: f64,
    ) -> Result<Box<dyn FrameEncoder>, IngestError>;
}
