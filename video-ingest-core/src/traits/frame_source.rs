use crate::models::error::IngestError;
use crate::models::frame::Frame;

/// An open connection to a camera source.
///
/// Mirrors the grab/retrieve split of common capture libraries: `grab`
/// advances the stream without decoding, `retrieve` decodes the most recently
/// grabbed picture. Skipping frames therefore costs no decode work.
///
/// A connection is owned by exactly one session or worker thread.
pub trait FrameSource: Send {
    /// Whether the connection is usable.
    fn is_open(&self) -> bool;

    /// Advance to the next picture.
    ///
    /// `Ok(false)` means the source produced nothing this time; `Err` is a
    /// transport failure. Both are treated as a failed trial by the caller.
    fn grab(&mut self) -> Result<bool, IngestError>;

    /// Decode the most recently grabbed picture. `None` is a decoder failure.
    fn retrieve(&mut self) -> Option<Frame>;

    /// Grab and decode in one call.
    fn read(&mut self) -> Result<Option<Frame>, IngestError> {
        if self.grab()? {
            Ok(self.retrieve())
        } else {
            Ok(None)
        }
    }

    /// Rate advertised by the source, if it knows one.
    fn native_fps(&self) -> Option<f64> {
        None
    }

    /// Close the connection. Further grabs fail.
    fn release(&mut self);
}

/// Opens connections to a source URL.
///
/// Implemented by platform backends (e.g. the GStreamer connector in
/// `video-ingest-linux`). Shared between a session and its background
/// worker, so it must be `Sync`.
pub trait SourceConnector: Send + Sync {
    fn open(&self, url: &str) -> Result<Box<dyn FrameSource>, IngestError>;
}
