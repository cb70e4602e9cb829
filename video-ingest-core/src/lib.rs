//! # video-ingest-core
//!
//! Platform-agnostic adaptive video ingest library.
//!
//! Pulls frames from a camera at whatever rate it delivers, down-samples to a
//! target rate, keeps a bounded history of recent frames, rides out source
//! outages with bounded retries, and persists frames to rotating files with
//! age-based retention. Platform backends implement `SourceConnector` /
//! `FrameSource` and plug into the generic `CaptureSession`.
//!
//! ## Architecture
//!
//! ```text
//! video-ingest-core (this crate)
//! ├── traits/       ← FrameSource, SourceConnector, FrameEncoder, EncoderFactory, IngestDelegate
//! ├── models/       ← IngestError, CaptureState, Frame, configurations, SegmentRecord
//! ├── processing/   ← FrameBuffer, rate pacing, Y4M format helpers
//! ├── session/      ← CaptureSession (sync/async acquisition), RecoveryPolicy, Mailbox
//! └── storage/      ← WriterSession, retention sweep, annotations, Y4M encoder, metadata
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for convenience.
pub use models::config::{
    AnnotationConfig, AsyncTuning, CameraConfiguration, CaptureMode, RetentionPolicy, RetryPolicy,
    WriterConfiguration,
};
pub use models::error::IngestError;
pub use models::frame::{Frame, FrameDimensions, PixelFormat};
pub use models::segment::SegmentRecord;
pub use models::state::{CaptureDiagnostics, CaptureState};
pub use processing::frame_buffer::FrameBuffer;
pub use session::capture::CaptureSession;
pub use session::mailbox::Mailbox;
pub use session::recovery::{FailureSeverity, RecoveryPolicy};
pub use session::stop_signal::StopSignal;
pub use storage::retention::{cleanup, CleanupReport};
pub use storage::rotating_writer::{WriteOutcome, WriterSession};
pub use storage::y4m_encoder::{Y4mEncoder, Y4mEncoderFactory};
pub use traits::frame_encoder::{EncoderFactory, FrameEncoder};
pub use traits::frame_source::{FrameSource, SourceConnector};
pub use traits::ingest_delegate::IngestDelegate;
