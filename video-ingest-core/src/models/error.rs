use thiserror::Error;

/// Errors that can occur during capture, buffering and recording.
///
/// Transient source errors are absorbed inside a capture session by its
/// recovery policy; only `ExhaustedRetries`, `Configuration` and `Cancelled`
/// are expected to reach the owner of a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("{operation} exhausted after {trials} consecutive failures")]
    ExhaustedRetries { operation: String, trials: u32 },

    #[error("write failed: {0}")]
    Write(String),

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("configuration invalid: {0}")]
    Configuration(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("cancelled")]
    Cancelled,
}

impl IngestError {
    /// Source-side failures that a reconnection may cure.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Transport(_))
    }

    /// Failures after which a capture session stops producing frames.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ExhaustedRetries { .. } | Self::Cancelled)
    }
}
