/// Capture session state machine.
///
/// State transitions:
/// ```text
/// disconnected → connecting → streaming
///       ↑                         │ (transport failure)
///       └─────────────────────────┘
/// any → exhausted (trial ceiling reached)   any → stopped (owner stop)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Disconnected,
    Connecting,
    Streaming,
    Exhausted { trials: u32 },
    Stopped,
}

impl CaptureState {
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }

    /// Terminal states produce no more frames.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted { .. } | Self::Stopped)
    }
}

/// Counters for debugging capture sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureDiagnostics {
    pub grabs: u64,
    pub retrieves: u64,
    pub frames_delivered: u64,
    pub decode_failures: u64,
    pub transport_failures: u64,
    pub reconnects: u64,
    /// Unread mailbox frames replaced by a newer one.
    pub mailbox_overwrites: u64,
    pub worker_restarts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(CaptureState::Stopped.is_terminal());
        assert!(CaptureState::Exhausted { trials: 600 }.is_terminal());
        assert!(!CaptureState::Disconnected.is_terminal());
        assert!(CaptureState::Streaming.is_streaming());
    }
}
