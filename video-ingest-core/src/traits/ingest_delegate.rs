use crate::models::error::IngestError;
use crate::models::segment::SegmentRecord;
use crate::models::state::CaptureState;

/// Event delegate for capture and writer notifications.
///
/// Methods are called from whichever thread drives the session (the
/// caller's thread for `update()`/`write()`). Implementations should hand
/// off to their own thread if they do real work.
pub trait IngestDelegate: Send + Sync {
    /// Called when a capture session changes state.
    fn on_state_changed(&self, state: &CaptureState);

    /// Called for errors that end a session or drop an output frame.
    fn on_error(&self, error: &IngestError);

    /// Called when a writer closes a segment file.
    fn on_segment_finished(&self, segment: &SegmentRecord);
}
