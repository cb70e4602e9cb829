//! Rate calibration helpers.
//!
//! The synchronous strategy down-samples by grabbing `skip_factor` pictures
//! per delivered frame; the asynchronous strategy paces its polls by sleeping
//! until the next frame is due.

use std::time::Duration;

/// Number of source pictures consumed per delivered frame.
///
/// `floor(source / target)` when both rates are known and positive, else 1.
/// Never returns 0, so a source slower than the target is read every time.
pub fn skip_factor(source_fps: Option<f64>, target_fps: f64) -> u32 {
    match source_fps {
        Some(source) if source > 0.0 && target_fps > 0.0 => {
            let ratio = (source / target_fps).floor();
            if ratio >= 1.0 {
                ratio.min(u32::MAX as f64) as u32
            } else {
                1
            }
        }
        _ => 1,
    }
}

/// Sleep before polling for the next frame.
///
/// `max(1/target - elapsed, minimum)`; `unpaced` when no target is set or
/// no frame has been delivered yet. A target too slow to express as a
/// `Duration` waits `Duration::MAX`.
pub fn poll_delay(
    target_fps: f64,
    since_last_frame: Option<Duration>,
    minimum: Duration,
    unpaced: Duration,
) -> Duration {
    let Some(elapsed) = since_last_frame else {
        return unpaced;
    };
    if target_fps <= 0.0 {
        return unpaced;
    }
    let interval = Duration::try_from_secs_f64(1.0 / target_fps).unwrap_or(Duration::MAX);
    interval.saturating_sub(elapsed).max(minimum)
}
