use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A finished output file, produced when a writer rotates or is released.
///
/// Serializable for the JSON sidecar written next to the segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub id: String,
    pub file_path: PathBuf,
    pub annotations_path: Option<PathBuf>,
    pub frame_count: u64,
    pub bytes: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// SHA-256 of the finished file, lowercase hex.
    pub checksum: String,
}

impl SegmentRecord {
    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
