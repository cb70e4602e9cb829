use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::IngestError;
use crate::models::segment::SegmentRecord;

/// Sidecar path for a segment: the segment's extension replaced by
/// `metadata.json`.
pub fn sidecar_path(segment_path: &Path) -> PathBuf {
    segment_path.with_extension("metadata.json")
}

/// Write a segment record as a JSON sidecar file.
pub fn write_metadata(record: &SegmentRecord) -> Result<PathBuf, IngestError> {
    let metadata_path = sidecar_path(&record.file_path);
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| IngestError::Storage(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&metadata_path, json).map_err(|e| IngestError::Storage(format!("failed to write metadata: {}", e)))?;
    Ok(metadata_path)
}

/// Read a segment record back from its JSON sidecar file.
pub fn read_metadata(segment_path: &Path) -> Result<SegmentRecord, IngestError> {
    let metadata_path = sidecar_path(segment_path);
    let json = fs::read_to_string(&metadata_path)
        .map_err(|e| IngestError::Storage(format!("failed to read metadata: {}", e)))?;
    let record: SegmentRecord = serde_json::from_str(&json)
        .map_err(|e| IngestError::Storage(format!("failed to parse metadata: {}", e)))?;
    Ok(record)
}

/// SHA-256 hex digest of a finished segment, streamed from disk.
pub fn sha256_file(path: &Path) -> Result<String, IngestError> {
    let mut file =
        File::open(path).map_err(|e| IngestError::Storage(format!("failed to open file for checksum: {}", e)))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| IngestError::Storage(format!("failed to read file for checksum: {}", e)))?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
