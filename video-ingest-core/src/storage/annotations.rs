use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::error::IngestError;

/// Companion CSV file holding per-frame annotation rows.
///
/// The header row is written once when the file is created; every row
/// afterwards starts with the index of the frame it describes.
pub struct AnnotationWriter {
    path: PathBuf,
    file: BufWriter<File>,
}

impl AnnotationWriter {
    pub fn create(path: &Path, header: &[String]) -> Result<Self, IngestError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| IngestError::Write(format!("failed to open {}: {}", path.display(), e)))?;
        let mut writer = Self {
            path: path.to_path_buf(),
            file: BufWriter::new(file),
        };
        if !header.is_empty() {
            writer.write_record(header.iter().map(String::as_str))?;
            writer.flush()?;
        }
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `rows`, each prefixed with `frame_index`.
    pub fn write_rows(&mut self, frame_index: u64, rows: &[Vec<String>]) -> Result<(), IngestError> {
        let index = frame_index.to_string();
        for row in rows {
            let fields = std::iter::once(index.as_str()).chain(row.iter().map(String::as_str));
            self.write_record(fields)?;
        }
        self.flush()
    }

    fn write_record<'a>(&mut self, fields: impl Iterator<Item = &'a str>) -> Result<(), IngestError> {
        let line = fields.map(escape_field).collect::<Vec<_>>().join(",");
        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.write_all(b"\r\n"))
            .map_err(|e| IngestError::Write(format!("annotation write failed: {}", e)))
    }

    fn flush(&mut self) -> Result<(), IngestError> {
        self.file
            .flush()
            .map_err(|e| IngestError::Write(format!("annotation flush failed: {}", e)))
    }
}

/// Quote a field that holds a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn header_once_then_indexed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lobby.csv");
        let mut writer = AnnotationWriter::create(&path, &row(&["frame", "label", "score"])).unwrap();

        writer.write_rows(0, &[row(&["person", "0.91"])]).unwrap();
        writer
            .write_rows(1, &[row(&["car", "0.55"]), row(&["dog", "0.40"])])
            .unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "frame,label,score\r\n0,person,0.91\r\n1,car,0.55\r\n1,dog,0.40\r\n"
        );
    }

    #[test]
    fn fields_with_separators_are_quoted() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn empty_header_writes_no_header_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lobby.csv");
        let mut writer = AnnotationWriter::create(&path, &[]).unwrap();
        writer.write_rows(4, &[row(&["x"])]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "4,x\r\n");
    }
}
