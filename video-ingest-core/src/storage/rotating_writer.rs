use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local, Utc};
use regex::Regex;

use crate::models::config::WriterConfiguration;
use crate::models::error::IngestError;
use crate::models::frame::{Frame, FrameDimensions, PixelFormat};
use crate::models::segment::SegmentRecord;
use crate::storage::annotations::AnnotationWriter;
use crate::storage::{metadata, retention};
use crate::traits::frame_encoder::{EncoderFactory, FrameEncoder};
use crate::traits::ingest_delegate::IngestDelegate;

/// Result of one `WriterSession::write` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Path of the segment opened by this call, if any.
    pub new_file: Option<PathBuf>,
    /// Index of the last frame written to the current segment.
    pub frame_index: Option<u64>,
    /// Whether this frame reached the encoder.
    pub written: bool,
}

/// The segment file currently being written.
struct OpenSegment {
    path: PathBuf,
    encoder: Box<dyn FrameEncoder>,
    annotations: Option<AnnotationWriter>,
    dimensions: FrameDimensions,
    frame_count: u64,
    started_at: DateTime<Utc>,
}

/// Rotating output sink for captured frames.
///
/// Opens a segment lazily on the first write, sweeps expired outputs from
/// the directory right before each open, and closes the segment once it
/// outgrows `max_bytes` or `max_seconds`. Encoding and I/O failures are
/// logged and reported to the delegate; the frame is dropped and the
/// session keeps going.
///
/// Owned by one thread; the open file handle is never shared.
pub struct WriterSession {
    config: WriterConfiguration,
    factory: Arc<dyn EncoderFactory>,
    cleanup_pattern: Regex,
    segment: Option<OpenSegment>,
    last_written: Option<Instant>,
    delegate: Option<Arc<dyn IngestDelegate>>,
    frames_skipped: u64,
    segments_finished: u64,
}

impl WriterSession {
    pub fn new(config: WriterConfiguration, factory: Arc<dyn EncoderFactory>) -> Result<Self, IngestError> {
        config.validate().map_err(IngestError::Configuration)?;
        let cleanup_pattern = build_cleanup_pattern(&config)?;
        Ok(Self {
            config,
            factory,
            cleanup_pattern,
            segment: None,
            last_written: None,
            delegate: None,
            frames_skipped: 0,
            segments_finished: 0,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn IngestDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// Path of the open segment, if any.
    pub fn current_file(&self) -> Option<&Path> {
        self.segment.as_ref().map(|s| s.path.as_path())
    }

    /// Frames written to the open segment.
    pub fn frame_count(&self) -> u64 {
        self.segment.as_ref().map_or(0, |s| s.frame_count)
    }

    /// Calls dropped by `limit_fps`.
    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    pub fn segments_finished(&self) -> u64 {
        self.segments_finished
    }

    /// Pattern the retention sweep matches against full paths.
    pub fn cleanup_pattern(&self) -> &Regex {
        &self.cleanup_pattern
    }

    /// Write `frame`, opening or rotating the segment as needed.
    ///
    /// `annotations` rows go to the companion file, prefixed with the index
    /// the frame gets in its segment. A frame whose size differs from the
    /// open segment's closes that segment and starts a new one.
    pub fn write(&mut self, frame: &Frame, annotations: Option<&[Vec<String>]>) -> WriteOutcome {
        if let Some(segment) = self.segment.as_ref().filter(|s| s.dimensions != frame.dimensions()) {
            log::info!(
                "Segment released after resolution change to {}x{} - {}",
                frame.width(),
                frame.height(),
                segment.path.display()
            );
            self.release();
        }

        let mut new_file = None;
        if self.segment.is_none() {
            match self.open_segment(frame.dimensions()) {
                Ok(path) => new_file = Some(path),
                Err(err) => {
                    self.report(&err);
                    return WriteOutcome {
                        new_file: None,
                        frame_index: None,
                        written: false,
                    };
                }
            }
        }

        let written = if self.is_due() {
            self.write_frame(frame, annotations)
        } else {
            self.frames_skipped += 1;
            false
        };
        let frame_index = self.frame_count().checked_sub(1);
        self.rotate_if_needed();

        WriteOutcome {
            new_file,
            frame_index,
            written,
        }
    }

    /// Close the open segment. The next write opens a new one.
    pub fn release(&mut self) -> Option<SegmentRecord> {
        let segment = self.segment.take()?;
        Some(self.finish_segment(segment))
    }

    fn is_due(&self) -> bool {
        if !self.config.limit_fps {
            return true;
        }
        self.last_written
            .is_none_or(|last| last.elapsed() >= self.config.frame_interval())
    }

    fn write_frame(&mut self, frame: &Frame, annotations: Option<&[Vec<String>]>) -> bool {
        let Some(segment) = self.segment.as_mut() else {
            return false;
        };
        let bgr: Cow<'_, Frame> = match frame.format() {
            PixelFormat::Bgr24 => Cow::Borrowed(frame),
            PixelFormat::Gray8 => Cow::Owned(frame.to_bgr()),
        };

        if let Err(err) = segment.encoder.write_frame(&bgr) {
            self.report(&err);
            return false;
        }

        let mut annotation_error = None;
        if let (Some(writer), Some(rows)) = (segment.annotations.as_mut(), annotations) {
            if let Err(err) = writer.write_rows(segment.frame_count, rows) {
                annotation_error = Some(err);
            }
        }
        segment.frame_count += 1;
        self.last_written = Some(Instant::now());

        if let Some(err) = annotation_error {
            self.report(&err);
        }
        true
    }

    fn rotate_if_needed(&mut self) {
        let Some(segment) = self.segment.as_ref() else {
            return;
        };
        let bytes = segment.encoder.bytes_written();

        let reason = match (self.config.max_bytes, self.config.max_frames()) {
            (Some(max), _) if bytes > max => format!("after {} bytes", bytes),
            (_, Some(max)) if segment.frame_count as f64 > max => {
                format!("after {} frames", segment.frame_count)
            }
            _ => return,
        };
        log::info!("Segment released {} - {}", reason, segment.path.display());
        self.release();
    }

    fn open_segment(&mut self, dimensions: FrameDimensions) -> Result<PathBuf, IngestError> {
        let policy = &self.config.retention;
        if let Err(err) = retention::cleanup(
            policy.max_age_days,
            &self.config.directory,
            &self.cleanup_pattern,
            policy.delete,
        ) {
            log::warn!("Retention sweep failed: {}", err);
        }

        let stem = self.next_stem();
        let path = self.config.directory.join(format!("{}{}", stem, self.config.extension));
        let encoder = self.factory.create(&path, dimensions, self.config.fps)?;

        let annotations = match self.config.annotations {
            Some(ref annotation) => {
                let annotation_path = self.config.directory.join(format!("{}{}", stem, annotation.extension));
                let writer = AnnotationWriter::create(&annotation_path, &annotation.header)?;
                log::info!("Annotations file created - {}", annotation_path.display());
                Some(writer)
            }
            None => None,
        };

        log::info!("Segment opened - {}", path.display());
        self.segment = Some(OpenSegment {
            path: path.clone(),
            encoder,
            annotations,
            dimensions,
            frame_count: 0,
            started_at: Utc::now(),
        });
        self.last_written = None;
        Ok(path)
    }

    /// File name without extension for the next segment.
    ///
    /// Timestamped names get a counter suffix when a segment with the same
    /// timestamp already exists.
    fn next_stem(&self) -> String {
        if !self.config.timestamp_filename {
            return self.config.basename.clone();
        }
        let base = format!("{}-{}", self.config.basename, Local::now().format("%Y%m%d-%H%M%S-%3f"));
        let taken = |stem: &str| {
            self.config
                .directory
                .join(format!("{}{}", stem, self.config.extension))
                .exists()
        };
        if !taken(&base) {
            return base;
        }
        (1u32..)
            .map(|n| format!("{}-{}", base, n))
            .find(|stem| !taken(stem))
            .unwrap_or(base)
    }

    fn finish_segment(&mut self, mut segment: OpenSegment) -> SegmentRecord {
        if let Err(err) = segment.encoder.finish() {
            self.report(&err);
        }
        let annotations_path = segment.annotations.take().map(|a| a.path().to_path_buf());

        let checksum = metadata::sha256_file(&segment.path).unwrap_or_else(|err| {
            log::warn!("Checksum failed for {}: {}", segment.path.display(), err);
            String::new()
        });
        let record = SegmentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: segment.path,
            annotations_path,
            frame_count: segment.frame_count,
            bytes: segment.encoder.bytes_written(),
            started_at: segment.started_at,
            finished_at: Utc::now(),
            checksum,
        };

        if self.config.write_metadata {
            if let Err(err) = metadata::write_metadata(&record) {
                log::warn!("Sidecar not written for {}: {}", record.file_path.display(), err);
            }
        }
        self.segments_finished += 1;
        if let Some(ref delegate) = self.delegate {
            delegate.on_segment_finished(&record);
        }
        record
    }

    fn report(&self, err: &IngestError) {
        log::error!("Frame not written: {}", err);
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(err);
        }
    }
}

impl Drop for WriterSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Anchored pattern matching this writer's segment, annotation and sidecar
/// files anywhere below its directory.
fn build_cleanup_pattern(config: &WriterConfiguration) -> Result<Regex, IngestError> {
    let mut extensions = vec![regex::escape(&config.extension), regex::escape(".metadata.json")];
    if let Some(ref annotation) = config.annotations {
        extensions.push(regex::escape(&annotation.extension));
    }
    let suffix = if config.timestamp_filename { r"-[^/\\]*" } else { "" };
    let pattern = format!(
        r"^{}(.*[/\\])?{}{}({})$",
        regex::escape(&config.directory.to_string_lossy()),
        regex::escape(&config.basename),
        suffix,
        extensions.join("|")
    );
    Regex::new(&pattern).map_err(|e| IngestError::Configuration(format!("invalid cleanup pattern: {}", e)))
}
