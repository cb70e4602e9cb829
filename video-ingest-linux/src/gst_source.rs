//! GStreamer-backed `FrameSource`.
//!
//! Builds `source ! videoconvert ! appsink` with BGR caps. Network URLs go
//! through `uridecodebin`, `/dev/videoN` through `v4l2src`, anything else is
//! treated as a local file. The appsink keeps a single buffer and drops
//! older ones, so a slow reader always sees the newest picture.

use std::time::Duration;

use gstreamer::prelude::*;

use video_ingest_core::models::error::IngestError;
use video_ingest_core::models::frame::{Frame, PixelFormat};
use video_ingest_core::traits::frame_source::{FrameSource, SourceConnector};

/// Opens a GStreamer pipeline per connection.
#[derive(Debug, Clone)]
pub struct GstConnector {
    /// How long `open` waits for the first picture.
    pub connect_timeout: Duration,
    /// How long a grab waits for the next picture.
    pub frame_timeout: Duration,
}

impl Default for GstConnector {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            frame_timeout: Duration::from_millis(500),
        }
    }
}

impl SourceConnector for GstConnector {
    fn open(&self, url: &str) -> Result<Box<dyn FrameSource>, IngestError> {
        Ok(Box::new(GstFrameSource::open(url, self)?))
    }
}

fn pipeline_description(url: &str) -> String {
    let source = if url.contains("://") {
        format!("uridecodebin uri=\"{}\"", url)
    } else if url.starts_with("/dev/video") {
        format!("v4l2src device=\"{}\"", url)
    } else {
        format!("filesrc location=\"{}\" ! decodebin", url)
    };
    format!(
        "{} ! videoconvert ! video/x-raw,format=BGR ! appsink name=appsink sync=false max-buffers=1 drop=true",
        source
    )
}

/// One running pipeline.
pub struct GstFrameSource {
    pipeline: gstreamer::Pipeline,
    appsink: gstreamer_app::AppSink,
    frame_timeout: gstreamer::ClockTime,
    pending: Option<gstreamer::Sample>,
    native_fps: Option<f64>,
    open: bool,
}

impl GstFrameSource {
    /// Start the pipeline and wait for it to preroll.
    pub fn open(url: &str, connector: &GstConnector) -> Result<Self, IngestError> {
        gstreamer::init().map_err(|e| IngestError::Connection(format!("failed to initialize gstreamer: {}", e)))?;

        let pipeline = gstreamer::parse::launch(&pipeline_description(url))
            .map_err(|e| IngestError::Connection(format!("failed to build pipeline: {}", e)))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| IngestError::Connection("pipeline is not a Pipeline".into()))?;
        let appsink = pipeline
            .by_name("appsink")
            .ok_or_else(|| IngestError::Connection("appsink element missing from pipeline".into()))?
            .downcast::<gstreamer_app::AppSink>()
            .map_err(|_| IngestError::Connection("appsink element has unexpected type".into()))?;

        let mut source = Self {
            pipeline,
            appsink,
            frame_timeout: clock_time(connector.frame_timeout),
            pending: None,
            native_fps: None,
            open: false,
        };

        source
            .pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| IngestError::Connection(format!("failed to start pipeline: {}", e)))?;
        source.open = true;

        let preroll = source
            .appsink
            .try_pull_preroll(clock_time(connector.connect_timeout))
            .ok_or_else(|| IngestError::Connection(format!("no picture within {:?}", connector.connect_timeout)))?;
        source.native_fps = sample_fps(&preroll);
        log::info!("GstFrameSource: pipeline running, native rate {:?}", source.native_fps);
        Ok(source)
    }
}

impl FrameSource for GstFrameSource {
    fn is_open(&self) -> bool {
        self.open && !self.appsink.is_eos()
    }

    fn grab(&mut self) -> Result<bool, IngestError> {
        if !self.is_open() {
            return Err(IngestError::Transport("pipeline is not running".into()));
        }
        self.pending = self.appsink.try_pull_sample(self.frame_timeout);
        Ok(self.pending.is_some())
    }

    fn retrieve(&mut self) -> Option<Frame> {
        let sample = self.pending.take()?;
        match sample_to_frame(&sample) {
            Ok(frame) => Some(frame),
            Err(err) => {
                log::warn!("GstFrameSource: {}", err);
                None
            }
        }
    }

    fn native_fps(&self) -> Option<f64> {
        self.native_fps
    }

    fn release(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.pending = None;
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            log::warn!("GstFrameSource: failed to stop pipeline: {}", e);
        }
    }
}

impl Drop for GstFrameSource {
    fn drop(&mut self) {
        self.release();
    }
}

fn clock_time(duration: Duration) -> gstreamer::ClockTime {
    gstreamer::ClockTime::from_mseconds(duration.as_millis() as u64)
}

fn sample_fps(sample: &gstreamer::Sample) -> Option<f64> {
    let info = gstreamer_video::VideoInfo::from_caps(sample.caps()?).ok()?;
    let fps = info.fps();
    if fps.numer() > 0 && fps.denom() > 0 {
        Some(fps.numer() as f64 / fps.denom() as f64)
    } else {
        None
    }
}

/// Copy a BGR sample into a tightly packed frame.
fn sample_to_frame(sample: &gstreamer::Sample) -> Result<Frame, IngestError> {
    let buffer = sample
        .buffer()
        .ok_or_else(|| IngestError::Decode("sample missing buffer".into()))?;
    let caps = sample
        .caps()
        .ok_or_else(|| IngestError::Decode("sample missing caps".into()))?;
    let info = gstreamer_video::VideoInfo::from_caps(caps)
        .map_err(|e| IngestError::Decode(format!("unreadable caps: {}", e)))?;

    let width = info.width();
    let height = info.height();
    let row_bytes = width as usize * 3;
    let stride = info.stride().first().copied().unwrap_or(0) as usize;

    let map = buffer
        .map_readable()
        .map_err(|e| IngestError::Decode(format!("failed to map buffer: {}", e)))?;
    let data = map.as_slice();

    let pixels = if stride == row_bytes {
        data.get(..row_bytes * height as usize)
            .ok_or_else(|| IngestError::Decode("buffer shorter than frame".into()))?
            .to_vec()
    } else {
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            pixels.extend_from_slice(
                data.get(start..start + row_bytes)
                    .ok_or_else(|| IngestError::Decode("buffer row is out of bounds".into()))?,
            );
        }
        pixels
    };

    Frame::new(pixels, width, height, PixelFormat::Bgr24)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_picks_source_element_from_url() {
        assert!(pipeline_description("rtsp://10.0.0.5/stream1").starts_with("uridecodebin uri=\"rtsp://"));
        assert!(pipeline_description("/dev/video2").starts_with("v4l2src device=\"/dev/video2\""));
        assert!(pipeline_description("/data/clip.mp4").starts_with("filesrc location=\"/data/clip.mp4\" ! decodebin"));
        assert!(pipeline_description("/dev/video0").ends_with("max-buffers=1 drop=true"));
    }
}
