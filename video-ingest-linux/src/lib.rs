//! # video-ingest-linux
//!
//! Linux backends for video-ingest.
//!
//! Provides:
//! - `find_device_path` — resolve `/dev/videoN` from USB vendor/model/serial via sysfs
//! - `GstConnector` / `GstFrameSource` — GStreamer frame source for RTSP/HTTP URLs,
//!   V4L2 devices and local files (feature `gstreamer-source`)
//!
//! ## Platform Requirements
//! - Linux with sysfs mounted at `/sys`
//! - GStreamer 1.x development packages for the `gstreamer-source` feature
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use video_ingest_core::{CameraConfiguration, CaptureSession};
//! use video_ingest_linux::{find_device_path, DeviceQuery, GstConnector};
//!
//! let device = find_device_path(&DeviceQuery::vendor("046d"))?.expect("camera attached");
//! let config = CameraConfiguration {
//!     url: device.display().to_string(),
//!     ..Default::default()
//! };
//! let mut session = CaptureSession::new(config, Arc::new(GstConnector::default()))?;
//! let frame = session.read()?;
//! ```

#[cfg(target_os = "linux")]
pub mod device_path;
#[cfg(all(target_os = "linux", feature = "gstreamer-source"))]
pub mod gst_source;

#[cfg(target_os = "linux")]
pub use device_path::{find_device_path, find_device_path_in, DeviceQuery};
#[cfg(all(target_os = "linux", feature = "gstreamer-source"))]
pub use gst_source::{GstConnector, GstFrameSource};
