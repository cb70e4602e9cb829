//! V4L2 device discovery through sysfs.
//!
//! Every `/sys/class/video4linux/videoN` entry links to the interface of the
//! USB device that owns it; the vendor, product and serial attributes live
//! on that device, one or two levels above the interface.

use std::fs;
use std::path::{Path, PathBuf};

use video_ingest_core::models::error::IngestError;

const SYSFS_VIDEO4LINUX: &str = "/sys/class/video4linux";
const DEV_DIR: &str = "/dev";

/// How far above a node's `device` link to look for USB attributes.
const ATTRIBUTE_SEARCH_DEPTH: usize = 3;

/// Identifiers of the camera to find. Hex ids compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceQuery {
    pub vendor_id: String,
    pub model_id: Option<String>,
    pub serial: Option<String>,
}

impl DeviceQuery {
    pub fn vendor(vendor_id: impl Into<String>) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            ..Default::default()
        }
    }

    fn matches(&self, attributes: &UsbAttributes) -> bool {
        let id_eq = |want: &str, have: &Option<String>| have.as_deref().is_some_and(|h| h.eq_ignore_ascii_case(want));
        id_eq(&self.vendor_id, &attributes.vendor_id)
            && self.model_id.as_deref().is_none_or(|m| id_eq(m, &attributes.model_id))
            && self.serial.as_deref().is_none_or(|s| attributes.serial.as_deref() == Some(s))
    }
}

#[derive(Debug, Default)]
struct UsbAttributes {
    vendor_id: Option<String>,
    model_id: Option<String>,
    serial: Option<String>,
}

/// Resolve the `/dev/videoN` node of the first camera matching `query`.
pub fn find_device_path(query: &DeviceQuery) -> Result<Option<PathBuf>, IngestError> {
    find_device_path_in(Path::new(SYSFS_VIDEO4LINUX), Path::new(DEV_DIR), query)
}

/// `find_device_path` against an arbitrary sysfs class directory.
///
/// Nodes are checked in numeric order. Metadata nodes (sysfs `index` other
/// than 0) are skipped so the capture node of a camera wins.
pub fn find_device_path_in(
    class_dir: &Path,
    dev_dir: &Path,
    query: &DeviceQuery,
) -> Result<Option<PathBuf>, IngestError> {
    let entries = match fs::read_dir(class_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("No video4linux class at {}", class_dir.display());
            return Ok(None);
        }
        Err(e) => {
            return Err(IngestError::Connection(format!(
                "failed to list {}: {}",
                class_dir.display(),
                e
            )))
        }
    };

    let mut nodes: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let number = name.strip_prefix("video")?.parse().ok()?;
            Some((number, entry.path()))
        })
        .collect();
    nodes.sort_by_key(|(number, _)| *number);

    for (number, node) in nodes {
        if read_attribute(&node, "index").is_some_and(|index| index != "0") {
            continue;
        }
        let attributes = usb_attributes(&node.join("device"));
        log::debug!("video{}: {:?}", number, attributes);
        if query.matches(&attributes) {
            let path = dev_dir.join(format!("video{}", number));
            log::info!("Camera {} found at {}", query.vendor_id, path.display());
            return Ok(Some(path));
        }
    }

    log::info!("No camera found for vendor {}", query.vendor_id);
    Ok(None)
}

/// Collect USB attributes from the device link or its closest ancestors.
fn usb_attributes(device_link: &Path) -> UsbAttributes {
    let Ok(device) = fs::canonicalize(device_link) else {
        return UsbAttributes::default();
    };
    let mut attributes = UsbAttributes::default();
    for dir in device.ancestors().take(ATTRIBUTE_SEARCH_DEPTH) {
        attributes.vendor_id = attributes.vendor_id.or_else(|| read_attribute(dir, "idVendor"));
        attributes.model_id = attributes.model_id.or_else(|| read_attribute(dir, "idProduct"));
        attributes.serial = attributes.serial.or_else(|| read_attribute(dir, "serial"));
        if attributes.vendor_id.is_some() {
            break;
        }
    }
    attributes
}

fn read_attribute(dir: &Path, name: &str) -> Option<String> {
    fs::read_to_string(dir.join(name)).ok().map(|value| value.trim().to_string())
}
