//! Scripted camera source for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::IngestError;
use crate::models::frame::{Frame, PixelFormat};
use crate::traits::frame_source::{FrameSource, SourceConnector};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// What the next grab does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabScript {
    Ok,
    Empty,
    TransportError,
    /// Block for this many milliseconds, then deliver a picture.
    Stall(u64),
}

/// Counters and scripts shared by every connection a connector opens.
#[derive(Default)]
pub struct SourceLog {
    pub opens: AtomicU64,
    pub failed_opens: AtomicU64,
    pub grabs: AtomicU64,
    pub retrieves: AtomicU64,
    pub releases: AtomicU64,
    pub last_url: Mutex<Option<String>>,
    grab_script: Mutex<VecDeque<GrabScript>>,
    /// Applied once the script runs out.
    default_grab: Mutex<Option<GrabScript>>,
    open_failures: Mutex<u32>,
    decode_failures: Mutex<u32>,
    /// Value of the next produced frame; increments per retrieve.
    next_value: AtomicU64,
}

impl SourceLog {
    pub fn count(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::SeqCst)
    }

    pub fn script_grabs(&self, script: impl IntoIterator<Item = GrabScript>) {
        self.grab_script.lock().extend(script);
    }

    pub fn set_default_grab(&self, outcome: GrabScript) {
        *self.default_grab.lock() = Some(outcome);
    }

    pub fn fail_next_opens(&self, count: u32) {
        *self.open_failures.lock() = count;
    }

    pub fn fail_next_decodes(&self, count: u32) {
        *self.decode_failures.lock() = count;
    }

    fn next_grab(&self) -> GrabScript {
        self.grab_script
            .lock()
            .pop_front()
            .or(*self.default_grab.lock())
            .unwrap_or(GrabScript::Ok)
    }
}

pub struct ScriptedConnector {
    pub log: Arc<SourceLog>,
    native_fps: Option<f64>,
    width: u32,
    height: u32,
}

impl ScriptedConnector {
    pub fn new(native_fps: Option<f64>) -> Self {
        Self {
            log: Arc::new(SourceLog::default()),
            native_fps,
            width: 4,
            height: 2,
        }
    }
}

impl SourceConnector for ScriptedConnector {
    fn open(&self, url: &str) -> Result<Box<dyn FrameSource>, IngestError> {
        *self.log.last_url.lock() = Some(url.to_string());
        {
            let mut failures = self.log.open_failures.lock();
            if *failures > 0 {
                *failures -= 1;
                self.log.failed_opens.fetch_add(1, Ordering::SeqCst);
                return Err(IngestError::Connection(format!("{} unreachable", url)));
            }
        }
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSource {
            log: Arc::clone(&self.log),
            native_fps: self.native_fps,
            width: self.width,
            height: self.height,
            open: true,
            grabbed: false,
        }))
    }
}

pub struct ScriptedSource {
    log: Arc<SourceLog>,
    native_fps: Option<f64>,
    width: u32,
    height: u32,
    open: bool,
    grabbed: bool,
}

impl FrameSource for ScriptedSource {
    fn is_open(&self) -> bool {
        self.open
    }

    fn grab(&mut self) -> Result<bool, IngestError> {
        self.log.grabs.fetch_add(1, Ordering::SeqCst);
        self.grabbed = false;
        match self.log.next_grab() {
            GrabScript::Ok => {
                self.grabbed = true;
                Ok(true)
            }
            GrabScript::Empty => Ok(false),
            GrabScript::Stall(ms) => {
                thread::sleep(Duration::from_millis(ms));
                self.grabbed = true;
                Ok(true)
            }
            GrabScript::TransportError => Err(IngestError::Transport("connection reset".into())),
        }
    }

    fn retrieve(&mut self) -> Option<Frame> {
        self.log.retrieves.fetch_add(1, Ordering::SeqCst);
        if !self.grabbed {
            return None;
        }
        {
            let mut failures = self.log.decode_failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return None;
            }
        }
        let value = self.log.next_value.fetch_add(1, Ordering::SeqCst) as u8;
        let len = (self.width * self.height) as usize;
        Frame::new(vec![value; len], self.width, self.height, PixelFormat::Gray8).ok()
    }

    fn native_fps(&self) -> Option<f64> {
        self.native_fps
    }

    fn release(&mut self) {
        if self.open {
            self.log.releases.fetch_add(1, Ordering::SeqCst);
        }
        self.open = false;
    }
}
