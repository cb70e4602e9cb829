use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::IngestError;
use crate::models::state::{CaptureDiagnostics, CaptureState};
use crate::session::stop_signal::StopSignal;
use crate::traits::frame_source::{FrameSource, SourceConnector};
use crate::traits::ingest_delegate::IngestDelegate;

/// Mutable session state shared with the background worker.
pub(crate) struct SessionState {
    pub state: CaptureState,
    pub diagnostics: CaptureDiagnostics,
}

/// Everything an acquisition strategy needs from its session.
///
/// Cheap to clone; the async worker thread gets its own copy.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub name: String,
    url: String,
    connector: Arc<dyn SourceConnector>,
    shared: Arc<Mutex<SessionState>>,
    pub delegate: Option<Arc<dyn IngestDelegate>>,
    pub stop: Arc<StopSignal>,
}

impl SessionContext {
    pub fn new(name: String, url: String, connector: Arc<dyn SourceConnector>) -> Self {
        Self {
            name,
            url,
            connector,
            shared: Arc::new(Mutex::new(SessionState {
                state: CaptureState::Disconnected,
                diagnostics: CaptureDiagnostics::default(),
            })),
            delegate: None,
            stop: Arc::new(StopSignal::new()),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.shared.lock().state.clone()
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        self.shared.lock().diagnostics.clone()
    }

    pub fn record(&self, update: impl FnOnce(&mut CaptureDiagnostics)) {
        update(&mut self.shared.lock().diagnostics);
    }

    /// Move to `new_state` and notify the delegate.
    ///
    /// Terminal states are sticky: a late worker cannot revive a session that
    /// was stopped or exhausted.
    pub fn set_state(&self, new_state: CaptureState) {
        {
            let mut s = self.shared.lock();
            if s.state == new_state || (s.state.is_terminal() && !new_state.is_terminal()) {
                return;
            }
            s.state = new_state.clone();
        }
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }

    pub fn report_error(&self, error: &IngestError) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }

    /// Open a fresh connection, tracking the connecting/streaming states.
    pub fn open(&self) -> Result<Box<dyn FrameSource>, IngestError> {
        self.set_state(CaptureState::Connecting);
        match self.connector.open(&self.url) {
            Ok(source) => {
                log::info!("Cam-{}: connected", self.name);
                self.set_state(CaptureState::Streaming);
                Ok(source)
            }
            Err(err) => {
                self.set_state(CaptureState::Disconnected);
                Err(err)
            }
        }
    }
}
