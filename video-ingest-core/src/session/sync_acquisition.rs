use crate::models::config::CameraConfiguration;
use crate::models::error::IngestError;
use crate::models::frame::Frame;
use crate::models::state::CaptureState;
use crate::processing::pacing;
use crate::session::context::SessionContext;
use crate::session::recovery::RecoveryPolicy;
use crate::traits::frame_source::FrameSource;

/// Acquisition on the caller's thread.
///
/// Every grab, reconnection and backoff sleep blocks the caller, including
/// the long escalation delay; run it on a dedicated worker thread.
pub(crate) struct SyncAcquisition {
    source: Option<Box<dyn FrameSource>>,
    target_fps: f64,
    configured_source_fps: Option<f64>,
    source_fps: Option<f64>,
    skip_factor: u32,
    connect_recovery: RecoveryPolicy,
    grab_recovery: RecoveryPolicy,
    started: bool,
}

impl SyncAcquisition {
    pub fn new(config: &CameraConfiguration, ctx: &SessionContext) -> Self {
        Self {
            source: None,
            target_fps: config.target_fps,
            configured_source_fps: config.source_fps,
            source_fps: config.source_fps,
            skip_factor: pacing::skip_factor(config.source_fps, config.target_fps),
            connect_recovery: RecoveryPolicy::new(
                ctx.name.clone(),
                "initialize",
                config.retry.clone(),
                ctx.stop.clone(),
            ),
            grab_recovery: RecoveryPolicy::new(ctx.name.clone(), "grab", config.retry.clone(), ctx.stop.clone()),
            started: false,
        }
    }

    pub fn skip_factor(&self) -> u32 {
        self.skip_factor
    }

    pub fn source_fps(&self) -> Option<f64> {
        self.source_fps
    }

    /// Connect with bounded retries. Idempotent once connected.
    pub fn start(&mut self, ctx: &SessionContext) -> Result<(), IngestError> {
        if self.started {
            return Ok(());
        }
        let source = self.connect_recovery.attempt(|| ctx.open())?;
        self.install(ctx, source);
        self.started = true;
        Ok(())
    }

    /// Grab `skip_factor` pictures and decode only the last one.
    ///
    /// A failed or impossible grab reconnects and retries that same grab
    /// before moving on, so the delivered frame is always the newest one the
    /// source produced at the target rate.
    pub fn acquire(&mut self, ctx: &SessionContext) -> Result<Frame, IngestError> {
        self.start(ctx)?;

        for remaining in (0..self.skip_factor).rev() {
            self.grab_with_recovery(ctx)?;
            if remaining == 0 {
                return self.retrieve(ctx);
            }
        }
        Err(IngestError::Decode("no picture grabbed".into()))
    }

    pub fn shutdown(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.release();
        }
        self.started = false;
    }

    fn install(&mut self, ctx: &SessionContext, source: Box<dyn FrameSource>) {
        self.source_fps = self.configured_source_fps.or_else(|| source.native_fps());
        let skip = pacing::skip_factor(self.source_fps, self.target_fps);
        if skip != self.skip_factor {
            log::info!(
                "Cam-{}: source at {:?} fps, keeping 1 of every {} frames",
                ctx.name,
                self.source_fps,
                skip
            );
        }
        self.skip_factor = skip;
        self.source = Some(source);
    }

    /// Tear down the connection and open a new one, once.
    fn reinitialize(&mut self, ctx: &SessionContext) {
        if let Some(mut source) = self.source.take() {
            source.release();
        }
        ctx.record(|d| d.reconnects += 1);
        match ctx.open() {
            Ok(source) => self.install(ctx, source),
            Err(err) => log::warn!("Cam-{}: reconnect failed: {}", ctx.name, err),
        }
    }

    fn grab_once(&mut self, ctx: &SessionContext) -> Result<(), IngestError> {
        let source = match self.source.as_mut() {
            Some(source) if source.is_open() => source,
            _ => return Err(IngestError::Transport("connection is not open".into())),
        };
        ctx.record(|d| d.grabs += 1);
        match source.grab() {
            Ok(true) => Ok(()),
            Ok(false) => Err(IngestError::Transport("grab returned no picture".into())),
            Err(err) => Err(err),
        }
    }

    fn grab_with_recovery(&mut self, ctx: &SessionContext) -> Result<(), IngestError> {
        loop {
            if ctx.stop.is_stopped() {
                return Err(IngestError::Cancelled);
            }
            match self.grab_once(ctx) {
                Ok(()) => {
                    self.grab_recovery.record_success();
                    return Ok(());
                }
                Err(err) => {
                    ctx.record(|d| d.transport_failures += 1);
                    ctx.set_state(CaptureState::Disconnected);
                    self.grab_recovery.fail(&err)?;
                    self.reinitialize(ctx);
                    self.grab_recovery.pause()?;
                }
            }
        }
    }

    fn retrieve(&mut self, ctx: &SessionContext) -> Result<Frame, IngestError> {
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| IngestError::Transport("connection is not open".into()))?;
        ctx.record(|d| d.retrieves += 1);
        source.retrieve().ok_or_else(|| {
            ctx.record(|d| d.decode_failures += 1);
            IngestError::Decode(format!("Cam-{}: decoder returned no frame", ctx.name))
        })
    }
}
