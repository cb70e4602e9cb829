use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::models::config::{AsyncTuning, CameraConfiguration};
use crate::models::error::IngestError;
use crate::models::frame::Frame;
use crate::processing::pacing;
use crate::session::context::SessionContext;
use crate::session::mailbox::Mailbox;
use crate::session::recovery::RecoveryPolicy;
use crate::session::stop_signal::StopSignal;
use crate::traits::frame_source::FrameSource;

/// Handle to one background reader thread.
struct Worker {
    stop: Arc<StopSignal>,
    /// Disconnects when the worker thread returns.
    exited: Receiver<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// Acquisition through a background reader and a single-slot mailbox.
///
/// The worker owns its own connection and reads as fast as the source
/// delivers; the consumer paces itself to the target rate and takes whatever
/// frame is newest. When the mailbox stays empty the consumer climbs the
/// recovery ladder and periodically replaces the worker with a fresh one.
pub(crate) struct AsyncAcquisition {
    tuning: AsyncTuning,
    target_fps: f64,
    mailbox: Arc<Mailbox>,
    worker: Option<Worker>,
    poll_recovery: RecoveryPolicy,
    last_delivery: Option<Instant>,
}

impl AsyncAcquisition {
    pub fn new(config: &CameraConfiguration, ctx: &SessionContext) -> Self {
        Self {
            tuning: config.async_tuning.clone(),
            target_fps: config.target_fps,
            mailbox: Arc::new(Mailbox::new()),
            worker: None,
            poll_recovery: RecoveryPolicy::new(ctx.name.clone(), "poll", config.retry.clone(), ctx.stop.clone()),
            last_delivery: None,
        }
    }

    /// Spawn the background reader if none is running.
    pub fn start(&mut self, ctx: &SessionContext) -> Result<(), IngestError> {
        if self.worker.as_ref().is_some_and(Worker::is_alive) {
            return Ok(());
        }
        self.spawn_worker(ctx)
    }

    /// Sleep until the next frame is due, then take the newest frame.
    pub fn acquire(&mut self, ctx: &SessionContext) -> Result<Frame, IngestError> {
        self.start(ctx)?;

        let delay = pacing::poll_delay(
            self.target_fps,
            self.last_delivery.map(|t| t.elapsed()),
            Duration::from_millis(self.tuning.min_sleep_ms),
            Duration::from_millis(self.tuning.unpaced_sleep_ms),
        );
        if ctx.stop.wait(delay) {
            return Err(IngestError::Cancelled);
        }

        loop {
            if let Some(frame) = self.mailbox.take() {
                self.poll_recovery.record_success();
                self.last_delivery = Some(Instant::now());
                return Ok(frame);
            }

            let miss = IngestError::Transport("capture worker delivered no frame".into());
            self.poll_recovery.fail(&miss)?;

            if self.poll_recovery.trial() % self.tuning.restart_period == 0 {
                log::debug!("Cam-{}: restarting capture worker", ctx.name);
                self.stop_worker(ctx);
                ctx.record(|d| d.worker_restarts += 1);
            }
            if !self.worker.as_ref().is_some_and(Worker::is_alive) {
                self.spawn_worker(ctx)?;
            }

            self.poll_recovery.pause()?;
        }
    }

    pub fn shutdown(&mut self, ctx: &SessionContext) {
        self.stop_worker(ctx);
        self.mailbox.take();
    }

    fn spawn_worker(&mut self, ctx: &SessionContext) -> Result<(), IngestError> {
        let stop = Arc::new(StopSignal::new());
        let (exit_tx, exited) = mpsc::channel();
        let worker_ctx = ctx.clone();
        let worker_stop = Arc::clone(&stop);
        let mailbox = Arc::clone(&self.mailbox);
        let idle = Duration::from_millis(self.tuning.worker_idle_ms);

        let handle = thread::Builder::new()
            .name(format!("capture-{}", ctx.name))
            .spawn(move || run_worker(worker_ctx, mailbox, worker_stop, idle, exit_tx))
            .map_err(|e| IngestError::Transport(format!("failed to spawn capture worker: {}", e)))?;

        self.worker = Some(Worker {
            stop,
            exited,
            handle: Some(handle),
        });
        Ok(())
    }

    /// Signal the worker and wait up to the join timeout.
    ///
    /// A worker stuck in a blocking read is detached and logged; it releases
    /// its connection whenever the read returns.
    fn stop_worker(&mut self, ctx: &SessionContext) {
        let Some(mut worker) = self.worker.take() else {
            return;
        };
        worker.stop.stop();

        let timeout = Duration::from_millis(self.tuning.join_timeout_ms);
        match worker.exited.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                log::error!(
                    "Cam-{}: capture worker did not stop within {:?}; continuing without it",
                    ctx.name,
                    timeout
                );
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = worker.handle.take() {
                    if handle.join().is_err() {
                        log::error!("Cam-{}: capture worker panicked", ctx.name);
                    }
                }
            }
        }
    }
}

fn run_worker(
    ctx: SessionContext,
    mailbox: Arc<Mailbox>,
    stop: Arc<StopSignal>,
    idle: Duration,
    exit_tx: Sender<()>,
) {
    log::debug!("Cam-{}: capture worker started", ctx.name);
    let mut source: Option<Box<dyn FrameSource>> = None;

    while !stop.is_stopped() && !ctx.stop.is_stopped() {
        match source.as_mut().filter(|s| s.is_open()) {
            Some(open) => {
                ctx.record(|d| d.grabs += 1);
                match open.read() {
                    Ok(Some(frame)) => {
                        let overwrote = mailbox.post(frame);
                        ctx.record(|d| {
                            d.retrieves += 1;
                            if overwrote {
                                d.mailbox_overwrites += 1;
                            }
                        });
                    }
                    Ok(None) => log::warn!("Cam-{}: capture worker read no frame", ctx.name),
                    Err(err) => {
                        ctx.record(|d| d.transport_failures += 1);
                        log::error!("Cam-{}: capture worker read failed: {}", ctx.name, err);
                    }
                }
            }
            None => source = reconnect(&ctx, source.take()),
        }

        if stop.wait(idle) {
            break;
        }
    }

    if let Some(mut open) = source.take() {
        open.release();
    }
    log::debug!("Cam-{}: capture worker stopped", ctx.name);
    drop(exit_tx);
}

fn reconnect(ctx: &SessionContext, stale: Option<Box<dyn FrameSource>>) -> Option<Box<dyn FrameSource>> {
    if let Some(mut closed) = stale {
        closed.release();
    }
    match ctx.open() {
        Ok(opened) => Some(opened),
        Err(err) => {
            log::warn!("Cam-{}: capture worker cannot connect: {}", ctx.name, err);
            None
        }
    }
}
