use std::sync::Arc;
use std::time::Duration;

use crate::models::config::RetryPolicy;
use crate::models::error::IngestError;
use crate::session::stop_signal::StopSignal;

/// How loudly a failed trial is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSeverity {
    /// Logged as a warning; retried after the backoff.
    Routine,
    /// Period-anchored "feed lost" error; still retried.
    FeedLost,
    /// Trial ceiling reached; the operation is abandoned.
    Exhausted,
}

/// Trial counter and backoff ladder for one retried operation.
///
/// Counts consecutive failures, resets on success, sleeps a short delay for
/// the first `short_trials` failures and a long one afterwards. Sleeps wait
/// on the session's `StopSignal`, so a stop request cancels them.
pub struct RecoveryPolicy {
    camera: String,
    operation: &'static str,
    policy: RetryPolicy,
    trial: u32,
    stop: Arc<StopSignal>,
}

impl RecoveryPolicy {
    pub fn new(
        camera: impl Into<String>,
        operation: &'static str,
        policy: RetryPolicy,
        stop: Arc<StopSignal>,
    ) -> Self {
        Self {
            camera: camera.into(),
            operation,
            policy,
            trial: 0,
            stop,
        }
    }

    /// Consecutive failures since the last success.
    pub fn trial(&self) -> u32 {
        self.trial
    }

    pub fn record_success(&mut self) {
        if self.trial > self.policy.recovery_report_after {
            log::info!(
                "Cam-{}: {} success after {} failed trials",
                self.camera,
                self.operation,
                self.trial
            );
        }
        self.trial = 0;
    }

    /// Count a failure and classify it.
    pub fn record_failure(&mut self, error: &IngestError) -> FailureSeverity {
        let index = self.trial;
        self.trial = self.trial.saturating_add(1);

        if self.trial >= self.policy.max_consecutive_failures {
            log::error!(
                "Cam-{}: {} abandoned after {} consecutive failures: {}",
                self.camera,
                self.operation,
                self.trial,
                error
            );
            return FailureSeverity::Exhausted;
        }

        if index % self.policy.feed_lost_period == self.policy.feed_lost_offset {
            log::error!(
                "Cam-{}: feed lost, {} failing for {} trials: {}",
                self.camera,
                self.operation,
                self.trial,
                error
            );
            FailureSeverity::FeedLost
        } else {
            log::warn!(
                "Cam-{}: failed to {}, trial {}: {}",
                self.camera,
                self.operation,
                index,
                error
            );
            FailureSeverity::Routine
        }
    }

    /// Count a failure, turning exhaustion into `ExhaustedRetries`.
    pub fn fail(&mut self, error: &IngestError) -> Result<FailureSeverity, IngestError> {
        match self.record_failure(error) {
            FailureSeverity::Exhausted => Err(self.exhausted_error()),
            severity => Ok(severity),
        }
    }

    pub fn exhausted_error(&self) -> IngestError {
        IngestError::ExhaustedRetries {
            operation: self.operation.to_string(),
            trials: self.trial,
        }
    }

    /// Delay before the next trial.
    pub fn backoff(&self) -> Duration {
        if self.trial <= self.policy.short_trials {
            self.policy.short_delay()
        } else {
            self.policy.long_delay()
        }
    }

    /// Sleep the current backoff. `Cancelled` if a stop arrives first.
    pub fn pause(&self) -> Result<(), IngestError> {
        if self.stop.wait(self.backoff()) {
            Err(IngestError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run `action` until it succeeds, a non-transient error occurs, the
    /// trial ceiling is reached or a stop is requested.
    pub fn attempt<T>(
        &mut self,
        mut action: impl FnMut() -> Result<T, IngestError>,
    ) -> Result<T, IngestError> {
        loop {
            if self.stop.is_stopped() {
                return Err(IngestError::Cancelled);
            }
            match action() {
                Ok(value) => {
                    self.record_success();
                    return Ok(value);
                }
                Err(err) if err.is_transient() => {
                    self.fail(&err)?;
                    self.pause()?;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
