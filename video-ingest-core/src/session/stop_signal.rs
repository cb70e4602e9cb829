use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Cooperative stop flag with interruptible sleeps.
///
/// Retry backoffs and the background read loop wait on this instead of
/// `thread::sleep`, so a stop request wakes them immediately.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop and wake every waiter.
    pub fn stop(&self) {
        *self.stopped.lock() = true;
        self.condvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleep for `duration` or until stopped. Returns `true` when stopped.
    ///
    /// A duration past the end of the clock waits for the stop alone.
    pub fn wait(&self, duration: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if duration.is_zero() {
            return *stopped;
        }
        let deadline = Instant::now().checked_add(duration);
        while !*stopped {
            match deadline {
                Some(deadline) => {
                    if self.condvar.wait_until(&mut stopped, deadline).timed_out() {
                        break;
                    }
                }
                None => self.condvar.wait(&mut stopped),
            }
        }
        *stopped
    }
}
