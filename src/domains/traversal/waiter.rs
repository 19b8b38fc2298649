use super::ports::Clock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Satisfied,
    TimedOut,
    Cancelled,
}

impl WaitOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied)
    }
}

/// Stop flag shared between the control loop and whoever may stop it from
/// another thread. Read by every wait of a running stage.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The one blocking primitive of the engine: poll a predicate until it
/// holds, the timeout elapses or the cancel check fires.
///
/// Cancellation is checked before every evaluation, so a stopped run unwinds
/// within one poll interval.
#[derive(Clone)]
pub struct PollingWaiter {
    clock: Arc<dyn Clock>,
}

impl PollingWaiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn wait<P, C>(
        &self,
        mut predicate: P,
        poll_interval: Duration,
        timeout: Duration,
        mut cancel: C,
    ) -> WaitOutcome
    where
        P: FnMut() -> bool,
        C: FnMut() -> bool,
    {
        let started = self.clock.now();
        let mut polls: u32 = 0;
        loop {
            if cancel() {
                tracing::debug!(polls, "wait cancelled");
                return WaitOutcome::Cancelled;
            }
            polls += 1;
            if predicate() {
                tracing::trace!(polls, "wait satisfied");
                return WaitOutcome::Satisfied;
            }
            let elapsed = self
                .clock
                .now()
                .signed_duration_since(started)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if elapsed >= timeout {
                tracing::debug!(polls, elapsed_ms = elapsed.as_millis() as u64, "wait timed out");
                return WaitOutcome::TimedOut;
            }
            // never sleep past the deadline
            self.clock.sleep(poll_interval.min(timeout - elapsed));
        }
    }

    pub fn wait_until<P, C>(&self, predicate: P, poll_interval: Duration, timeout: Duration, cancel: C) -> bool
    where
        P: FnMut() -> bool,
        C: FnMut() -> bool,
    {
        self.wait(predicate, poll_interval, timeout, cancel).is_satisfied()
    }
}
