//! Bounded, interruptible polling.

use crate::concurrency::shutdown_requested;
use std::time::{Duration, Instant};
use tracing::debug;
use wpstack_schema::config::ReadinessSettings;

/// Upper bound on a single sleep so Ctrl-C is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

impl From<&ReadinessSettings> for WaitPolicy {
    fn from(settings: &ReadinessSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.timeout_secs),
            interval: Duration::from_secs(settings.interval_secs.max(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready { attempts: u32, elapsed: Duration },
    TimedOut { attempts: u32, elapsed: Duration },
    Interrupted { attempts: u32 },
}

/// Call `probe` every `policy.interval` until it returns `true`, the timeout
/// elapses, or an interrupt is requested. The probe always runs at least once
/// and never after the deadline, so the call returns within
/// `timeout + one probe`.
pub fn wait_until<F>(policy: &WaitPolicy, mut probe: F) -> WaitOutcome
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    let deadline = start + policy.timeout;
    let mut attempts = 0;

    loop {
        attempts += 1;
        if probe() {
            debug!("ready after {attempts} attempt(s) in {:?}", start.elapsed());
            return WaitOutcome::Ready {
                attempts,
                elapsed: start.elapsed(),
            };
        }

        let next = Instant::now() + policy.interval;
        if next > deadline {
            return WaitOutcome::TimedOut {
                attempts,
                elapsed: start.elapsed(),
            };
        }
        while Instant::now() < next {
            if shutdown_requested() {
                return WaitOutcome::Interrupted { attempts };
            }
            let remaining = next.saturating_duration_since(Instant::now());
            std::thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}
