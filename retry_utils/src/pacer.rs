use crate::Sleeper;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Keeps consecutive requests of one batch at least `delay` apart.
///
/// The first request of a batch goes out immediately; every later call to
/// [`RequestPacer::pace`] suspends for `delay`. Call [`RequestPacer::reset`]
/// to start a new batch.
pub struct RequestPacer {
    delay: Duration,
    sleeper: Arc<dyn Sleeper>,
    started: AtomicBool,
}

impl RequestPacer {
    pub fn new(delay: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            delay,
            sleeper,
            started: AtomicBool::new(false),
        }
    }

    pub async fn pace(&self) {
        if !self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.delay.is_zero() {
            return;
        }
        debug!("Adding delay of {}ms before next request", self.delay.as_millis());
        self.sleeper.sleep(self.delay).await;
    }

    pub fn reset(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
