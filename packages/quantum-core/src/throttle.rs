//! Cooldown gate for batched refreshes

use std::time::Duration;

use tokio::time::Instant;

/// Default lending refresh cooldown
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

/// Allows at most one passive run per window
#[derive(Debug, Clone)]
pub struct Cooldown {
    window: Duration,
    last_run: Option<Instant>,
    previous_run: Option<Instant>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_run: None,
            previous_run: None,
        }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Time left until the next run is allowed
    pub fn remaining(&self) -> Duration {
        match self.last_run {
            Some(t) => self.window.saturating_sub(t.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Claim the slot if the window has passed. Returns false when throttled.
    pub fn try_acquire(&mut self) -> bool {
        if self.remaining() > Duration::ZERO {
            return false;
        }
        self.previous_run = self.last_run.replace(Instant::now());
        true
    }

    /// Give back the slot taken by the last `try_acquire` when its run failed
    pub fn release(&mut self) {
        self.last_run = self.previous_run.take();
    }

    /// Claim the slot regardless of the window (post-transaction refresh)
    pub fn force(&mut self) {
        self.previous_run = self.last_run.replace(Instant::now());
    }
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::from_secs(DEFAULT_COOLDOWN_SECS)
    }
}
