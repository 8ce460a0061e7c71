use std::time::{Duration, Instant};

/// Decides when a process-timeout tick is due.
///
/// The host clock is only sampled every `sample_every` calls; between
/// samples the answer is always "not yet". A tick that could not be acted
/// on can be held back with [`owe`](Self::owe) and collected later.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    origin: Instant,
    last_tick: Duration,
    interval: Duration,
    sample_every: u32,
    countdown: u32,
    owed: bool,
}

impl IntervalTimer {
    pub fn new(interval: Duration, sample_every: u32) -> Self {
        Self {
            origin: Instant::now(),
            last_tick: Duration::ZERO,
            interval,
            sample_every,
            countdown: sample_every,
            owed: false,
        }
    }

    pub fn reset(&mut self) {
        self.origin = Instant::now();
        self.last_tick = Duration::ZERO;
        self.countdown = self.sample_every;
        self.owed = false;
    }

    /// Keep a due tick for later. Several owed ticks collapse into one.
    pub fn owe(&mut self) {
        self.owed = true;
    }

    pub fn take_owed(&mut self) -> bool {
        std::mem::take(&mut self.owed)
    }

    pub fn tick_due(&mut self) -> bool {
        if self.countdown > 0 {
            self.countdown -= 1;
            return false;
        }
        self.countdown = self.sample_every;
        let now = self.origin.elapsed();
        if now.saturating_sub(self.last_tick) >= self.interval {
            self.last_tick = now;
            true
        } else {
            false
        }
    }
}
