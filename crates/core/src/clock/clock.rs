use thiserror::Error;
use tokio::time::{Duration, Instant};

/// Default animation rate for clip playback.
pub const DEFAULT_FPS: f64 = 60.0;

#[derive(Debug, Error, PartialEq)]
pub enum ClockError {
    #[error("tick period must be positive, got {0:?}")]
    InvalidPeriod(Duration),

    #[error("frame rate must be a positive number, got {0}")]
    InvalidFrameRate(f64),
}

/// Shared fixed-period tick source.
///
/// The clock only keeps time; whoever owns it decides when to start and stop it. Each
/// tick re-arms the next deadline relative to the *scheduled* deadline rather than the
/// moment the tick actually ran, so host timer jitter doesn't accumulate.
#[derive(Debug, Clone)]
pub struct Clock {
    period: Duration,
    tick: u64,
    running: bool,
    // When the pending tick was meant to fire
    scheduled: Option<Instant>,
    // When the pending tick is actually armed for
    armed: Option<Instant>,
}

impl Clock {
    pub fn new(period: Duration) -> Result<Self, ClockError> {
        if period.is_zero() {
            return Err(ClockError::InvalidPeriod(period));
        }

        Ok(Self {
            period,
            tick: 0,
            running: false,
            scheduled: None,
            armed: None,
        })
    }

    pub fn from_fps(fps: f64) -> Result<Self, ClockError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(ClockError::InvalidFrameRate(fps));
        }
        Self::new(Duration::from_secs_f64(1.0 / fps))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// When the next tick should run, or `None` while stopped.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.armed
    }

    /// Starts from tick 0 with the first tick one period after `now`.
    pub fn start(&mut self, now: Instant) {
        let first = now + self.period;
        self.running = true;
        self.tick = 0;
        self.scheduled = Some(first);
        self.armed = Some(first);
    }

    /// Clears the pending tick and resets the counter to 0.
    pub fn stop(&mut self) {
        self.running = false;
        self.tick = 0;
        self.scheduled = None;
        self.armed = None;
    }

    /// Advances the counter for a tick firing at `now` and arms the next one.
    ///
    /// Returns the new tick number and the delay until the next tick. The delay is
    /// `period - drift`, floored at zero, where drift is how late (or early) this tick
    /// fired relative to its scheduled deadline.
    pub fn advance(&mut self, now: Instant) -> (u64, Duration) {
        let scheduled = self.scheduled.unwrap_or(now);

        let delay = if now >= scheduled {
            let late = now - scheduled;
            if late > self.period {
                log::debug!("Tick {} ran {:?} late", self.tick + 1, late);
            }
            self.period.saturating_sub(late)
        } else {
            self.period + (scheduled - now)
        };

        self.tick += 1;
        self.scheduled = Some(scheduled + self.period);
        self.armed = Some(now + delay);

        (self.tick, delay)
    }
}
