//! Rate-limited periodic timer feeding `timer` events into the tick loop.

use std::time::{Duration, Instant};

use retopo_config::{TimerConfig, clamp_hz};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TimerHandler {
    hz: f64,
    interval: Duration,
    enabled: bool,
    running: bool,
    last_fire: Option<Instant>,
}

impl Default for TimerHandler {
    fn default() -> Self {
        Self::from_config(&TimerConfig::default())
    }
}

impl TimerHandler {
    /// Create a running timer. Rates below the minimum are clamped. The
    /// first poll anchors the interval.
    pub fn new(hz: f64) -> Self {
        let hz = clamp_hz(hz);
        Self {
            hz,
            interval: Duration::from_secs_f64(1.0 / hz),
            enabled: true,
            running: true,
            last_fire: None,
        }
    }

    pub fn from_config(config: &TimerConfig) -> Self {
        let mut timer = Self::new(config.hz);
        timer.enabled = config.enabled;
        timer
    }

    pub fn hz(&self) -> f64 {
        self.hz
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_hz(&mut self, hz: f64) {
        let hz = clamp_hz(hz);
        self.hz = hz;
        self.interval = Duration::from_secs_f64(1.0 / hz);
    }

    /// Resume a stopped timer; the next poll re-anchors the interval.
    pub fn start(&mut self) {
        if !self.running {
            debug!("timer started at {:.2} Hz", self.hz);
            self.running = true;
            self.last_fire = None;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.last_fire = None;
    }

    pub fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether a `timer` event is due at `now`. Missed intervals collapse
    /// into a single event.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !(self.enabled && self.running) {
            return false;
        }
        let Some(last) = self.last_fire else {
            self.last_fire = Some(now);
            return false;
        };
        if now.saturating_duration_since(last) < self.interval {
            return false;
        }
        self.last_fire = Some(now);
        true
    }
}
