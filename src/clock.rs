//! Pausable elapsed-time clock for the frame loop.
//!
//! `stop()` freezes elapsed-time accounting so a carousel scrolled out of the
//! viewport does not jump forward when it restarts.

use std::time::Duration;
use web_time::Instant;

#[derive(Debug)]
pub struct Clock {
    /// Set while running.
    started_at: Option<Instant>,
    /// Elapsed time accumulated across previous run periods.
    accumulated: Duration,
    /// Instant of the last `delta()` call in the current run period.
    last_tick: Option<Instant>,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            started_at: None,
            accumulated: Duration::ZERO,
            last_tick: None,
        }
    }

    /// Start (or resume) the clock. No-op while already running.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
            self.last_tick = None;
        }
    }

    /// Pause the clock, banking the elapsed time of the current run period.
    pub fn stop(&mut self) {
        if let Some(started_at) = self.started_at.take() {
            self.accumulated += started_at.elapsed();
            self.last_tick = None;
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Total running time in seconds, excluding paused periods.
    pub fn elapsed(&self) -> f32 {
        let current = self
            .started_at
            .map(|s| s.elapsed())
            .unwrap_or(Duration::ZERO);
        (self.accumulated + current).as_secs_f32()
    }

    /// Seconds since the previous `delta()` call (0 on the first call of a
    /// run period, and always 0 while stopped).
    pub fn delta(&mut self) -> f32 {
        if self.started_at.is_none() {
            return 0.0;
        }
        let now = Instant::now();
        let delta = self
            .last_tick
            .map(|t| now.duration_since(t).as_secs_f32())
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        delta
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_is_idempotent() {
        let mut clock = Clock::new();
        clock.start();
        let first_start = clock.started_at;
        clock.start();
        assert_eq!(clock.started_at, first_start);
        assert!(clock.is_running());
    }

    #[test]
    fn test_stopped_clock_freezes_elapsed() {
        let mut clock = Clock::new();
        clock.start();
        std::thread::sleep(Duration::from_millis(5));
        clock.stop();

        let frozen = clock.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.elapsed(), frozen);
        assert!(!clock.is_running());
    }

    #[test]
    fn test_restart_resumes_without_jump() {
        let mut clock = Clock::new();
        clock.start();
        std::thread::sleep(Duration::from_millis(5));
        clock.stop();
        let banked = clock.elapsed();

        // A long pause must not count toward elapsed time.
        std::thread::sleep(Duration::from_millis(20));
        clock.start();
        let resumed = clock.elapsed();
        assert!(resumed >= banked);
        assert!(resumed - banked < 0.015, "paused time leaked into elapsed");
    }

    #[test]
    fn test_delta_is_zero_while_stopped() {
        let mut clock = Clock::new();
        assert_eq!(clock.delta(), 0.0);
        clock.start();
        clock.delta();
        clock.stop();
        assert_eq!(clock.delta(), 0.0);
    }

    #[test]
    fn test_first_delta_after_start_is_zero() {
        let mut clock = Clock::new();
        clock.start();
        assert_eq!(clock.delta(), 0.0);
        std::thread::sleep(Duration::from_millis(2));
        assert!(clock.delta() > 0.0);
    }
}
