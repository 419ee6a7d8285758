//! Playback clock driving the capture loop.

use std::time::Duration;

use tokio::time::Instant;

/// What the clock is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    /// Narration audio playing alongside the capture.
    Narration,
    /// No narration: a silent timeline spanning the subtitles.
    Synthetic,
}

/// Monotonic playback position in `[0, duration]`.
///
/// Built on `tokio::time::Instant` so a paused test runtime drives it
/// deterministically.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    source: ClockSource,
    duration_secs: f64,
    started: Option<Instant>,
}

impl PlaybackClock {
    pub fn narration(duration_secs: f64) -> Self {
        Self::new(ClockSource::Narration, duration_secs)
    }

    pub fn synthetic(duration_secs: f64) -> Self {
        Self::new(ClockSource::Synthetic, duration_secs)
    }

    fn new(source: ClockSource, duration_secs: f64) -> Self {
        let duration_secs = if duration_secs.is_finite() {
            duration_secs.max(0.0)
        } else {
            0.0
        };
        Self {
            source,
            duration_secs,
            started: None,
        }
    }

    pub fn source(&self) -> ClockSource {
        self.source
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Begin playback. Calling twice restarts from zero.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    /// Current position, clamped to the duration. Zero before `start`.
    pub fn current_time(&self) -> f64 {
        match self.started {
            Some(started) => started.elapsed().as_secs_f64().min(self.duration_secs),
            None => 0.0,
        }
    }

    pub fn ended(&self) -> bool {
        self.started.is_some() && self.current_time() >= self.duration_secs
    }

    /// Time left until the end of playback.
    pub fn remaining(&self) -> Duration {
        Duration::from_secs_f64((self.duration_secs - self.current_time()).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_clock_follows_runtime_time() {
        let mut clock = PlaybackClock::narration(2.0);
        assert_eq!(clock.current_time(), 0.0);
        assert!(!clock.ended());

        clock.start();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!((clock.current_time() - 0.5).abs() < 1e-9);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(clock.current_time(), 2.0);
        assert!(clock.ended());
        assert_eq!(clock.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_bad_duration_is_zero() {
        let clock = PlaybackClock::synthetic(f64::NAN);
        assert_eq!(clock.duration_secs(), 0.0);
        assert_eq!(clock.source(), ClockSource::Synthetic);
    }
}
