//! Frame timing
//!
//! Supplies the monotonically increasing elapsed time and per-frame delta that
//! drive every tick of the diorama.

use std::time::{Duration, Instant};

/// Timing for a single tick, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    /// Seconds since the clock started
    pub elapsed: f32,
    /// Seconds since the previous tick
    pub delta: f32,
}

/// Monotonic frame clock
///
/// The first tick reports a delta of zero. Instants earlier than the previous
/// tick are treated as "no time passed" so elapsed never goes backwards.
pub struct FrameClock {
    start: Instant,
    last: Option<Instant>,
    elapsed: Duration,
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Creates a clock whose zero point is `start`
    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            last: None,
            elapsed: Duration::ZERO,
            frames: 0,
        }
    }

    /// Advances the clock to `now` and returns the timing for this frame
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let delta = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };

        // Never step backwards, even if the caller hands us a stale instant
        let since_start = now.saturating_duration_since(self.start);
        if since_start > self.elapsed {
            self.elapsed = since_start;
        }
        if self.last.map_or(true, |last| now > last) {
            self.last = Some(now);
        }
        self.frames += 1;

        FrameTime {
            elapsed: self.elapsed.as_secs_f32(),
            delta: delta.as_secs_f32(),
        }
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_has_zero_delta() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        let frame = clock.tick_at(start + Duration::from_millis(10));

        assert_eq!(frame.delta, 0.0);
        assert!((frame.elapsed - 0.010).abs() < 1e-6);
    }

    #[test]
    fn test_delta_and_elapsed_accumulate() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        clock.tick_at(start);
        let frame = clock.tick_at(start + Duration::from_millis(16));

        assert!((frame.delta - 0.016).abs() < 1e-6);
        assert!((frame.elapsed - 0.016).abs() < 1e-6);
        assert_eq!(clock.frame_count(), 2);
    }

    #[test]
    fn test_elapsed_is_monotonic_with_stale_instants() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        let later = clock.tick_at(start + Duration::from_millis(50));
        let stale = clock.tick_at(start + Duration::from_millis(20));

        assert!(stale.elapsed >= later.elapsed);
        assert_eq!(stale.delta, 0.0);
    }
}
