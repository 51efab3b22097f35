//! Hold-to-trigger timers

use crate::gesture::GestureTag;
use std::time::{Duration, Instant};

/// Fires once when a gesture has been held continuously for `hold`
///
/// After firing the timer stays latched until a frame with a different tag
/// arrives, so holding a gesture indefinitely triggers only once.
#[derive(Debug, Clone)]
pub struct HoldTimer {
    tag: GestureTag,
    hold: Duration,
    started_at: Option<Instant>,
    latched: bool,
}

impl HoldTimer {
    pub fn new(tag: GestureTag, hold: Duration) -> Self {
        Self {
            tag,
            hold,
            started_at: None,
            latched: false,
        }
    }

    pub fn tag(&self) -> GestureTag {
        self.tag
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// Feed one frame's tag; returns true on the frame the hold completes
    pub fn update(&mut self, tag: GestureTag, now: Instant) -> bool {
        if tag != self.tag {
            self.started_at = None;
            self.latched = false;
            return false;
        }

        if self.latched {
            return false;
        }

        let started = *self.started_at.get_or_insert(now);
        if now.saturating_duration_since(started) >= self.hold {
            self.started_at = None;
            self.latched = true;
            return true;
        }
        false
    }

    /// Time held so far, if the timer is running
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.started_at.map(|t| now.saturating_duration_since(t))
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.latched = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_fires_after_hold() {
        let mut timer = HoldTimer::new(GestureTag::One, ms(500));
        let t0 = Instant::now();
        assert!(!timer.update(GestureTag::One, t0));
        assert!(!timer.update(GestureTag::One, t0 + ms(499)));
        assert!(timer.update(GestureTag::One, t0 + ms(500)));
    }

    #[test]
    fn test_fires_once_while_held() {
        let mut timer = HoldTimer::new(GestureTag::One, ms(500));
        let t0 = Instant::now();
        let fired = (0..200)
            .filter(|i| timer.update(GestureTag::One, t0 + ms(i * 10)))
            .count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_interruption_restarts() {
        let mut timer = HoldTimer::new(GestureTag::Two, ms(300));
        let t0 = Instant::now();
        timer.update(GestureTag::Two, t0);
        timer.update(GestureTag::None, t0 + ms(200));
        assert!(!timer.update(GestureTag::Two, t0 + ms(350)));
        assert_eq!(timer.elapsed(t0 + ms(400)), Some(ms(50)));
        assert!(timer.update(GestureTag::Two, t0 + ms(650)));
    }

    #[test]
    fn test_release_rearms() {
        let mut timer = HoldTimer::new(GestureTag::ThumbsUp, ms(100));
        let t0 = Instant::now();
        timer.update(GestureTag::ThumbsUp, t0);
        assert!(timer.update(GestureTag::ThumbsUp, t0 + ms(100)));
        timer.update(GestureTag::None, t0 + ms(150));
        timer.update(GestureTag::ThumbsUp, t0 + ms(200));
        assert!(timer.update(GestureTag::ThumbsUp, t0 + ms(300)));
    }
}
