//! Blink detection from face landmarks
//!
//! Computes the Eye Aspect Ratio (EAR) of both eyes each frame and counts
//! closed→open transitions. Blinks are only recorded after the eyes stayed
//! closed for a minimum number of consecutive frames, which filters
//! single-frame detector noise. Two blinks inside the double-blink window
//! form a double blink.

use crate::geometry::distance;
use crate::landmarks::{face, FaceObservation, Point};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

/// EAR reported for a degenerate (zero-width) eye; counts as open
const DEGENERATE_EYE_EAR: f32 = 0.3;

/// Blink detector settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinkSettings {
    /// Average EAR below which the eyes count as closed
    pub ear_threshold: f32,
    /// Consecutive closed frames required before a reopen counts as a blink
    pub min_closed_frames: u32,
    /// Maximum spacing between two blinks forming a double blink
    pub double_blink_window: Duration,
}

impl Default for BlinkSettings {
    fn default() -> Self {
        Self {
            ear_threshold: 0.2,
            min_closed_frames: 2,
            double_blink_window: Duration::from_millis(600),
        }
    }
}

/// Blink count reported for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlinkCount {
    #[default]
    None,
    Single,
    Double,
}

/// Eye Aspect Ratio for one eye
///
/// `eye` is ordered outer corner, upper 1, upper 2, inner corner, lower 2,
/// lower 1: `(|p2-p6| + |p3-p5|) / (2 * |p1-p4|)`.
pub fn eye_aspect_ratio(eye: &[Point; 6]) -> f32 {
    let [p1, p2, p3, p4, p5, p6] = *eye;
    let horizontal = distance(p1, p4);
    if horizontal == 0.0 {
        return DEGENERATE_EYE_EAR;
    }
    (distance(p2, p6) + distance(p3, p5)) / (2.0 * horizontal)
}

/// Average EAR across both eyes
pub fn average_ear(face_obs: &FaceObservation) -> f32 {
    let left = eye_aspect_ratio(&face_obs.eye(&face::LEFT_EYE));
    let right = eye_aspect_ratio(&face_obs.eye(&face::RIGHT_EYE));
    (left + right) / 2.0
}

/// Consecutive-frame, time-windowed blink counter
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    settings: BlinkSettings,
    closed_frames: u32,
    blink_times: VecDeque<Instant>,
}

impl BlinkDetector {
    pub fn new(settings: BlinkSettings) -> Self {
        Self {
            settings,
            closed_frames: 0,
            blink_times: VecDeque::new(),
        }
    }

    /// Process one face observation
    pub fn update(&mut self, face_obs: &FaceObservation, now: Instant) -> BlinkCount {
        self.update_ear(average_ear(face_obs), now)
    }

    /// Process one frame's average EAR
    pub fn update_ear(&mut self, avg_ear: f32, now: Instant) -> BlinkCount {
        if avg_ear < self.settings.ear_threshold {
            self.closed_frames += 1;
            return BlinkCount::None;
        }

        let closed_for = std::mem::take(&mut self.closed_frames);
        if closed_for < self.settings.min_closed_frames {
            return BlinkCount::None;
        }

        self.blink_times.push_back(now);
        let window = self.settings.double_blink_window;
        self.blink_times
            .retain(|t| now.saturating_duration_since(*t) < window);

        match self.blink_times.len() {
            0 => BlinkCount::None,
            1 => {
                debug!("Blink detected after {} closed frames", closed_for);
                BlinkCount::Single
            }
            _ => {
                debug!("Double blink detected");
                self.blink_times.clear();
                BlinkCount::Double
            }
        }
    }

    pub fn reset(&mut self) {
        self.closed_frames = 0;
        self.blink_times.clear();
    }
}

impl Default for BlinkDetector {
    fn default() -> Self {
        Self::new(BlinkSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: f32 = 0.3;
    const CLOSED: f32 = 0.1;

    /// Feed `[closed]*3 + [open]` starting at `start`, 30ms per frame
    fn blink(det: &mut BlinkDetector, start: Instant) -> BlinkCount {
        let frame = Duration::from_millis(30);
        for i in 0..3 {
            assert_eq!(det.update_ear(CLOSED, start + frame * i), BlinkCount::None);
        }
        det.update_ear(OPEN, start + frame * 3)
    }

    #[test]
    fn test_ear_open_and_closed_eye() {
        let open = [
            Point::new(0.0, 0.5),
            Point::new(0.3, 0.4),
            Point::new(0.7, 0.4),
            Point::new(1.0, 0.5),
            Point::new(0.7, 0.6),
            Point::new(0.3, 0.6),
        ];
        assert!((eye_aspect_ratio(&open) - 0.2).abs() < 1e-6);

        let mut closed = open;
        closed[1].y = 0.5;
        closed[2].y = 0.5;
        closed[4].y = 0.5;
        closed[5].y = 0.5;
        assert_eq!(eye_aspect_ratio(&closed), 0.0);
    }

    #[test]
    fn test_degenerate_eye_counts_as_open() {
        let eye = [Point::new(0.5, 0.5); 6];
        assert_eq!(eye_aspect_ratio(&eye), DEGENERATE_EYE_EAR);
    }

    #[test]
    fn test_single_blink() {
        let mut det = BlinkDetector::default();
        assert_eq!(blink(&mut det, Instant::now()), BlinkCount::Single);
    }

    #[test]
    fn test_one_closed_frame_is_noise() {
        let mut det = BlinkDetector::default();
        let t0 = Instant::now();
        det.update_ear(CLOSED, t0);
        assert_eq!(
            det.update_ear(OPEN, t0 + Duration::from_millis(30)),
            BlinkCount::None
        );
    }

    #[test]
    fn test_double_blink_within_window() {
        let mut det = BlinkDetector::default();
        let t0 = Instant::now();
        assert_eq!(blink(&mut det, t0), BlinkCount::Single);
        assert_eq!(
            blink(&mut det, t0 + Duration::from_millis(200)),
            BlinkCount::Double
        );
        // History was cleared, the next blink starts over
        assert_eq!(
            blink(&mut det, t0 + Duration::from_millis(400)),
            BlinkCount::Single
        );
    }

    #[test]
    fn test_blinks_outside_window_are_independent() {
        let mut det = BlinkDetector::default();
        let t0 = Instant::now();
        assert_eq!(blink(&mut det, t0), BlinkCount::Single);
        assert_eq!(
            blink(&mut det, t0 + Duration::from_millis(1500)),
            BlinkCount::Single
        );
    }

    #[test]
    fn test_reset_clears_history() {
        let mut det = BlinkDetector::default();
        let t0 = Instant::now();
        blink(&mut det, t0);
        det.reset();
        assert_eq!(
            blink(&mut det, t0 + Duration::from_millis(200)),
            BlinkCount::Single
        );
    }
}
