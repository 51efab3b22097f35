//! Hand-driven relative cursor motion
//!
//! The pointer hand steers like a joystick: the vector from the index
//! knuckle to the index tip gives the direction, its length the speed.
//! Closing the hand engages the clutch, which is a hard stop: nothing is
//! emitted and the smoothing state is frozen, not decayed.

use crate::geometry::{distance, magnitude, vector};
use crate::landmarks::{hand, HandObservation};

/// Cursor motion settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorSettings {
    /// Knuckle-to-tip distance below which the hand counts as closed
    pub clutch_threshold: f32,
    /// Direction magnitude below which no motion is emitted
    pub deadzone: f32,
    /// Exponential smoothing factor for the direction
    pub smoothing_alpha: f32,
    pub base_gain: f32,
    pub max_gain: f32,
    /// Magnitude multiplier feeding the gain ramp
    pub gain_ramp: f32,
}

impl Default for CursorSettings {
    fn default() -> Self {
        Self {
            clutch_threshold: 0.045,
            deadzone: 0.005,
            smoothing_alpha: 0.3,
            base_gain: 35.0,
            max_gain: 120.0,
            gain_ramp: 4.0,
        }
    }
}

/// Outcome of one frame of pointer-hand processing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CursorStep {
    /// Hand is closed; motion suspended
    Clutched,
    /// Pointing vector shorter than the deadzone
    Deadzone,
    /// Relative pointer move in screen pixels
    Move { dx: f32, dy: f32 },
}

/// Smoothed direction-vector cursor controller
#[derive(Debug, Clone)]
pub struct CursorMotionController {
    settings: CursorSettings,
    smoothed: (f32, f32),
    clutched: bool,
}

impl CursorMotionController {
    pub fn new(settings: CursorSettings) -> Self {
        Self {
            settings,
            smoothed: (0.0, 0.0),
            clutched: false,
        }
    }

    /// Process one frame of the pointer hand
    pub fn update(&mut self, hand_obs: &HandObservation) -> CursorStep {
        let origin = hand_obs.point(hand::INDEX_MCP);
        let tip = hand_obs.point(hand::INDEX_TIP);

        if distance(origin, tip) < self.settings.clutch_threshold {
            if !self.clutched {
                tracing::debug!("Cursor clutch engaged");
            }
            self.clutched = true;
            return CursorStep::Clutched;
        }

        if self.clutched {
            tracing::debug!("Cursor clutch released");
            self.clutched = false;
            self.reset();
        }

        let raw = vector(origin, tip);
        let mag = magnitude(raw);
        if mag < self.settings.deadzone {
            return CursorStep::Deadzone;
        }

        let alpha = self.settings.smoothing_alpha;
        let unit = (raw.0 / mag, raw.1 / mag);
        self.smoothed = (
            self.smoothed.0 * (1.0 - alpha) + unit.0 * alpha,
            self.smoothed.1 * (1.0 - alpha) + unit.1 * alpha,
        );

        let s = &self.settings;
        let gain = s.base_gain + (s.max_gain - s.base_gain) * (mag * s.gain_ramp).min(1.0);

        CursorStep::Move {
            dx: self.smoothed.0 * gain,
            dy: self.smoothed.1 * gain,
        }
    }

    /// Current smoothed direction
    pub fn smoothed(&self) -> (f32, f32) {
        self.smoothed
    }

    pub fn reset(&mut self) {
        self.smoothed = (0.0, 0.0);
    }
}

impl Default for CursorMotionController {
    fn default() -> Self {
        Self::new(CursorSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::poses;
    use crate::landmarks::Handedness;

    fn pointing(dx: f32, dy: f32) -> HandObservation {
        HandObservation::new(poses::pointing(dx, dy), Handedness::Right, 0.9)
    }

    #[test]
    fn test_first_move_is_alpha_scaled() {
        let mut ctl = CursorMotionController::default();
        // Magnitude 0.1 → gain = 35 + 85 * 0.4 = 69
        match ctl.update(&pointing(0.1, 0.0)) {
            CursorStep::Move { dx, dy } => {
                assert!((dx - 0.3 * 69.0).abs() < 1e-3);
                assert!(dy.abs() < 1e-6);
            }
            other => panic!("expected move, got {:?}", other),
        }
    }

    #[test]
    fn test_gain_caps_at_max() {
        let mut ctl = CursorMotionController::default();
        match ctl.update(&pointing(0.0, -0.3)) {
            CursorStep::Move { dy, .. } => assert!((dy + 0.3 * 120.0).abs() < 1e-3),
            other => panic!("expected move, got {:?}", other),
        }
    }

    #[test]
    fn test_smoothing_converges_towards_direction() {
        let mut ctl = CursorMotionController::default();
        for _ in 0..50 {
            ctl.update(&pointing(0.1, 0.0));
        }
        let (sx, sy) = ctl.smoothed();
        assert!((sx - 1.0).abs() < 1e-3);
        assert!(sy.abs() < 1e-6);
    }

    #[test]
    fn test_clutch_freezes_state() {
        let mut ctl = CursorMotionController::default();
        ctl.update(&pointing(0.1, 0.0));
        let before = ctl.smoothed();

        for _ in 0..10 {
            assert_eq!(ctl.update(&pointing(0.01, 0.01)), CursorStep::Clutched);
        }
        assert_eq!(ctl.smoothed(), before);
    }

    #[test]
    fn test_clutch_release_starts_fresh() {
        let mut ctl = CursorMotionController::default();
        for _ in 0..10 {
            ctl.update(&pointing(0.1, 0.0));
        }
        ctl.update(&pointing(0.01, 0.0));
        ctl.update(&pointing(0.0, 0.1));
        let (sx, sy) = ctl.smoothed();
        assert_eq!(sx, 0.0);
        assert!((sy - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_deadzone_emits_nothing() {
        let mut ctl = CursorMotionController::new(CursorSettings {
            clutch_threshold: 0.0,
            ..CursorSettings::default()
        });
        assert_eq!(ctl.update(&pointing(0.002, 0.0)), CursorStep::Deadzone);
        assert_eq!(ctl.smoothed(), (0.0, 0.0));
    }
}
