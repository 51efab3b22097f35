//! Runtime gaze cursor
//!
//! While a session is active each face frame moves the pointer towards the
//! predicted gaze position. Both the raw input point and the cursor position
//! are exponentially smoothed, and tiny moves below the pixel deadzone are
//! held back until they accumulate.

use super::calibration::GazeCalibration;
use crate::blink::{BlinkCount, BlinkDetector, BlinkSettings};
use crate::landmarks::FaceObservation;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

/// Which face feature drives the gaze cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GazeInput {
    #[default]
    Nose,
    /// Right iris center; falls back to the nose when iris points are missing
    Iris,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GazeSettings {
    pub screen_width: f64,
    pub screen_height: f64,
    pub smooth_factor: f64,
    pub deadzone_px: f64,
    pub calibrated_sensitivity: f64,
    pub uncalibrated_sensitivity: f64,
    pub invert_x: bool,
    pub input: GazeInput,
    pub calibration_path: PathBuf,
}

impl Default for GazeSettings {
    fn default() -> Self {
        Self {
            screen_width: 2240.0,
            screen_height: 1400.0,
            smooth_factor: 0.4,
            deadzone_px: 1.0,
            calibrated_sensitivity: 1.0,
            uncalibrated_sensitivity: 10.0,
            invert_x: false,
            input: GazeInput::Nose,
            calibration_path: PathBuf::from("gaze_calibration.json"),
        }
    }
}

/// Normalized face point feeding the gaze model
pub fn input_point(face_obs: &FaceObservation, input: GazeInput, invert_x: bool) -> (f64, f64) {
    let point = match input {
        GazeInput::Iris => face_obs.iris_center().unwrap_or_else(|| face_obs.nose_tip()),
        GazeInput::Nose => face_obs.nose_tip(),
    };
    let x = point.x as f64;
    (if invert_x { 1.0 - x } else { x }, point.y as f64)
}

/// Result of one tracker step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeStep {
    pub blink: BlinkCount,
    /// Relative pointer move, if it cleared the deadzone
    pub movement: Option<(i32, i32)>,
    /// Clamped screen target this frame
    pub target: (f64, f64),
}

#[derive(Debug)]
struct GazeSession {
    calibration: GazeCalibration,
    smoothed_input: Option<(f64, f64)>,
    cursor: (f64, f64),
    blink: BlinkDetector,
}

pub struct GazeTracker {
    settings: GazeSettings,
    blink_settings: BlinkSettings,
    session: Option<GazeSession>,
}

impl GazeTracker {
    pub fn new(settings: GazeSettings, blink_settings: BlinkSettings) -> Self {
        Self {
            settings,
            blink_settings,
            session: None,
        }
    }

    pub fn settings(&self) -> &GazeSettings {
        &self.settings
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_calibrated(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.calibration.is_calibrated())
    }

    /// Start a session, loading the calibration from disk
    ///
    /// A corrupt calibration is logged and the session runs uncalibrated.
    /// Returns false if a session was already running.
    pub fn start(&mut self) -> bool {
        if self.is_active() {
            return false;
        }

        let s = &self.settings;
        let calibration =
            match GazeCalibration::load(&s.calibration_path, s.screen_width, s.screen_height) {
                Ok(cal) => cal,
                Err(e) => {
                    tracing::error!(
                        "Failed to load gaze calibration from {}: {}",
                        s.calibration_path.display(),
                        e
                    );
                    GazeCalibration::new(s.screen_width, s.screen_height)
                }
            };

        self.start_with(calibration)
    }

    /// Start a session with an already loaded calibration
    pub fn start_with(&mut self, calibration: GazeCalibration) -> bool {
        if self.is_active() {
            return false;
        }

        tracing::info!(
            "Gaze tracking started (calibrated: {})",
            calibration.is_calibrated()
        );
        self.session = Some(GazeSession {
            calibration,
            smoothed_input: None,
            cursor: self.center(),
            blink: BlinkDetector::new(self.blink_settings),
        });
        true
    }

    /// Stop the session; returns false if none was running
    pub fn stop(&mut self) -> bool {
        if self.session.take().is_some() {
            tracing::info!("Gaze tracking stopped");
            true
        } else {
            false
        }
    }

    /// Process one face frame, `None` when no session is active
    pub fn update(&mut self, face_obs: &FaceObservation, now: Instant) -> Option<GazeStep> {
        let center = self.center();
        let s = &self.settings;
        let session = self.session.as_mut()?;

        let blink = session.blink.update(face_obs, now);

        let raw = input_point(face_obs, s.input, s.invert_x);

        let f = s.smooth_factor;
        let input = match session.smoothed_input {
            Some(prev) => (prev.0 + f * (raw.0 - prev.0), prev.1 + f * (raw.1 - prev.1)),
            None => raw,
        };
        session.smoothed_input = Some(input);

        let (px, py) = session.calibration.predict(input.0, input.1);
        let sensitivity = if session.calibration.is_calibrated() {
            s.calibrated_sensitivity
        } else {
            s.uncalibrated_sensitivity
        };
        let target = (
            (center.0 + (px - center.0) * sensitivity).clamp(0.0, s.screen_width),
            (center.1 + (py - center.1) * sensitivity).clamp(0.0, s.screen_height),
        );

        let cur = session.cursor;
        let next = (cur.0 + f * (target.0 - cur.0), cur.1 + f * (target.1 - cur.1));
        let (dx, dy) = (next.0 - cur.0, next.1 - cur.1);

        let movement = if dx.abs() > s.deadzone_px || dy.abs() > s.deadzone_px {
            session.cursor = next;
            Some((dx.round() as i32, dy.round() as i32))
        } else {
            None
        };

        Some(GazeStep {
            blink,
            movement,
            target,
        })
    }

    fn center(&self) -> (f64, f64) {
        (self.settings.screen_width / 2.0, self.settings.screen_height / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::calibration::CalibrationSample;
    use crate::landmarks::{face, Point};
    use std::time::Duration;

    fn face_at(x: f32, y: f32) -> FaceObservation {
        let mut points = vec![Point::new(0.5, 0.5); 478];
        // Open eyes so the blink detector stays quiet
        for eye in [face::LEFT_EYE, face::RIGHT_EYE] {
            points[eye[0]] = Point::new(0.40, 0.40);
            points[eye[1]] = Point::new(0.42, 0.38);
            points[eye[2]] = Point::new(0.44, 0.38);
            points[eye[3]] = Point::new(0.46, 0.40);
            points[eye[4]] = Point::new(0.44, 0.42);
            points[eye[5]] = Point::new(0.42, 0.42);
        }
        points[face::NOSE_TIP] = Point::new(x, y);
        FaceObservation::new(points).unwrap()
    }

    fn settings() -> GazeSettings {
        GazeSettings {
            screen_width: 1000.0,
            screen_height: 500.0,
            calibration_path: PathBuf::from("/nonexistent/handpilot/gaze.json"),
            ..GazeSettings::default()
        }
    }

    fn identity_calibration() -> GazeCalibration {
        let mut cal = GazeCalibration::new(1000.0, 500.0);
        for &y in &[0.1, 0.5, 0.9] {
            for &x in &[0.1, 0.5, 0.9] {
                cal.add_sample(CalibrationSample::new(x, y, x * 1000.0, y * 500.0));
            }
        }
        cal.fit().unwrap();
        cal
    }

    #[test]
    fn test_update_without_session_is_none() {
        let mut tracker = GazeTracker::new(settings(), BlinkSettings::default());
        assert!(tracker.update(&face_at(0.5, 0.5), Instant::now()).is_none());
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let mut tracker = GazeTracker::new(settings(), BlinkSettings::default());
        assert!(tracker.start());
        assert!(!tracker.start());
        assert!(tracker.is_active());
        assert!(!tracker.is_calibrated());
        assert!(tracker.stop());
        assert!(!tracker.stop());
    }

    #[test]
    fn test_calibrated_step_moves_towards_target() {
        let mut tracker = GazeTracker::new(settings(), BlinkSettings::default());
        tracker.start_with(identity_calibration());

        let step = tracker.update(&face_at(0.9, 0.5), Instant::now()).unwrap();
        assert!((step.target.0 - 900.0).abs() < 1e-6);
        assert!((step.target.1 - 250.0).abs() < 1e-6);
        // Cursor starts at the center: 500 + 0.4 * (900 - 500) = 660
        assert_eq!(step.movement, Some((160, 0)));
        assert_eq!(step.blink, BlinkCount::None);
    }

    #[test]
    fn test_uncalibrated_target_is_clamped() {
        let mut tracker = GazeTracker::new(settings(), BlinkSettings::default());
        tracker.start();

        // Sensitivity 10 about the center pushes 0.6 far off screen
        let step = tracker.update(&face_at(0.6, 0.5), Instant::now()).unwrap();
        assert_eq!(step.target, (1000.0, 250.0));
    }

    #[test]
    fn test_small_moves_stay_in_deadzone() {
        let mut tracker = GazeTracker::new(settings(), BlinkSettings::default());
        tracker.start_with(identity_calibration());

        let t0 = Instant::now();
        let step = tracker.update(&face_at(0.5, 0.5), t0).unwrap();
        assert_eq!(step.movement, None);

        let step = tracker
            .update(&face_at(0.501, 0.5), t0 + Duration::from_millis(30))
            .unwrap();
        assert_eq!(step.movement, None);
    }

    #[test]
    fn test_invert_x_mirrors_input() {
        let mut tracker = GazeTracker::new(
            GazeSettings {
                invert_x: true,
                ..settings()
            },
            BlinkSettings::default(),
        );
        tracker.start_with(identity_calibration());

        let step = tracker.update(&face_at(0.9, 0.5), Instant::now()).unwrap();
        assert!((step.target.0 - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_corrupt_calibration_falls_back_to_uncalibrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gaze.json");
        std::fs::write(&path, r#"{"samples": [[0.1, 0.2, 3.0]]}"#).unwrap();

        let mut tracker = GazeTracker::new(
            GazeSettings {
                calibration_path: path,
                ..settings()
            },
            BlinkSettings::default(),
        );
        assert!(tracker.start());
        assert!(!tracker.is_calibrated());
    }
}
