//! Nine-point calibration routine
//!
//! Walks the user through a fixed 3x3 grid of screen targets. For each
//! target the caller records input positions while the user looks at it and
//! then confirms; the confirmed sample is the mean of the most recent
//! readings.

use super::calibration::{CalibrationError, CalibrationSample, GazeCalibration};

/// Normalized target positions, row-major
pub const CALIBRATION_TARGETS: [(f64, f64); 9] = [
    (0.1, 0.1),
    (0.5, 0.1),
    (0.9, 0.1),
    (0.1, 0.5),
    (0.5, 0.5),
    (0.9, 0.5),
    (0.1, 0.9),
    (0.5, 0.9),
    (0.9, 0.9),
];

/// Readings averaged into one confirmed sample
pub const SAMPLES_PER_POINT: usize = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoutineError {
    #[error("Need {need} readings to confirm a point, have {have}")]
    NotEnoughReadings { have: usize, need: usize },

    #[error("All calibration points already confirmed")]
    Complete,
}

/// Progress through the calibration grid
#[derive(Debug, Clone)]
pub struct CalibrationRoutine {
    screen_width: f64,
    screen_height: f64,
    current: usize,
    readings: Vec<(f64, f64)>,
    confirmed: Vec<CalibrationSample>,
}

impl CalibrationRoutine {
    pub fn new(screen_width: f64, screen_height: f64) -> Self {
        Self {
            screen_width,
            screen_height,
            current: 0,
            readings: Vec::new(),
            confirmed: Vec::with_capacity(CALIBRATION_TARGETS.len()),
        }
    }

    /// Index of the target being collected
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Pixel position of the target being collected, `None` once complete
    pub fn current_target(&self) -> Option<(f64, f64)> {
        CALIBRATION_TARGETS
            .get(self.current)
            .map(|&(nx, ny)| (nx * self.screen_width, ny * self.screen_height))
    }

    /// Record one input reading for the current target
    pub fn record(&mut self, x: f64, y: f64) {
        if !self.is_complete() {
            self.readings.push((x, y));
        }
    }

    pub fn readings(&self) -> usize {
        self.readings.len()
    }

    /// Confirm the current target from the last [`SAMPLES_PER_POINT`] readings
    pub fn confirm(&mut self) -> Result<CalibrationSample, RoutineError> {
        let (sx, sy) = self.current_target().ok_or(RoutineError::Complete)?;

        let have = self.readings.len();
        if have < SAMPLES_PER_POINT {
            return Err(RoutineError::NotEnoughReadings {
                have,
                need: SAMPLES_PER_POINT,
            });
        }

        let recent = &self.readings[have - SAMPLES_PER_POINT..];
        let n = SAMPLES_PER_POINT as f64;
        let mean_x = recent.iter().map(|r| r.0).sum::<f64>() / n;
        let mean_y = recent.iter().map(|r| r.1).sum::<f64>() / n;

        let sample = CalibrationSample::new(mean_x, mean_y, sx, sy);
        tracing::info!(
            "Calibration point {}/{} confirmed: input ({:.4}, {:.4}) -> screen ({:.0}, {:.0})",
            self.current + 1,
            CALIBRATION_TARGETS.len(),
            mean_x,
            mean_y,
            sx,
            sy
        );

        self.confirmed.push(sample);
        self.readings.clear();
        self.current += 1;
        Ok(sample)
    }

    /// Discard readings for the current point; confirmed points are kept
    pub fn abort_point(&mut self) {
        if !self.readings.is_empty() {
            tracing::info!(
                "Calibration point {} aborted ({} readings discarded)",
                self.current + 1,
                self.readings.len()
            );
        }
        self.readings.clear();
    }

    pub fn is_complete(&self) -> bool {
        self.current >= CALIBRATION_TARGETS.len()
    }

    pub fn confirmed(&self) -> &[CalibrationSample] {
        &self.confirmed
    }

    /// Replace the calibration's samples with the confirmed ones and fit
    pub fn apply(&self, calibration: &mut GazeCalibration) -> Result<(), CalibrationError> {
        let mut fresh = calibration.clone();
        fresh.clear();
        for sample in &self.confirmed {
            fresh.add_sample(*sample);
        }
        fresh.fit()?;
        *calibration = fresh;
        Ok(())
    }
}
