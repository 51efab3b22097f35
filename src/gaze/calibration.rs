//! Gaze calibration model
//!
//! Maps a normalized face input position (nose tip or iris center) to
//! screen pixels with a quadratic polynomial per axis:
//!
//! ```text
//! screen = c0*x² + c1*y² + c2*xy + c3*x + c4*y + c5
//! ```
//!
//! Both coefficient vectors are fit by ordinary least squares over the
//! collected samples. Until a fit succeeds, prediction falls back to a rough
//! linear mapping of the input onto the screen.
//!
//! ## Storage format
//!
//! ```json
//! { "samples": [[x, y, sx, sy], ...], "coeffs_x": [6 floats] | null, "coeffs_y": [6 floats] | null }
//! ```

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Number of polynomial terms per axis
pub const TERM_COUNT: usize = 6;

/// Minimum samples for a fit
pub const MIN_FIT_SAMPLES: usize = TERM_COUNT;

/// Singular values at or below this are treated as zero
const RANK_EPSILON: f64 = 1e-10;

/// Errors from fitting, loading or saving a calibration
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("Need at least 6 samples to fit, have {0}")]
    InsufficientSamples(usize),

    #[error("Samples do not span the polynomial terms (rank {rank} < 6)")]
    RankDeficient { rank: usize },

    #[error("Least squares solve failed: {0}")]
    Solve(String),

    #[error("Corrupt calibration data: {0}")]
    Corrupt(String),

    #[error("Failed to encode calibration: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Calibration storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// One training pair for the regression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSample {
    pub input_x: f64,
    pub input_y: f64,
    pub screen_x: f64,
    pub screen_y: f64,
}

impl CalibrationSample {
    pub fn new(input_x: f64, input_y: f64, screen_x: f64, screen_y: f64) -> Self {
        Self {
            input_x,
            input_y,
            screen_x,
            screen_y,
        }
    }

    fn to_row(self) -> [f64; 4] {
        [self.input_x, self.input_y, self.screen_x, self.screen_y]
    }
}

/// Fitted polynomial coefficients for both axes
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationModel {
    pub coeffs_x: [f64; TERM_COUNT],
    pub coeffs_y: [f64; TERM_COUNT],
}

impl CalibrationModel {
    pub fn predict(&self, x: f64, y: f64) -> (f64, f64) {
        let f = features(x, y);
        (dot(&f, &self.coeffs_x), dot(&f, &self.coeffs_y))
    }
}

/// Polynomial feature row `[x², y², xy, x, y, 1]`
pub fn features(x: f64, y: f64) -> [f64; TERM_COUNT] {
    [x * x, y * y, x * y, x, y, 1.0]
}

fn dot(a: &[f64; TERM_COUNT], b: &[f64; TERM_COUNT]) -> f64 {
    a.iter().zip(b).map(|(a, b)| a * b).sum()
}

/// On-disk layout
#[derive(Debug, Serialize, Deserialize)]
struct StoredCalibration {
    #[serde(default)]
    samples: Vec<Vec<f64>>,
    #[serde(default)]
    coeffs_x: Option<Vec<f64>>,
    #[serde(default)]
    coeffs_y: Option<Vec<f64>>,
}

/// Samples plus the model fit from them
#[derive(Debug, Clone)]
pub struct GazeCalibration {
    samples: Vec<CalibrationSample>,
    model: Option<CalibrationModel>,
    screen_width: f64,
    screen_height: f64,
}

impl GazeCalibration {
    /// Empty, uncalibrated state for a screen of the given size
    pub fn new(screen_width: f64, screen_height: f64) -> Self {
        Self {
            samples: Vec::new(),
            model: None,
            screen_width,
            screen_height,
        }
    }

    pub fn samples(&self) -> &[CalibrationSample] {
        &self.samples
    }

    pub fn model(&self) -> Option<&CalibrationModel> {
        self.model.as_ref()
    }

    pub fn is_calibrated(&self) -> bool {
        self.model.is_some()
    }

    pub fn add_sample(&mut self, sample: CalibrationSample) {
        self.samples.push(sample);
    }

    /// Drop all samples and the model
    pub fn clear(&mut self) {
        self.samples.clear();
        self.model = None;
    }

    /// Fit both axes over all collected samples
    ///
    /// On failure the previous model (if any) is left untouched.
    pub fn fit(&mut self) -> Result<(), CalibrationError> {
        let n = self.samples.len();
        if n < MIN_FIT_SAMPLES {
            return Err(CalibrationError::InsufficientSamples(n));
        }

        let design = DMatrix::from_fn(n, TERM_COUNT, |r, c| {
            let s = &self.samples[r];
            features(s.input_x, s.input_y)[c]
        });

        let svd = design.svd(true, true);
        let rank = svd.rank(RANK_EPSILON);
        if rank < TERM_COUNT {
            return Err(CalibrationError::RankDeficient { rank });
        }

        let target_x = DVector::from_iterator(n, self.samples.iter().map(|s| s.screen_x));
        let target_y = DVector::from_iterator(n, self.samples.iter().map(|s| s.screen_y));

        let solve = |b: &DVector<f64>| -> Result<[f64; TERM_COUNT], CalibrationError> {
            let sol = svd
                .solve(b, RANK_EPSILON)
                .map_err(|e| CalibrationError::Solve(e.to_string()))?;
            let mut out = [0.0; TERM_COUNT];
            for (slot, v) in out.iter_mut().zip(sol.iter()) {
                *slot = *v;
            }
            Ok(out)
        };

        let model = CalibrationModel {
            coeffs_x: solve(&target_x)?,
            coeffs_y: solve(&target_y)?,
        };

        tracing::info!("Gaze calibration fit over {} samples", n);
        self.model = Some(model);
        Ok(())
    }

    /// Map an input position to raw (unclamped) screen coordinates
    pub fn predict(&self, x: f64, y: f64) -> (f64, f64) {
        match &self.model {
            Some(model) => model.predict(x, y),
            None => (x * self.screen_width, y * self.screen_height),
        }
    }

    /// Save samples and coefficients as JSON
    pub fn save(&self, path: &Path) -> Result<(), CalibrationError> {
        let stored = StoredCalibration {
            samples: self.samples.iter().map(|s| s.to_row().to_vec()).collect(),
            coeffs_x: self.model.as_ref().map(|m| m.coeffs_x.to_vec()),
            coeffs_y: self.model.as_ref().map(|m| m.coeffs_y.to_vec()),
        };

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let contents = serde_json::to_string_pretty(&stored)
            .map_err(CalibrationError::Encode)?;
        fs::write(path, contents)?;

        tracing::info!(
            "Gaze calibration saved to {} ({} samples, fitted: {})",
            path.display(),
            self.samples.len(),
            self.model.is_some()
        );
        Ok(())
    }

    /// Load a calibration, or an empty one if the file does not exist
    ///
    /// Missing coefficients are valid and leave the model unset. A sample
    /// that isn't a 4-tuple, or a coefficient vector that isn't 6 long, is
    /// reported as [`CalibrationError::Corrupt`].
    pub fn load(
        path: &Path,
        screen_width: f64,
        screen_height: f64,
    ) -> Result<Self, CalibrationError> {
        let mut calibration = Self::new(screen_width, screen_height);

        if !path.exists() {
            tracing::info!("No gaze calibration at {}, using defaults", path.display());
            return Ok(calibration);
        }

        let contents = fs::read_to_string(path)?;
        let stored: StoredCalibration = serde_json::from_str(&contents)
            .map_err(|e| CalibrationError::Corrupt(format!("invalid JSON: {}", e)))?;

        for (i, row) in stored.samples.iter().enumerate() {
            match row.as_slice() {
                &[x, y, sx, sy] => calibration.add_sample(CalibrationSample::new(x, y, sx, sy)),
                other => {
                    return Err(CalibrationError::Corrupt(format!(
                        "sample {} has {} values, expected 4",
                        i,
                        other.len()
                    )))
                }
            }
        }

        calibration.model = match (stored.coeffs_x, stored.coeffs_y) {
            (Some(cx), Some(cy)) => Some(CalibrationModel {
                coeffs_x: coefficients(&cx, "coeffs_x")?,
                coeffs_y: coefficients(&cy, "coeffs_y")?,
            }),
            _ => None,
        };

        tracing::info!(
            "Gaze calibration loaded from {} ({} samples, fitted: {})",
            path.display(),
            calibration.samples.len(),
            calibration.model.is_some()
        );
        Ok(calibration)
    }
}

fn coefficients(values: &[f64], name: &str) -> Result<[f64; TERM_COUNT], CalibrationError> {
    <[f64; TERM_COUNT]>::try_from(values).map_err(|_| {
        CalibrationError::Corrupt(format!(
            "{} has {} values, expected {}",
            name,
            values.len(),
            TERM_COUNT
        ))
    })
}
