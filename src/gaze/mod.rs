//! Gaze-driven pointer control
//!
//! - [`calibration`]: polynomial regression from face input to screen pixels
//! - [`routine`]: nine-point sample collection
//! - [`tracker`]: per-frame gaze cursor while gaze mode is active

pub mod calibration;
pub mod routine;
pub mod tracker;

pub use calibration::{CalibrationError, CalibrationModel, CalibrationSample, GazeCalibration};
pub use routine::{CalibrationRoutine, RoutineError, CALIBRATION_TARGETS, SAMPLES_PER_POINT};
pub use tracker::{input_point, GazeInput, GazeSettings, GazeStep, GazeTracker};
