//! Hand and face landmark records
//!
//! The landmark detector runs out of process and hands us loosely shaped
//! point lists. Everything is validated once here, at the boundary, into
//! fixed-shape records with named index constants; the rest of the crate
//! never indexes into unchecked data.
//!
//! ## Handedness
//!
//! The camera image is mirrored before detection, so the detector's
//! `Left`/`Right` label is the opposite of the user's physical hand.
//! [`HandObservation::physical_hand`] applies that correction.

use serde::{Deserialize, Serialize};

/// Number of landmarks in a hand observation
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Minimum number of face landmarks needed for nose and eye indices
pub const MIN_FACE_LANDMARK_COUNT: usize = 388;

/// Hand landmark indices (MediaPipe hand model numbering)
pub mod hand {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

/// Face landmark indices (MediaPipe face mesh numbering)
pub mod face {
    pub const NOSE_TIP: usize = 1;

    /// Left eye: outer corner, upper 1, upper 2, inner corner, lower 2, lower 1
    pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];

    /// Right eye, same ordering as [`LEFT_EYE`]
    pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];

    /// Right iris ring (only present with refined-landmark models)
    pub const RIGHT_IRIS: [usize; 4] = [469, 470, 471, 472];
}

/// A single normalized 2D landmark
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<[f32; 2]> for Point {
    fn from(p: [f32; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

/// Errors raised while validating raw detector output
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LandmarkError {
    #[error("Hand has {0} landmarks, expected 21")]
    WrongHandCount(usize),

    #[error("Face has {0} landmarks, expected at least 388")]
    TooFewFaceLandmarks(usize),

    #[error("Landmark {index} is not a finite coordinate")]
    NonFinite { index: usize },

    #[error("Unknown handedness label: {0}")]
    UnknownLabel(String),
}

/// Which side a hand is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    Left,
    #[default]
    Right,
}

impl Handedness {
    /// Parse the detector's label ("Left"/"Right", case-insensitive)
    pub fn parse(label: &str) -> Result<Self, LandmarkError> {
        match label.trim().to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(LandmarkError::UnknownLabel(label.to_string())),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// The 21 landmarks of one hand
pub type HandLandmarks = [Point; HAND_LANDMARK_COUNT];

/// One detected hand
#[derive(Debug, Clone, PartialEq)]
pub struct HandObservation {
    pub landmarks: HandLandmarks,
    /// Handedness as reported by the detector (mirrored)
    pub label: Handedness,
    pub score: f32,
}

impl HandObservation {
    pub fn new(landmarks: HandLandmarks, label: Handedness, score: f32) -> Self {
        Self {
            landmarks,
            label,
            score,
        }
    }

    /// The user's physical hand, correcting for the mirrored camera image
    pub fn physical_hand(&self) -> Handedness {
        self.label.opposite()
    }

    pub fn point(&self, index: usize) -> Point {
        self.landmarks[index]
    }
}

/// One detected face
#[derive(Debug, Clone, PartialEq)]
pub struct FaceObservation {
    points: Vec<Point>,
}

impl FaceObservation {
    /// Validate a raw face landmark list
    pub fn new(points: Vec<Point>) -> Result<Self, LandmarkError> {
        if points.len() < MIN_FACE_LANDMARK_COUNT {
            return Err(LandmarkError::TooFewFaceLandmarks(points.len()));
        }
        check_finite(&points)?;
        Ok(Self { points })
    }

    pub fn nose_tip(&self) -> Point {
        self.points[face::NOSE_TIP]
    }

    pub fn eye(&self, indices: &[usize; 6]) -> [Point; 6] {
        (*indices).map(|i| self.points[i])
    }

    /// Average of the right iris ring, if the model produced iris points
    pub fn iris_center(&self) -> Option<Point> {
        let ring = face::RIGHT_IRIS;
        if self.points.len() <= ring[ring.len() - 1] {
            return None;
        }
        let (sx, sy) = ring.iter().fold((0.0, 0.0), |(sx, sy), &i| {
            (sx + self.points[i].x, sy + self.points[i].y)
        });
        let n = ring.len() as f32;
        Some(Point::new(sx / n, sy / n))
    }
}

/// Everything the detector produced for one video frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub hands: Vec<HandObservation>,
    pub face: Option<FaceObservation>,
}

impl Frame {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The highest-confidence hand belonging to the given physical side
    pub fn hand(&self, physical: Handedness) -> Option<&HandObservation> {
        self.hands
            .iter()
            .filter(|h| h.physical_hand() == physical)
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// Raw hand as serialised by the detector process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHand {
    pub label: String,
    #[serde(default = "default_score")]
    pub score: f32,
    pub landmarks: Vec<[f32; 2]>,
}

fn default_score() -> f32 {
    1.0
}

/// Raw frame as serialised by the detector process (one JSON object per line)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFrame {
    #[serde(default)]
    pub hands: Vec<RawHand>,
    #[serde(default)]
    pub face: Option<Vec<[f32; 2]>>,
}

impl RawHand {
    pub fn validate(&self) -> Result<HandObservation, LandmarkError> {
        if self.landmarks.len() != HAND_LANDMARK_COUNT {
            return Err(LandmarkError::WrongHandCount(self.landmarks.len()));
        }
        let label = Handedness::parse(&self.label)?;
        let mut landmarks = [Point::default(); HAND_LANDMARK_COUNT];
        for (slot, raw) in landmarks.iter_mut().zip(&self.landmarks) {
            *slot = Point::from(*raw);
        }
        check_finite(&landmarks)?;
        Ok(HandObservation::new(landmarks, label, self.score))
    }
}

impl RawFrame {
    /// Validate into a [`Frame`]
    ///
    /// Malformed hands or faces are dropped individually; a broken hand
    /// simply behaves like an absent one.
    pub fn into_frame(self) -> Frame {
        let hands = self
            .hands
            .iter()
            .filter_map(|raw| match raw.validate() {
                Ok(hand) => Some(hand),
                Err(e) => {
                    tracing::debug!("Dropping malformed hand: {}", e);
                    None
                }
            })
            .collect();

        let face = self.face.and_then(|raw| {
            let points = raw.into_iter().map(Point::from).collect();
            FaceObservation::new(points)
                .map_err(|e| tracing::debug!("Dropping malformed face: {}", e))
                .ok()
        });

        Frame { hands, face }
    }
}

fn check_finite(points: &[Point]) -> Result<(), LandmarkError> {
    match points
        .iter()
        .position(|p| !p.x.is_finite() || !p.y.is_finite())
    {
        Some(index) => Err(LandmarkError::NonFinite { index }),
        None => Ok(()),
    }
}
