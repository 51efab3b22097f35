//! Shared fixtures for integration tests: synthetic landmarks, a recording
//! input sink and scripted transcribers.

#![allow(dead_code)]

pub use handpilot_lib::gesture::poses::*;
use handpilot_lib::injection::{InputSink, MouseButton};
use handpilot_lib::landmarks::{
    face, FaceObservation, Frame, HandLandmarks, HandObservation, Handedness, Point,
};
use handpilot_lib::source::{LandmarkSource, SourceEvent};
use handpilot_lib::transcription::{Transcriber, TranscriptionError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Frame spacing used to step simulated time
pub const FRAME: Duration = Duration::from_millis(33);

/// Observation of the user's right hand (the detector labels it "Left")
pub fn right_hand(lm: HandLandmarks) -> HandObservation {
    HandObservation::new(lm, Handedness::Left, 0.95)
}

/// Observation of the user's left hand (the detector labels it "Right")
pub fn left_hand(lm: HandLandmarks) -> HandObservation {
    HandObservation::new(lm, Handedness::Right, 0.95)
}

/// A full face mesh with open eyes and the nose tip at (x, y)
pub fn face_at(x: f32, y: f32) -> FaceObservation {
    face_with_eyes(x, y, 0.02)
}

/// Eyes nearly shut
pub fn closed_face_at(x: f32, y: f32) -> FaceObservation {
    face_with_eyes(x, y, 0.001)
}

fn face_with_eyes(x: f32, y: f32, half_open: f32) -> FaceObservation {
    let mut points = vec![Point::new(0.5, 0.5); 478];
    for eye in [face::LEFT_EYE, face::RIGHT_EYE] {
        points[eye[0]] = Point::new(0.40, 0.40);
        points[eye[1]] = Point::new(0.42, 0.40 - half_open);
        points[eye[2]] = Point::new(0.44, 0.40 - half_open);
        points[eye[3]] = Point::new(0.46, 0.40);
        points[eye[4]] = Point::new(0.44, 0.40 + half_open);
        points[eye[5]] = Point::new(0.42, 0.40 + half_open);
    }
    points[face::NOSE_TIP] = Point::new(x, y);
    FaceObservation::new(points).expect("valid face")
}

/// Frame with at most the right (gesture) hand
pub fn frame(hand: Option<HandLandmarks>, face: Option<FaceObservation>) -> Frame {
    Frame {
        hands: hand.map(right_hand).into_iter().collect(),
        face,
    }
}

/// Frame with any set of hands
pub fn hands_frame(hands: Vec<HandObservation>, face: Option<FaceObservation>) -> Frame {
    Frame { hands, face }
}

/// Everything a sink was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Move(i32, i32),
    Click(MouseButton),
    Type(String),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn typed(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Type(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> Vec<MouseButton> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Click(b) => Some(b),
                _ => None,
            })
            .collect()
    }
}

impl InputSink for RecordingSink {
    fn move_relative(&self, dx: i32, dy: i32) {
        self.events.lock().push(SinkEvent::Move(dx, dy));
    }

    fn click(&self, button: MouseButton, _at: Option<(i32, i32)>) {
        self.events.lock().push(SinkEvent::Click(button));
    }

    fn type_text(&self, text: &str) {
        self.events.lock().push(SinkEvent::Type(text.to_string()));
    }
}

/// Returns the same transcript for every capture
pub struct FixedTranscriber(pub &'static str);

impl Transcriber for FixedTranscriber {
    fn transcribe(&self, _capture_seconds: f32) -> Result<String, TranscriptionError> {
        Ok(self.0.to_string())
    }
}

/// Blocks each capture until the test releases it, counting calls
pub struct GatedTranscriber {
    pub gate: crossbeam_channel::Receiver<String>,
    pub calls: Mutex<u32>,
}

impl GatedTranscriber {
    pub fn new() -> (Self, crossbeam_channel::Sender<String>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (
            Self {
                gate: rx,
                calls: Mutex::new(0),
            },
            tx,
        )
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock()
    }
}

impl Transcriber for GatedTranscriber {
    fn transcribe(&self, _capture_seconds: f32) -> Result<String, TranscriptionError> {
        *self.calls.lock() += 1;
        self.gate
            .recv()
            .map_err(|_| TranscriptionError::Capture("gate closed".to_string()))
    }
}

/// Replays a fixed list of frames, then closes
pub struct ScriptedSource {
    frames: VecDeque<Frame>,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl LandmarkSource for ScriptedSource {
    fn next_frame(&mut self, _timeout: Duration) -> SourceEvent {
        match self.frames.pop_front() {
            Some(frame) => SourceEvent::Frame(frame),
            None => SourceEvent::Closed,
        }
    }
}
