//! Frame loop
//!
//! Runs once per video frame and turns landmarks into desktop input:
//!
//! 1. Deliver any finished voice result
//! 2. Attribute hands by physical side
//! 3. Classify the gesture hand
//! 4. Gaze cursor step and blink handling (gaze mode only)
//! 5. Pinch clicks on the gesture hand
//! 6. Hold timers and mode transitions
//! 7. Hand cursor motion from the pointer hand (outside gaze mode)

use crate::blink::{BlinkCount, BlinkSettings};
use crate::click::{ClickDebouncer, ClickEvent, ClickSettings};
use crate::cursor::{CursorMotionController, CursorSettings, CursorStep};
use crate::gaze::{GazeSettings, GazeTracker};
use crate::gesture::{classify_hand, GestureTag};
use crate::injection::{InputSink, MouseButton};
use crate::landmarks::{Frame, Handedness};
use crate::mode::{ModeSettings, ModeState, ModeStateMachine, TransitionResult};
use crate::source::{LandmarkSource, SourceEvent};
use crate::voice::{DispatchResult, VoiceCoordinator, VoiceDispatcher};
use std::time::{Duration, Instant};

/// Tuning for every per-frame component
#[derive(Debug, Clone, Default)]
pub struct ControllerSettings {
    /// Physical hand whose gestures drive modes and clicks
    pub gesture_hand: Handedness,
    pub mode: ModeSettings,
    pub cursor: CursorSettings,
    pub click: ClickSettings,
    pub blink: BlinkSettings,
    pub gaze: GazeSettings,
}

/// What happened during one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Mode after the frame
    pub mode: ModeState,
    pub gesture: GestureTag,
    pub blink: BlinkCount,
    pub clicks: Vec<ClickEvent>,
    pub transitions: Vec<TransitionResult>,
    pub cursor: Option<CursorStep>,
    pub gaze_move: Option<(i32, i32)>,
    pub voice: Option<DispatchResult>,
}

/// Per-frame control state
pub struct ControllerState {
    gesture_hand: Handedness,
    mode: ModeStateMachine,
    cursor: CursorMotionController,
    click: ClickDebouncer,
    tracker: GazeTracker,
}

impl ControllerState {
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            gesture_hand: settings.gesture_hand,
            mode: ModeStateMachine::new(settings.mode),
            cursor: CursorMotionController::new(settings.cursor),
            click: ClickDebouncer::new(settings.click),
            tracker: GazeTracker::new(settings.gaze, settings.blink),
        }
    }
}

/// Control state plus the capabilities it drives
pub struct Controller {
    state: ControllerState,
    sink: Box<dyn InputSink>,
    voice: VoiceCoordinator,
    dispatcher: VoiceDispatcher,
}

impl Controller {
    pub fn new(
        settings: ControllerSettings,
        sink: Box<dyn InputSink>,
        voice: VoiceCoordinator,
        dispatcher: VoiceDispatcher,
    ) -> Self {
        Self {
            state: ControllerState::new(settings),
            sink,
            voice,
            dispatcher,
        }
    }

    pub fn mode(&self) -> ModeState {
        self.state.mode.state()
    }

    pub fn tracker(&self) -> &GazeTracker {
        &self.state.tracker
    }

    pub fn voice(&self) -> &VoiceCoordinator {
        &self.voice
    }

    pub fn voice_mut(&mut self) -> &mut VoiceCoordinator {
        &mut self.voice
    }

    /// Process one frame
    pub fn process_frame(&mut self, frame: &Frame, now: Instant) -> FrameReport {
        let mut report = FrameReport::default();

        // 1. Voice result
        if let Some(outcome) = self.voice.poll() {
            if self.state.mode.state().is_voice() {
                report.voice = Some(self.dispatcher.dispatch(outcome, self.sink.as_ref()));
            } else {
                tracing::info!("Voice result discarded, voice mode was exited: {:?}", outcome);
            }
            if let Some(t) = self.state.mode.voice_capture_finished() {
                report.transitions.push(t);
            }
        }

        // 2. Hands
        let gesture_hand = frame.hand(self.state.gesture_hand);
        let pointer_hand = frame.hand(self.state.gesture_hand.opposite());

        // 3. Gesture
        let mut tag = classify_hand(gesture_hand);

        // 4. Gaze
        if self.state.mode.state().is_gaze() {
            if let Some(face) = &frame.face {
                if let Some(step) = self.state.tracker.update(face, now) {
                    if let Some((dx, dy)) = step.movement {
                        self.sink.move_relative(dx, dy);
                        report.gaze_move = Some((dx, dy));
                    }
                    report.blink = step.blink;
                    if let Some(t) = self.state.mode.on_blink(step.blink, now) {
                        self.apply_transition(&t);
                        report.transitions.push(t);
                    }
                }
            }
        }

        // 5. Clicks
        if let Some(click) = self.state.click.update_hand(gesture_hand, now) {
            match self.state.mode.on_pinch(now) {
                Some(t) => {
                    self.apply_transition(&t);
                    report.transitions.push(t);
                }
                None => {
                    self.perform_click(click);
                    report.clicks.push(click);
                }
            }
        }
        if self.state.click.is_pinching() {
            tag = GestureTag::PinchActive;
        }
        report.gesture = tag;

        // 6. Mode
        let update = self.state.mode.update(tag, now, self.voice.is_running());
        if let Some(t) = update.transition {
            self.apply_transition(&t);
            report.transitions.push(t);
        }
        if update.start_capture && self.voice.start() {
            if let Some(t) = self.state.mode.voice_capture_started() {
                report.transitions.push(t);
            }
        }

        // 7. Hand cursor
        if !self.state.mode.state().is_gaze() {
            if let Some(hand) = pointer_hand {
                let step = self.state.cursor.update(hand);
                if let CursorStep::Move { dx, dy } = step {
                    self.sink.move_relative(dx.round() as i32, dy.round() as i32);
                }
                report.cursor = Some(step);
            }
        }

        report.mode = self.state.mode.state();
        tracing::trace!("Frame: {:?}", report);
        report
    }

    fn apply_transition(&mut self, t: &TransitionResult) {
        if t.entered_gaze() {
            self.state.tracker.start();
            self.state.cursor.reset();
        }
        if t.exited_gaze() {
            self.state.tracker.stop();
        }
    }

    fn perform_click(&self, click: ClickEvent) {
        match click {
            ClickEvent::Single => self.sink.click(MouseButton::Left, None),
            ClickEvent::Right => self.sink.click(MouseButton::Right, None),
            ClickEvent::Double => self.sink.double_click(),
        }
    }

    /// Drive frames from `source` until it closes
    ///
    /// A frame timeout is processed as an empty frame so hold timers and
    /// voice results keep moving. Returns the number of frames processed.
    pub fn run_loop(&mut self, source: &mut dyn LandmarkSource, frame_timeout: Duration) -> u64 {
        let mut processed = 0u64;
        let empty = Frame::empty();

        loop {
            let report = match source.next_frame(frame_timeout) {
                SourceEvent::Frame(frame) => self.process_frame(&frame, Instant::now()),
                SourceEvent::Timeout => self.process_frame(&empty, Instant::now()),
                SourceEvent::Closed => break,
            };
            processed += 1;

            if !report.transitions.is_empty() {
                tracing::info!("Mode now: {}", report.mode.description());
            }
        }

        tracing::info!("Frame loop finished after {} frames", processed);
        processed
    }
}
