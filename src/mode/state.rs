//! Mode state machine
//!
//! Voice and gaze are mutually exclusive by construction: the machine holds
//! exactly one [`ModeState`], and every transition replaces it.

use super::hold::HoldTimer;
use crate::blink::BlinkCount;
use crate::gesture::GestureTag;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Controller mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModeState {
    /// Hand cursor control, no voice or gaze
    #[default]
    Idle,
    /// Voice mode on, no capture in flight
    VoicePending,
    /// Voice mode on, capture in flight
    VoiceRecording,
    /// Gaze drives the pointer
    GazeActive,
}

impl ModeState {
    pub fn description(&self) -> &'static str {
        match self {
            ModeState::Idle => "Hand cursor control",
            ModeState::VoicePending => "Voice mode, waiting to capture",
            ModeState::VoiceRecording => "Voice mode, capturing speech",
            ModeState::GazeActive => "Gaze cursor control",
        }
    }

    pub fn is_voice(&self) -> bool {
        matches!(self, ModeState::VoicePending | ModeState::VoiceRecording)
    }

    pub fn is_gaze(&self) -> bool {
        matches!(self, ModeState::GazeActive)
    }
}

/// Why a transition happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    /// `One` held while voice was off
    VoiceToggledOn,
    /// `One` held while voice was on
    VoiceToggledOff,
    /// `Two` held
    GazeActivated,
    /// Double blink while in gaze
    DoubleBlink,
    /// Single blink followed by a pinch while in gaze
    BlinkPinch,
    CaptureStarted,
    CaptureFinished,
}

/// Result of a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub previous: ModeState,
    pub new_state: ModeState,
    pub reason: TransitionReason,
}

impl TransitionResult {
    pub fn entered_gaze(&self) -> bool {
        !self.previous.is_gaze() && self.new_state.is_gaze()
    }

    pub fn exited_gaze(&self) -> bool {
        self.previous.is_gaze() && !self.new_state.is_gaze()
    }

    pub fn entered_voice(&self) -> bool {
        !self.previous.is_voice() && self.new_state.is_voice()
    }

    pub fn exited_voice(&self) -> bool {
        self.previous.is_voice() && !self.new_state.is_voice()
    }
}

/// Outcome of one hold-timer update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeUpdate {
    pub transition: Option<TransitionResult>,
    /// A voice capture should be started now
    pub start_capture: bool,
}

/// Hold durations and gaze exit window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeSettings {
    /// `One` hold toggling voice mode
    pub voice_toggle_hold: Duration,
    /// `Two` hold activating gaze mode
    pub gaze_activate_hold: Duration,
    /// `ThumbsUp` hold starting another capture in voice mode
    pub voice_capture_hold: Duration,
    /// Max delay between a single blink and the pinch that exits gaze
    pub blink_pinch_window: Duration,
}

impl Default for ModeSettings {
    fn default() -> Self {
        Self {
            voice_toggle_hold: Duration::from_secs_f64(2.0),
            gaze_activate_hold: Duration::from_secs_f64(0.8),
            voice_capture_hold: Duration::from_secs_f64(1.0),
            blink_pinch_window: Duration::from_secs_f64(1.5),
        }
    }
}

/// Idle / voice / gaze state machine driven by held gestures and blinks
pub struct ModeStateMachine {
    state: ModeState,
    settings: ModeSettings,
    voice_toggle: HoldTimer,
    gaze_activate: HoldTimer,
    voice_capture: HoldTimer,
    /// Time of the last single blink while in gaze
    last_blink: Option<Instant>,
}

impl ModeStateMachine {
    pub fn new(settings: ModeSettings) -> Self {
        Self {
            state: ModeState::Idle,
            settings,
            voice_toggle: HoldTimer::new(GestureTag::One, settings.voice_toggle_hold),
            gaze_activate: HoldTimer::new(GestureTag::Two, settings.gaze_activate_hold),
            voice_capture: HoldTimer::new(GestureTag::ThumbsUp, settings.voice_capture_hold),
            last_blink: None,
        }
    }

    pub fn state(&self) -> ModeState {
        self.state
    }

    /// Feed one frame's gesture tag to the hold timers
    ///
    /// `voice_busy` tells whether a capture task is still running; voice mode
    /// cannot be switched on until it has finished.
    pub fn update(&mut self, tag: GestureTag, now: Instant, voice_busy: bool) -> ModeUpdate {
        let toggle = self.voice_toggle.update(tag, now);
        let gaze = self.gaze_activate.update(tag, now);
        let capture = self.voice_capture.update(tag, now);

        let mut update = ModeUpdate::default();

        if toggle {
            if self.state.is_voice() {
                update.transition =
                    Some(self.transition(ModeState::Idle, TransitionReason::VoiceToggledOff));
            } else if voice_busy {
                tracing::info!("Voice toggle ignored: previous capture still running");
            } else {
                update.transition = Some(
                    self.transition(ModeState::VoicePending, TransitionReason::VoiceToggledOn),
                );
                update.start_capture = true;
            }
        } else if gaze {
            if !self.state.is_gaze() {
                update.transition =
                    Some(self.transition(ModeState::GazeActive, TransitionReason::GazeActivated));
            }
        } else if capture && self.state == ModeState::VoicePending && !voice_busy {
            tracing::debug!("Thumbs-up hold, requesting another voice capture");
            update.start_capture = true;
        }

        update
    }

    /// Feed a blink count; a double blink exits gaze
    pub fn on_blink(&mut self, count: BlinkCount, now: Instant) -> Option<TransitionResult> {
        if !self.state.is_gaze() {
            return None;
        }
        match count {
            BlinkCount::Double => {
                Some(self.transition(ModeState::Idle, TransitionReason::DoubleBlink))
            }
            BlinkCount::Single => {
                self.last_blink = Some(now);
                None
            }
            BlinkCount::None => None,
        }
    }

    /// Feed a pinch edge; exits gaze if a single blink just preceded it
    ///
    /// When this returns a transition the pinch must not produce a click.
    pub fn on_pinch(&mut self, now: Instant) -> Option<TransitionResult> {
        if !self.state.is_gaze() {
            return None;
        }
        let recent = self
            .last_blink
            .is_some_and(|t| now.saturating_duration_since(t) <= self.settings.blink_pinch_window);
        if recent {
            Some(self.transition(ModeState::Idle, TransitionReason::BlinkPinch))
        } else {
            None
        }
    }

    /// A voice capture was started
    pub fn voice_capture_started(&mut self) -> Option<TransitionResult> {
        (self.state == ModeState::VoicePending).then(|| {
            self.transition(ModeState::VoiceRecording, TransitionReason::CaptureStarted)
        })
    }

    /// The in-flight voice capture delivered its result
    pub fn voice_capture_finished(&mut self) -> Option<TransitionResult> {
        (self.state == ModeState::VoiceRecording).then(|| {
            self.transition(ModeState::VoicePending, TransitionReason::CaptureFinished)
        })
    }

    /// Reset to Idle and clear all timers
    pub fn reset(&mut self) {
        self.state = ModeState::Idle;
        self.voice_toggle.reset();
        self.gaze_activate.reset();
        self.voice_capture.reset();
        self.last_blink = None;
        tracing::info!("Mode state machine reset to Idle");
    }

    fn transition(&mut self, new_state: ModeState, reason: TransitionReason) -> TransitionResult {
        let previous = self.state;
        self.state = new_state;
        if !new_state.is_gaze() {
            self.last_blink = None;
        }

        tracing::info!(
            "Mode transition: {:?} -> {:?} (reason: {:?})",
            previous,
            new_state,
            reason
        );

        TransitionResult {
            previous,
            new_state,
            reason,
        }
    }
}

impl Default for ModeStateMachine {
    fn default() -> Self {
        Self::new(ModeSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Hold `tag` from `start` for `duration` at 30fps, collecting outcomes
    fn hold(
        sm: &mut ModeStateMachine,
        tag: GestureTag,
        start: Instant,
        duration: Duration,
        voice_busy: bool,
    ) -> Vec<ModeUpdate> {
        let frame = ms(33);
        let mut t = start;
        let mut out = Vec::new();
        while t <= start + duration {
            let update = sm.update(tag, t, voice_busy);
            if update != ModeUpdate::default() {
                out.push(update);
            }
            t += frame;
        }
        out
    }

    fn enter_gaze(sm: &mut ModeStateMachine, t0: Instant) {
        hold(sm, GestureTag::Two, t0, ms(900), false);
        assert_eq!(sm.state(), ModeState::GazeActive);
    }

    #[test]
    fn test_initial_state_is_idle() {
        let sm = ModeStateMachine::default();
        assert_eq!(sm.state(), ModeState::Idle);
    }

    #[test]
    fn test_one_hold_enters_voice_and_requests_capture() {
        let mut sm = ModeStateMachine::default();
        let updates = hold(&mut sm, GestureTag::One, Instant::now(), ms(2100), false);

        assert_eq!(updates.len(), 1);
        let result = updates[0].transition.clone().unwrap();
        assert_eq!(result.previous, ModeState::Idle);
        assert_eq!(result.new_state, ModeState::VoicePending);
        assert_eq!(result.reason, TransitionReason::VoiceToggledOn);
        assert!(updates[0].start_capture);
    }

    #[test]
    fn test_hold_for_twice_duration_fires_once() {
        let mut sm = ModeStateMachine::default();
        let updates = hold(&mut sm, GestureTag::One, Instant::now(), ms(4000), false);
        assert_eq!(updates.len(), 1);
        assert_eq!(sm.state(), ModeState::VoicePending);
    }

    #[test]
    fn test_one_hold_toggles_voice_off() {
        let mut sm = ModeStateMachine::default();
        let t0 = Instant::now();
        hold(&mut sm, GestureTag::One, t0, ms(2100), false);
        sm.update(GestureTag::None, t0 + ms(2200), false);

        let updates = hold(&mut sm, GestureTag::One, t0 + ms(2300), ms(2100), false);
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0].transition.as_ref().unwrap().reason,
            TransitionReason::VoiceToggledOff
        );
        assert!(!updates[0].start_capture);
        assert_eq!(sm.state(), ModeState::Idle);
    }

    #[test]
    fn test_toggle_on_ignored_while_busy() {
        let mut sm = ModeStateMachine::default();
        let updates = hold(&mut sm, GestureTag::One, Instant::now(), ms(2100), true);
        assert!(updates.is_empty());
        assert_eq!(sm.state(), ModeState::Idle);
    }

    #[test]
    fn test_gaze_exits_voice_in_one_transition() {
        let mut sm = ModeStateMachine::default();
        let t0 = Instant::now();
        hold(&mut sm, GestureTag::One, t0, ms(2100), false);
        sm.voice_capture_started();
        assert_eq!(sm.state(), ModeState::VoiceRecording);

        let updates = hold(&mut sm, GestureTag::Two, t0 + ms(2200), ms(900), true);
        let result = updates[0].transition.clone().unwrap();
        assert_eq!(result.previous, ModeState::VoiceRecording);
        assert_eq!(result.new_state, ModeState::GazeActive);
        assert!(result.exited_voice());
        assert!(result.entered_gaze());
    }

    #[test]
    fn test_voice_exits_gaze_in_one_transition() {
        let mut sm = ModeStateMachine::default();
        let t0 = Instant::now();
        enter_gaze(&mut sm, t0);

        let updates = hold(&mut sm, GestureTag::One, t0 + ms(1000), ms(2100), false);
        let result = updates[0].transition.clone().unwrap();
        assert!(result.exited_gaze());
        assert_eq!(result.new_state, ModeState::VoicePending);
    }

    #[test]
    fn test_gaze_hold_while_in_gaze_is_noop() {
        let mut sm = ModeStateMachine::default();
        let t0 = Instant::now();
        enter_gaze(&mut sm, t0);
        sm.update(GestureTag::None, t0 + ms(950), false);

        let updates = hold(&mut sm, GestureTag::Two, t0 + ms(1000), ms(900), false);
        assert!(updates.is_empty());
        assert_eq!(sm.state(), ModeState::GazeActive);
    }

    #[test]
    fn test_double_blink_exits_gaze() {
        let mut sm = ModeStateMachine::default();
        let t0 = Instant::now();
        enter_gaze(&mut sm, t0);

        let result = sm.on_blink(BlinkCount::Double, t0 + ms(1000)).unwrap();
        assert_eq!(result.new_state, ModeState::Idle);
        assert_eq!(result.reason, TransitionReason::DoubleBlink);
    }

    #[test]
    fn test_blink_then_pinch_exits_gaze() {
        let mut sm = ModeStateMachine::default();
        let t0 = Instant::now();
        enter_gaze(&mut sm, t0);

        assert!(sm.on_blink(BlinkCount::Single, t0 + ms(1000)).is_none());
        let result = sm.on_pinch(t0 + ms(2000)).unwrap();
        assert_eq!(result.reason, TransitionReason::BlinkPinch);
        assert_eq!(sm.state(), ModeState::Idle);
    }

    #[test]
    fn test_pinch_without_recent_blink_stays_in_gaze() {
        let mut sm = ModeStateMachine::default();
        let t0 = Instant::now();
        enter_gaze(&mut sm, t0);

        assert!(sm.on_pinch(t0 + ms(1000)).is_none());
        sm.on_blink(BlinkCount::Single, t0 + ms(1000));
        assert!(sm.on_pinch(t0 + ms(3000)).is_none());
        assert_eq!(sm.state(), ModeState::GazeActive);
    }

    #[test]
    fn test_blinks_outside_gaze_are_ignored() {
        let mut sm = ModeStateMachine::default();
        let t0 = Instant::now();
        assert!(sm.on_blink(BlinkCount::Double, t0).is_none());
        assert!(sm.on_blink(BlinkCount::Single, t0).is_none());
        assert!(sm.on_pinch(t0).is_none());
    }

    #[test]
    fn test_capture_lifecycle() {
        let mut sm = ModeStateMachine::default();
        assert!(sm.voice_capture_started().is_none());

        hold(&mut sm, GestureTag::One, Instant::now(), ms(2100), false);
        let started = sm.voice_capture_started().unwrap();
        assert_eq!(started.new_state, ModeState::VoiceRecording);
        assert!(sm.voice_capture_started().is_none());

        let finished = sm.voice_capture_finished().unwrap();
        assert_eq!(finished.new_state, ModeState::VoicePending);
        assert!(sm.voice_capture_finished().is_none());
    }

    #[test]
    fn test_thumbs_up_requests_capture_in_voice_pending() {
        let mut sm = ModeStateMachine::default();
        let t0 = Instant::now();

        // Outside voice mode thumbs-up does nothing
        assert!(hold(&mut sm, GestureTag::ThumbsUp, t0, ms(1100), false).is_empty());

        hold(&mut sm, GestureTag::One, t0 + ms(1200), ms(2100), false);
        let updates = hold(&mut sm, GestureTag::ThumbsUp, t0 + ms(3400), ms(1100), false);
        assert_eq!(updates.len(), 1);
        assert!(updates[0].start_capture);
        assert!(updates[0].transition.is_none());
    }

    #[test]
    fn test_state_flags() {
        assert!(ModeState::VoicePending.is_voice());
        assert!(ModeState::VoiceRecording.is_voice());
        assert!(!ModeState::GazeActive.is_voice());
        assert!(ModeState::GazeActive.is_gaze());
        assert!(!ModeState::Idle.is_gaze());
        assert_eq!(ModeState::Idle.description(), "Hand cursor control");
    }

    #[test]
    fn test_reset() {
        let mut sm = ModeStateMachine::default();
        enter_gaze(&mut sm, Instant::now());
        sm.reset();
        assert_eq!(sm.state(), ModeState::Idle);
    }
}
