//! Application wiring
//!
//! Builds the adapters selected by config and cargo features, then runs
//! either the frame loop or the calibration collector on stdin frames.

use crate::assistant::{Assistant, NoScreenCapture, OllamaAssistant, ScreenCapture};
use crate::click::ClickDebouncer;
use crate::config::Config;
use crate::controller::{Controller, ControllerSettings};
use crate::gaze::{input_point, CalibrationRoutine, GazeCalibration, RoutineError};
use crate::gesture::{classify_hand, GestureTag};
use crate::injection::{InputSink, TracingSink};
use crate::mode::HoldTimer;
use crate::source::{JsonLinesSource, LandmarkSource, SourceEvent};
use crate::transcription::{Transcriber, UnavailableTranscriber};
use crate::voice::{CommandParser, VoiceCoordinator, VoiceDispatcher};
use anyhow::Context;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Thumbs-up hold that discards the readings for the current calibration point
const CALIBRATION_ABORT_HOLD: Duration = Duration::from_secs(1);

/// Pick the input sink: enigo when built with `desktop`, logging otherwise
pub fn build_sink(cfg: &Config) -> anyhow::Result<Box<dyn InputSink>> {
    if cfg.injection.dry_run {
        tracing::info!("Dry run: input events will only be logged");
        return Ok(Box::new(TracingSink));
    }

    #[cfg(feature = "desktop")]
    {
        let sink = crate::injection::EnigoSink::new(cfg.injection.keystroke_delay_ms)?;
        Ok(Box::new(sink))
    }

    #[cfg(not(feature = "desktop"))]
    {
        tracing::warn!("Built without the `desktop` feature, input events will only be logged");
        Ok(Box::new(TracingSink))
    }
}

/// Load the speech model, falling back to a transcriber that always fails
pub fn build_transcriber(cfg: &Config) -> Arc<dyn Transcriber> {
    #[cfg(feature = "whisper")]
    {
        let Some(model_path) = &cfg.voice.model_path else {
            tracing::warn!("No whisper model configured, voice capture disabled");
            return Arc::new(UnavailableTranscriber::new("no whisper model configured"));
        };
        match crate::transcription::WhisperTranscriber::new(model_path, &cfg.voice.language) {
            Ok(t) => Arc::new(t),
            Err(e) => {
                tracing::error!("Failed to load whisper model: {}", e);
                Arc::new(UnavailableTranscriber::new(e.to_string()))
            }
        }
    }

    #[cfg(not(feature = "whisper"))]
    {
        let _ = cfg;
        tracing::warn!("Built without the `whisper` feature, voice capture disabled");
        Arc::new(UnavailableTranscriber::default())
    }
}

pub fn build_assistant(cfg: &Config) -> Option<Box<dyn Assistant>> {
    let a = &cfg.assistant;
    if !a.enabled {
        tracing::info!("Assistant disabled");
        return None;
    }

    match OllamaAssistant::new(&a.ollama_url, &a.model, a.timeout_secs) {
        Ok(assistant) => Some(Box::new(assistant)),
        Err(e) => {
            tracing::error!("Failed to create assistant client: {}", e);
            None
        }
    }
}

pub fn build_screen_capture(cfg: &Config) -> Box<dyn ScreenCapture> {
    if !cfg.assistant.screenshots {
        return Box::new(NoScreenCapture);
    }

    #[cfg(feature = "screenshot")]
    {
        Box::new(crate::assistant::XcapScreenCapture)
    }

    #[cfg(not(feature = "screenshot"))]
    {
        tracing::warn!("Built without the `screenshot` feature, assistant queries get no image");
        Box::new(NoScreenCapture)
    }
}

/// Assemble a controller from config
pub fn build_controller(cfg: &Config) -> anyhow::Result<Controller> {
    let parser = CommandParser::new(&cfg.voice.assistant_keyword)
        .with_context(|| format!("Invalid assistant keyword {:?}", cfg.voice.assistant_keyword))?;

    let voice = VoiceCoordinator::new(build_transcriber(cfg), cfg.voice.capture_seconds);
    let dispatcher = VoiceDispatcher::new(parser, build_assistant(cfg), build_screen_capture(cfg));

    Ok(Controller::new(
        cfg.controller_settings(),
        build_sink(cfg)?,
        voice,
        dispatcher,
    ))
}

/// `handpilot run`
pub fn run_controller(cfg: &Config) -> anyhow::Result<()> {
    let mut controller = build_controller(cfg)?;
    let mut source = JsonLinesSource::stdin()?;

    tracing::info!("Waiting for landmark frames on stdin");
    controller.run_loop(
        &mut source,
        Duration::from_millis(cfg.source.frame_timeout_ms),
    );

    // Let an in-flight capture finish so its thread is not torn down mid-write
    controller.voice_mut().join();
    Ok(())
}

/// `handpilot calibrate`
pub fn run_calibration(cfg: &Config) -> anyhow::Result<()> {
    let settings = cfg.controller_settings();
    let mut source = JsonLinesSource::stdin()?;

    let calibration = collect_calibration(
        &mut source,
        &settings,
        Duration::from_millis(cfg.source.frame_timeout_ms),
    )?;

    let path = &settings.gaze.calibration_path;
    calibration
        .save(path)
        .with_context(|| format!("Failed to save calibration to {}", path.display()))?;
    tracing::info!("Gaze calibration saved to {}", path.display());
    Ok(())
}

/// Run the nine-point calibration over a frame source
///
/// Every frame with a face records one reading for the current target. A
/// pinch on the gesture hand confirms the point, and a held thumbs-up
/// discards its readings. Fails if the source closes before all points are
/// confirmed or the fit fails.
pub fn collect_calibration(
    source: &mut dyn LandmarkSource,
    settings: &ControllerSettings,
    frame_timeout: Duration,
) -> anyhow::Result<GazeCalibration> {
    let gaze = &settings.gaze;
    let mut routine = CalibrationRoutine::new(gaze.screen_width, gaze.screen_height);
    let mut pinch = ClickDebouncer::new(settings.click);
    let mut abort = HoldTimer::new(GestureTag::ThumbsUp, CALIBRATION_ABORT_HOLD);

    announce_target(&routine);

    while !routine.is_complete() {
        let frame = match source.next_frame(frame_timeout) {
            SourceEvent::Frame(frame) => frame,
            SourceEvent::Timeout => continue,
            SourceEvent::Closed => anyhow::bail!(
                "Landmark stream closed after {} of 9 calibration points",
                routine.confirmed().len()
            ),
        };
        let now = Instant::now();

        if let Some(face) = &frame.face {
            let (x, y) = input_point(face, gaze.input, gaze.invert_x);
            routine.record(x, y);
        }

        let hand = frame.hand(settings.gesture_hand);
        if abort.update(classify_hand(hand), now) {
            routine.abort_point();
            announce_target(&routine);
        }

        if pinch.update_hand(hand, now).is_some() {
            match routine.confirm() {
                Ok(_) => announce_target(&routine),
                Err(RoutineError::NotEnoughReadings { have, need }) => {
                    tracing::warn!("Hold still a little longer ({}/{} readings)", have, need);
                }
                Err(RoutineError::Complete) => break,
            }
        }
    }

    let mut calibration = GazeCalibration::new(gaze.screen_width, gaze.screen_height);
    routine.apply(&mut calibration)?;
    Ok(calibration)
}

fn announce_target(routine: &CalibrationRoutine) {
    if let Some((x, y)) = routine.current_target() {
        tracing::info!(
            "Look at point {}/9 ({:.0}, {:.0}) and pinch to confirm",
            routine.current_index() + 1,
            x,
            y
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_sink() {
        let mut cfg = Config::default();
        cfg.injection.dry_run = true;
        assert!(build_sink(&cfg).is_ok());
    }

    #[test]
    fn test_disabled_assistant() {
        let mut cfg = Config::default();
        cfg.assistant.enabled = false;
        assert!(build_assistant(&cfg).is_none());
    }

    #[test]
    fn test_screenshots_disabled() {
        let mut cfg = Config::default();
        cfg.assistant.screenshots = false;
        assert!(build_screen_capture(&cfg).capture().is_err());
    }

    #[test]
    fn test_controller_starts_idle() {
        let mut cfg = Config::default();
        cfg.injection.dry_run = true;
        cfg.assistant.enabled = false;
        let controller = build_controller(&cfg).unwrap();
        assert_eq!(controller.mode(), crate::mode::ModeState::Idle);
        assert!(!controller.voice().is_running());
    }

    #[test]
    fn test_closed_source_fails_calibration() {
        struct Closed;
        impl LandmarkSource for Closed {
            fn next_frame(&mut self, _timeout: Duration) -> SourceEvent {
                SourceEvent::Closed
            }
        }

        let err = collect_calibration(
            &mut Closed,
            &ControllerSettings::default(),
            Duration::from_millis(1),
        )
        .unwrap_err();
        assert!(err.to_string().contains("0 of 9"));
    }
}
