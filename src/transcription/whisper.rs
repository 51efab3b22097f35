//! Whisper transcription with fixed-length microphone capture
//!
//! Records `capture_seconds` of audio from the default input device via cpal,
//! converts it to 16kHz mono and runs whisper.cpp over it. GPU acceleration is
//! tried first with a CPU fallback.

use super::audio::{levels, prepare_for_model, TARGET_SAMPLE_RATE};
use super::{Transcriber, TranscriptionError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// 1 s of trailing silence lets the model finalise punctuation
const TRAILING_SILENCE: usize = TARGET_SAMPLE_RATE as usize;

/// Clips quieter than this are reported as silent
const SILENCE_PEAK: f32 = 0.001;

pub struct WhisperTranscriber {
    ctx: WhisperContext,
    language: String,
}

impl WhisperTranscriber {
    /// Load a ggml whisper model (e.g. ggml-base.en.bin)
    pub fn new(model_path: &Path, language: &str) -> Result<Self, TranscriptionError> {
        if !model_path.exists() {
            return Err(TranscriptionError::Model(format!(
                "Whisper model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading Whisper model from {}", model_path.display());

        let model_str = model_path.to_str().ok_or_else(|| {
            TranscriptionError::Model(format!(
                "Model path contains invalid UTF-8: {}",
                model_path.display()
            ))
        })?;

        let ctx = Self::load(model_str, true).or_else(|e| {
            tracing::warn!("GPU initialization failed: {}, trying CPU fallback", e);
            Self::load(model_str, false)
        })?;

        Ok(Self {
            ctx,
            language: language.to_string(),
        })
    }

    fn load(model_str: &str, use_gpu: bool) -> Result<WhisperContext, TranscriptionError> {
        let mut params = WhisperContextParameters::default();
        params.use_gpu(use_gpu);

        let ctx = WhisperContext::new_with_params(model_str, params).map_err(|e| {
            TranscriptionError::Model(format!("Failed to load Whisper model: {:?}", e))
        })?;

        tracing::info!(
            "Whisper model loaded ({} backend)",
            if use_gpu { "GPU" } else { "CPU" }
        );
        Ok(ctx)
    }

    /// Transcribe 16kHz mono samples
    pub fn transcribe_samples(&self, samples: &[f32]) -> Result<String, TranscriptionError> {
        let start = Instant::now();

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| TranscriptionError::Model(format!("Failed to create state: {:?}", e)))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&self.language));
        params.set_translate(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, samples)
            .map_err(|e| TranscriptionError::Model(format!("Transcription failed: {:?}", e)))?;

        let mut text = String::new();
        for segment in state.as_iter() {
            if let Ok(segment_text) = segment.to_str() {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(segment_text.trim());
            }
        }

        let audio_secs = samples.len() as f32 / TARGET_SAMPLE_RATE as f32;
        tracing::info!(
            "Transcribed {:.2}s audio in {:.2}s: '{}'",
            audio_secs,
            start.elapsed().as_secs_f32(),
            text.trim()
        );

        Ok(text.trim().to_string())
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, capture_seconds: f32) -> Result<String, TranscriptionError> {
        let (raw, source_rate, channels) = record_clip(capture_seconds)?;

        let mut samples = prepare_for_model(&raw, source_rate, channels);
        let (peak, rms) = levels(&samples);
        tracing::debug!(
            "Captured {} samples, peak {:.4}, RMS {:.4}",
            samples.len(),
            peak,
            rms
        );
        if peak < SILENCE_PEAK {
            tracing::warn!("Captured audio is silent (peak {})", peak);
            return Ok(String::new());
        }

        samples.extend(std::iter::repeat(0.0f32).take(TRAILING_SILENCE));
        self.transcribe_samples(&samples)
    }
}

/// Record from the default input device for a fixed duration
///
/// Returns interleaved samples with the device rate and channel count.
#[allow(deprecated)] // cpal 0.17 deprecates name()
fn record_clip(seconds: f32) -> Result<(Vec<f32>, u32, usize), TranscriptionError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| TranscriptionError::Capture("No default input device".to_string()))?;

    let config = device
        .default_input_config()
        .map_err(|e| TranscriptionError::Capture(e.to_string()))?;
    let source_rate = config.sample_rate();
    let channels = config.channels() as usize;

    tracing::info!(
        "Recording {:.1}s from '{}' ({}Hz, {} channels)",
        seconds,
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        source_rate,
        channels
    );

    let buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
    let callback_buffer = Arc::clone(&buffer);

    let stream = device
        .build_input_stream(
            &config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                callback_buffer.lock().extend_from_slice(data);
            },
            |err| {
                tracing::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| TranscriptionError::Capture(e.to_string()))?;

    stream
        .play()
        .map_err(|e| TranscriptionError::Capture(e.to_string()))?;
    std::thread::sleep(Duration::from_secs_f32(seconds.max(0.0)));
    drop(stream);

    let samples = std::mem::take(&mut *buffer.lock());
    Ok((samples, source_rate, channels))
}
