//! Speech-to-text for voice commands
//!
//! A [`Transcriber`] records a fixed-length clip from the microphone and
//! returns its transcript. It is called from the voice background thread,
//! so it may block for the whole capture and decode.

pub mod audio;
#[cfg(feature = "whisper")]
pub mod whisper;

#[cfg(feature = "whisper")]
pub use whisper::WhisperTranscriber;

/// Errors from capture or transcription
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("Transcription unavailable: {0}")]
    Unavailable(String),

    #[error("Audio capture failed: {0}")]
    Capture(String),

    #[error("Model error: {0}")]
    Model(String),
}

/// Records and transcribes one utterance
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, capture_seconds: f32) -> Result<String, TranscriptionError>;
}

/// Used when no speech backend is compiled in or the model failed to load
#[derive(Debug, Clone)]
pub struct UnavailableTranscriber {
    reason: String,
}

impl UnavailableTranscriber {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for UnavailableTranscriber {
    fn default() -> Self {
        Self::new("built without the `whisper` feature")
    }
}

impl Transcriber for UnavailableTranscriber {
    fn transcribe(&self, _capture_seconds: f32) -> Result<String, TranscriptionError> {
        Err(TranscriptionError::Unavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_transcriber_reports_reason() {
        let t = UnavailableTranscriber::new("no model");
        let err = t.transcribe(4.0).unwrap_err();
        assert_eq!(err.to_string(), "Transcription unavailable: no model");
    }
}
