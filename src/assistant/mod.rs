//! Assistant queries for voice commands
//!
//! A transcript addressed to the assistant ("ai, what is this") is sent to an
//! [`Assistant`] together with a capture of the screen, and the answer is
//! typed back at the current focus.

pub mod ollama;

pub use ollama::{OllamaAssistant, OllamaError};

/// PNG-encoded screen capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Errors returned by an assistant backend
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("Assistant unavailable: {0}")]
    Unavailable(String),

    #[error("Assistant request failed: {0}")]
    Request(#[from] OllamaError),

    #[error("Assistant returned an empty response")]
    EmptyResponse,
}

/// Answers a natural-language query, optionally about a screenshot
pub trait Assistant: Send + Sync {
    fn query(&self, text: &str, screenshot: Option<&Screenshot>)
        -> Result<String, AssistantError>;
}

/// Grabs the screen for assistant context
pub trait ScreenCapture: Send + Sync {
    fn capture(&self) -> anyhow::Result<Screenshot>;
}

/// Capture backend used when screenshots are disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScreenCapture;

impl ScreenCapture for NoScreenCapture {
    fn capture(&self) -> anyhow::Result<Screenshot> {
        anyhow::bail!("Screen capture not available (built without the `screenshot` feature)")
    }
}

#[cfg(feature = "screenshot")]
pub use capture::XcapScreenCapture;

#[cfg(feature = "screenshot")]
mod capture {
    use super::{ScreenCapture, Screenshot};
    use anyhow::{anyhow, Context};
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;
    use xcap::Monitor;

    /// Captures the primary monitor via xcap
    #[derive(Debug, Default, Clone, Copy)]
    pub struct XcapScreenCapture;

    impl ScreenCapture for XcapScreenCapture {
        fn capture(&self) -> anyhow::Result<Screenshot> {
            let monitors = Monitor::all().context("Failed to enumerate monitors")?;
            let monitor = monitors
                .iter()
                .find(|m| m.is_primary().unwrap_or(false))
                .or_else(|| monitors.first())
                .ok_or_else(|| anyhow!("No monitor found"))?;

            let rgba = monitor
                .capture_image()
                .context("Failed to capture monitor")?;
            let (width, height) = (rgba.width(), rgba.height());

            let mut png = Vec::new();
            DynamicImage::ImageRgba8(rgba)
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .context("Failed to encode screenshot")?;

            tracing::debug!("Captured {}x{} screenshot ({} bytes)", width, height, png.len());
            Ok(Screenshot { png, width, height })
        }
    }
}
