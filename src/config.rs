//! Configuration management for Handpilot
//!
//! Provides persistent settings storage with schema versioning and migrations.
//! Configuration is stored in `~/.handpilot/config.json`; every section and
//! field is optional in the file and falls back to its default.

use crate::blink::BlinkSettings;
use crate::click::{ClickSettings, ClickVariant};
use crate::controller::ControllerSettings;
use crate::cursor::CursorSettings;
use crate::gaze::{GazeInput, GazeSettings};
use crate::landmarks::Handedness;
use crate::mode::ModeSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Current config schema version
pub const CURRENT_VERSION: u32 = 1;

/// Global config instance for caching
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Config file location override (from `--config`)
static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(std::io::Error),

    #[error("Failed to write config file: {0}")]
    Write(std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown config version: {0}")]
    UnknownVersion(u32),
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema version for migrations
    pub version: u32,
    pub gestures: GestureConfig,
    pub cursor: CursorConfig,
    pub click: ClickConfig,
    pub blink: BlinkConfig,
    pub gaze: GazeConfig,
    pub voice: VoiceConfig,
    pub assistant: AssistantConfig,
    pub injection: InjectionConfig,
    pub source: SourceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            gestures: GestureConfig::default(),
            cursor: CursorConfig::default(),
            click: ClickConfig::default(),
            blink: BlinkConfig::default(),
            gaze: GazeConfig::default(),
            voice: VoiceConfig::default(),
            assistant: AssistantConfig::default(),
            injection: InjectionConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

/// Gesture hold settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Physical hand used for gestures and clicks; the other hand points
    pub gesture_hand: Handedness,
    /// Seconds `One` must be held to toggle voice mode
    pub voice_toggle_hold_secs: f64,
    /// Seconds `Two` must be held to enter gaze mode
    pub gaze_activate_hold_secs: f64,
    /// Seconds a thumbs-up must be held to start another voice capture
    pub voice_capture_hold_secs: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            gesture_hand: Handedness::Right,
            voice_toggle_hold_secs: 2.0,
            gaze_activate_hold_secs: 0.8,
            voice_capture_hold_secs: 1.0,
        }
    }
}

/// Hand cursor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    pub clutch_threshold: f32,
    pub deadzone: f32,
    pub smoothing_alpha: f32,
    pub base_gain: f32,
    pub max_gain: f32,
    pub gain_ramp: f32,
}

impl Default for CursorConfig {
    fn default() -> Self {
        let s = CursorSettings::default();
        Self {
            clutch_threshold: s.clutch_threshold,
            deadzone: s.deadzone,
            smoothing_alpha: s.smoothing_alpha,
            base_gain: s.base_gain,
            max_gain: s.max_gain,
            gain_ramp: s.gain_ramp,
        }
    }
}

/// Pinch click settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickConfig {
    pub pinch_threshold: f32,
    pub double_click_window_ms: u64,
    /// What a quick second pinch does
    pub variant: ClickVariant,
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            pinch_threshold: 0.035,
            double_click_window_ms: 350,
            variant: ClickVariant::RightClick,
        }
    }
}

/// Blink detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    pub ear_threshold: f32,
    pub min_closed_frames: u32,
    pub double_blink_window_ms: u64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.2,
            min_closed_frames: 2,
            double_blink_window_ms: 600,
        }
    }
}

/// Gaze cursor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    pub screen_width: f64,
    pub screen_height: f64,
    pub smooth_factor: f64,
    /// Minimum per-frame move in pixels
    pub deadzone_px: f64,
    pub calibrated_sensitivity: f64,
    pub uncalibrated_sensitivity: f64,
    /// Mirror the input horizontally
    pub invert_x: bool,
    pub input: GazeInput,
    /// Calibration file (None for `~/.handpilot/gaze_calibration.json`)
    pub calibration_path: Option<PathBuf>,
    /// Max delay between a single blink and the pinch that exits gaze
    pub blink_pinch_window_ms: u64,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            screen_width: 2240.0,
            screen_height: 1400.0,
            smooth_factor: 0.4,
            deadzone_px: 1.0,
            calibrated_sensitivity: 1.0,
            uncalibrated_sensitivity: 10.0,
            invert_x: false,
            input: GazeInput::Nose,
            calibration_path: None,
            blink_pinch_window_ms: 1500,
        }
    }
}

impl GazeConfig {
    pub fn calibration_path(&self) -> PathBuf {
        self.calibration_path
            .clone()
            .unwrap_or_else(|| get_data_dir().join("gaze_calibration.json"))
    }
}

/// Voice capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Length of each microphone capture
    pub capture_seconds: f32,
    /// Word that routes a transcript to the assistant
    pub assistant_keyword: String,
    /// ggml whisper model file
    pub model_path: Option<PathBuf>,
    /// Transcription language code
    pub language: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            capture_seconds: crate::voice::DEFAULT_CAPTURE_SECONDS,
            assistant_keyword: "ai".to_string(),
            model_path: None,
            language: "en".to_string(),
        }
    }
}

/// Assistant settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub enabled: bool,
    pub ollama_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Attach a screenshot to each query
    pub screenshots: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ollama_url: crate::assistant::ollama::DEFAULT_OLLAMA_BASE_URL.to_string(),
            model: crate::assistant::ollama::DEFAULT_MODEL.to_string(),
            timeout_secs: crate::assistant::ollama::DEFAULT_TIMEOUT_SECS,
            screenshots: true,
        }
    }
}

/// Input injection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InjectionConfig {
    /// Log events instead of injecting them
    pub dry_run: bool,
    /// Delay between typed characters (0 types the whole string at once)
    pub keystroke_delay_ms: u64,
}

/// Landmark source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Wait this long for a frame before processing an empty one
    pub frame_timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            frame_timeout_ms: 100,
        }
    }
}

impl Config {
    /// Settings for the frame loop components
    pub fn controller_settings(&self) -> ControllerSettings {
        let g = &self.gestures;
        let c = &self.cursor;
        let gz = &self.gaze;

        ControllerSettings {
            gesture_hand: g.gesture_hand,
            mode: ModeSettings {
                voice_toggle_hold: secs(g.voice_toggle_hold_secs),
                gaze_activate_hold: secs(g.gaze_activate_hold_secs),
                voice_capture_hold: secs(g.voice_capture_hold_secs),
                blink_pinch_window: Duration::from_millis(gz.blink_pinch_window_ms),
            },
            cursor: CursorSettings {
                clutch_threshold: c.clutch_threshold,
                deadzone: c.deadzone,
                smoothing_alpha: c.smoothing_alpha,
                base_gain: c.base_gain,
                max_gain: c.max_gain,
                gain_ramp: c.gain_ramp,
            },
            click: ClickSettings {
                pinch_threshold: self.click.pinch_threshold,
                double_click_window: Duration::from_millis(self.click.double_click_window_ms),
                variant: self.click.variant,
            },
            blink: BlinkSettings {
                ear_threshold: self.blink.ear_threshold,
                min_closed_frames: self.blink.min_closed_frames,
                double_blink_window: Duration::from_millis(self.blink.double_blink_window_ms),
            },
            gaze: GazeSettings {
                screen_width: gz.screen_width,
                screen_height: gz.screen_height,
                smooth_factor: gz.smooth_factor,
                deadzone_px: gz.deadzone_px,
                calibrated_sensitivity: gz.calibrated_sensitivity,
                uncalibrated_sensitivity: gz.uncalibrated_sensitivity,
                invert_x: gz.invert_x,
                input: gz.input,
                calibration_path: gz.calibration_path(),
            },
        }
    }
}

/// Negative or non-finite hold durations become zero
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_else(|_| {
        tracing::warn!("Invalid hold duration {}, using 0", value);
        Duration::ZERO
    })
}

/// Get the data directory (~/.handpilot)
pub fn get_data_dir() -> PathBuf {
    home_dir_or_fallback().join(".handpilot")
}

/// Get the path to the config file (~/.handpilot/config.json unless overridden)
pub fn get_config_path() -> PathBuf {
    CONFIG_PATH
        .get()
        .cloned()
        .unwrap_or_else(|| get_data_dir().join("config.json"))
}

/// Get the home directory, falling back to /tmp if unavailable
fn home_dir_or_fallback() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        tracing::error!("Could not determine home directory, using /tmp");
        PathBuf::from("/tmp")
    })
}

/// Load configuration from a file, migrating old schemas
///
/// A missing file yields defaults. A migrated config is written back.
pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::info!("Config file not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Read)?;
    let config: Config = serde_json::from_str(&contents)?;

    let original_version = config.version;
    let migrated = migrate_config(config)?;
    if migrated.version != original_version {
        save_to_path(&migrated, path)?;
    }

    Ok(migrated)
}

/// Save configuration to a file, creating parent directories
pub fn save_to_path(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).map_err(ConfigError::Write)?;
        }
    }

    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents).map_err(ConfigError::Write)?;

    tracing::info!("Config saved to {}", path.display());
    Ok(())
}

/// Migrate configuration from older schema versions
pub fn migrate_config(mut config: Config) -> Result<Config, ConfigError> {
    let original_version = config.version;

    while config.version < CURRENT_VERSION {
        config = apply_migration(config)?;
    }

    if config.version != original_version {
        tracing::info!(
            "Migrated config from version {} to {}",
            original_version,
            config.version
        );
    }

    Ok(config)
}

/// Apply a single migration step
fn apply_migration(config: Config) -> Result<Config, ConfigError> {
    match config.version {
        // Version 0 -> 1: files written before schema versioning
        0 => {
            let mut migrated = config;
            migrated.version = 1;
            Ok(migrated)
        }
        v => Err(ConfigError::UnknownVersion(v)),
    }
}

/// Load the config once and cache it for the process
///
/// `path` overrides the default location. Later calls return the cached
/// config and ignore `path`.
pub fn init(path: Option<PathBuf>) -> Config {
    if let Some(path) = path {
        if CONFIG_PATH.set(path).is_err() {
            tracing::debug!("Config path already set, override ignored");
        }
    }
    get_config()
}

fn get_config_instance() -> &'static Config {
    CONFIG.get_or_init(|| {
        let path = get_config_path();
        let config = load_from_path(&path).unwrap_or_else(|e| {
            tracing::error!("Failed to load config, using defaults: {}", e);
            Config::default()
        });
        tracing::info!("Config loaded from {}", path.display());
        config
    })
}

/// Get the current configuration
pub fn get_config() -> Config {
    get_config_instance().clone()
}
