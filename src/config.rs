use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::core::glyphs::{Glyphs, DEFAULT_FONT};
use crate::error::EngineError;
use crate::types::{ChannelOrder, ColorProfile, Rgb};

/// Engine-wide settings, loadable from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Panel width in pixels (used when the binary builds its own sink)
    pub width: u32,
    /// Panel height in pixels
    pub height: u32,
    /// Brightness restored by `display_on`, in percent
    pub brightness: u8,
    /// Font used when a request does not name one: a built-in name or a font file
    pub font: String,
    /// Directory font file names are looked up in
    pub font_dir: PathBuf,
    /// Pixel size font files are rasterized at
    pub font_size: f32,
    /// Scroll step interval at speed 1.0
    pub text_interval_ms: u64,
    pub clock_interval_ms: u64,
    /// Display time for image frames that carry no delay of their own
    pub image_frame_ms: u64,
    pub ntp_server: String,
    pub ntp_timeout_ms: u64,
    pub ntp_resync_secs: u64,
    /// Wait after a failed sync before the time server is queried again
    pub ntp_retry_secs: u64,
    /// ffmpeg executable used to decode video
    pub ffmpeg: PathBuf,
    /// Pace video at its native frame rate instead of decode speed
    pub video_realtime: bool,
    /// Upper bound on a single blocking video read
    pub video_read_timeout_ms: u64,
    /// Consecutive read timeouts after which a stream is abandoned
    pub video_stall_limit: u32,
    /// Directory relative image and video paths are resolved against
    pub media_root: Option<PathBuf>,
    pub color_factors: [f32; 3],
    pub channel_order: ChannelOrder,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 32,
            brightness: 50,
            font: DEFAULT_FONT.to_string(),
            font_dir: PathBuf::from("fonts"),
            font_size: 10.0,
            text_interval_ms: 50,
            clock_interval_ms: 500,
            image_frame_ms: 100,
            ntp_server: "pool.ntp.org:123".to_string(),
            ntp_timeout_ms: 1000,
            ntp_resync_secs: 60,
            ntp_retry_secs: 30,
            ffmpeg: PathBuf::from("ffmpeg"),
            video_realtime: true,
            video_read_timeout_ms: 2000,
            video_stall_limit: 5,
            media_root: None,
            color_factors: [1.0; 3],
            channel_order: ChannelOrder::Rgb,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; missing keys take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: EngineConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::invalid("panel dimensions must be non-zero"));
        }
        if self.brightness > 100 {
            return Err(EngineError::invalid(format!(
                "brightness {} is above 100",
                self.brightness
            )));
        }
        if self.text_interval_ms == 0 || self.clock_interval_ms == 0 || self.image_frame_ms == 0 {
            return Err(EngineError::invalid("frame intervals must be non-zero"));
        }
        if self.video_read_timeout_ms == 0 {
            return Err(EngineError::invalid("video read timeout must be non-zero"));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(EngineError::invalid(format!(
                "font size must be positive, got {}",
                self.font_size
            )));
        }
        self.glyphs(None)?;
        Ok(())
    }

    /// Resolve a requested font, or the configured default
    pub fn glyphs(&self, requested: Option<&str>) -> Result<Glyphs, EngineError> {
        Glyphs::resolve(requested.unwrap_or(&self.font), &self.font_dir, self.font_size)
    }

    /// Initial color profile (factors clamped)
    pub fn profile(&self) -> ColorProfile {
        ColorProfile::new(self.color_factors, self.channel_order)
    }

    pub fn text_interval(&self) -> Duration {
        Duration::from_millis(self.text_interval_ms)
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.clock_interval_ms)
    }

    pub fn image_frame_duration(&self) -> Duration {
        Duration::from_millis(self.image_frame_ms)
    }

    pub fn ntp_timeout(&self) -> Duration {
        Duration::from_millis(self.ntp_timeout_ms)
    }

    pub fn ntp_resync(&self) -> Duration {
        Duration::from_secs(self.ntp_resync_secs)
    }

    pub fn ntp_retry(&self) -> Duration {
        Duration::from_secs(self.ntp_retry_secs)
    }

    pub fn video_read_timeout(&self) -> Duration {
        Duration::from_millis(self.video_read_timeout_ms)
    }
}

/// Parameters of a `show_text` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub content: String,
    pub color: Rgb,
    /// Scroll speed multiplier; must be positive
    pub speed: f32,
    pub scroll: bool,
    /// Font name; `None` uses the engine default
    pub font: Option<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            content: String::new(),
            color: Rgb::RED,
            speed: 5.0,
            scroll: true,
            font: None,
        }
    }
}

impl TextConfig {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn scroll(mut self, scroll: bool) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn font(mut self, font: impl Into<String>) -> Self {
        self.font = Some(font.into());
        self
    }

    /// Check the request and resolve its font
    pub fn validate(&self, config: &EngineConfig) -> Result<Glyphs, EngineError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(EngineError::invalid(format!(
                "speed must be a positive number, got {}",
                self.speed
            )));
        }
        config.glyphs(self.font.as_deref())
    }
}

/// Parameters of a `show_clock` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub color: Rgb,
    /// chrono strftime pattern
    pub format: String,
    pub use_network_time: bool,
    pub font: Option<String>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            color: Rgb::RED,
            format: "%H:%M:%S".to_string(),
            use_network_time: false,
            font: None,
        }
    }
}

impl ClockConfig {
    pub fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn network_time(mut self, enabled: bool) -> Self {
        self.use_network_time = enabled;
        self
    }

    pub fn font(mut self, font: impl Into<String>) -> Self {
        self.font = Some(font.into());
        self
    }

    /// Check the request and resolve its font
    pub fn validate(&self, config: &EngineConfig) -> Result<Glyphs, EngineError> {
        validate_time_format(&self.format)?;
        config.glyphs(self.font.as_deref())
    }
}

/// Reject empty patterns and unknown strftime specifiers
pub fn validate_time_format(format: &str) -> Result<(), EngineError> {
    if format.is_empty() {
        return Err(EngineError::invalid("clock format is empty"));
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(EngineError::invalid(format!("invalid clock format {format:?}")));
    }
    Ok(())
}
