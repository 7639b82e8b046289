use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::EngineConfig;
use crate::core::display_context::DisplayContext;
use crate::error::EngineError;
use crate::loaders::image_decoder::decode_image;
use crate::loaders::video_decoder::{FfmpegOptions, FfmpegVideoSource};
use crate::traits::{ImageFrame, MediaProvider, VideoLocation, VideoSource};

/// Media provider reading images with the `image` crate and video through ffmpeg
#[derive(Debug, Clone)]
pub struct FileMediaProvider {
    ffmpeg: FfmpegOptions,
    default_frame: Duration,
}

impl FileMediaProvider {
    pub fn new(ffmpeg: FfmpegOptions, default_frame: Duration) -> Self {
        Self {
            ffmpeg,
            default_frame,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            FfmpegOptions {
                program: config.ffmpeg.clone(),
                realtime: config.video_realtime,
                read_timeout: config.video_read_timeout(),
            },
            config.image_frame_duration(),
        )
    }
}

impl MediaProvider for FileMediaProvider {
    fn decode_image(&self, path: &Path, context: DisplayContext) -> Result<Vec<ImageFrame>, EngineError> {
        decode_image(path, context, self.default_frame)
            .map_err(|e| EngineError::resource(path.display().to_string(), format!("{e:#}")))
    }

    fn open_video(
        &self,
        location: &VideoLocation,
        context: DisplayContext,
    ) -> Result<Box<dyn VideoSource>, EngineError> {
        let source = FfmpegVideoSource::open(location, context, &self.ffmpeg)
            .map_err(|e| EngineError::resource(location.to_string(), format!("{e:#}")))?;
        Ok(Box::new(source))
    }
}

/// Media categories stored under the media root, plus font files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Font,
}

impl MediaKind {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => &["png", "jpg", "jpeg", "gif", "bmp"],
            MediaKind::Video => &["mp4", "avi", "mkv", "mov", "webm"],
            MediaKind::Font => &["ttf", "otf", "ttc"],
        }
    }

    /// Case-insensitive extension check
    pub fn matches(self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions()
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

/// Listing of playable files in the media root
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    root: PathBuf,
}

impl MediaLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File names of the given kind, sorted; a missing root lists nothing
    pub fn list(&self, kind: MediaKind) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read media directory: {:?}", self.root))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to read media directory: {:?}", self.root))?
                .path();
            if !path.is_file() || !kind.matches(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
