use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::display_context::DisplayContext;
use crate::core::frame::Frame;
use crate::error::{EngineError, FrameError};

/// One decoded still or animation frame with its display time
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    pub frame: Frame,
    pub duration: Duration,
}

/// Pixel layout of a raw decoded video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb24,
    Bgr24,
}

/// Raw video frame as handed over by a decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVideoFrame {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub data: Vec<u8>,
}

impl RawVideoFrame {
    /// Convert to the canonical RGB frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let mut frame = Frame::from_rgb_bytes(self.width, self.height, &self.data)?;
        if self.layout == PixelLayout::Bgr24 {
            for pixel in frame.pixels_mut() {
                std::mem::swap(&mut pixel.r, &mut pixel.b);
            }
        }
        Ok(frame)
    }
}

/// Where a video comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoLocation {
    File(PathBuf),
    Url(String),
}

impl VideoLocation {
    /// Classify a path-or-URL string; relative paths resolve against `media_root`
    pub fn parse(source: &str, media_root: Option<&Path>) -> Self {
        if source.contains("://") {
            return VideoLocation::Url(source.to_string());
        }
        VideoLocation::File(resolve_media_path(Path::new(source), media_root))
    }
}

impl fmt::Display for VideoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoLocation::File(path) => write!(f, "{}", path.display()),
            VideoLocation::Url(url) => f.write_str(url),
        }
    }
}

/// Join relative media paths onto the media root
pub fn resolve_media_path(path: &Path, media_root: Option<&Path>) -> PathBuf {
    match media_root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path.to_path_buf(),
    }
}

/// Streaming video decoder; the decoder resource is released on drop
pub trait VideoSource: Send {
    /// Pull the next frame; `Ok(None)` means end of stream
    fn next_frame(&mut self) -> Result<Option<RawVideoFrame>, FrameError>;
}

/// Decodes media for the image and video renderers
pub trait MediaProvider: Send + Sync {
    /// Decode a still or animated image into device-sized frames
    fn decode_image(&self, path: &Path, context: DisplayContext) -> Result<Vec<ImageFrame>, EngineError>;

    /// Open a streaming decoder; fails fast when the source cannot be opened
    fn open_video(
        &self,
        location: &VideoLocation,
        context: DisplayContext,
    ) -> Result<Box<dyn VideoSource>, EngineError>;
}
