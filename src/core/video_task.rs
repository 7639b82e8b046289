use std::time::Duration;

use log::{debug, warn};

use crate::core::display_context::DisplayContext;
use crate::error::{EngineError, FrameError};
use crate::math::transform_pixels;
use crate::traits::{FrameStep, RenderTask, VideoSource};
use crate::types::{ColorProfile, RenderKind};

/// Plays a decoded video stream once; pacing comes from the source itself
pub struct VideoTask {
    source: Box<dyn VideoSource>,
    label: String,
    context: DisplayContext,
    stall_limit: u32,
    stalls: u32,
    skipped: u64,
}

impl VideoTask {
    pub fn new(source: Box<dyn VideoSource>, label: impl Into<String>, context: DisplayContext) -> Self {
        Self {
            source,
            label: label.into(),
            context,
            stall_limit: 5,
            stalls: 0,
            skipped: 0,
        }
    }

    /// Consecutive read timeouts tolerated before the stream is abandoned
    pub fn with_stall_limit(mut self, limit: u32) -> Self {
        self.stall_limit = limit.max(1);
        self
    }

    /// Frames dropped so far because they could not be decoded or converted
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn skip(&mut self, reason: &FrameError) -> EngineError {
        self.skipped += 1;
        warn!("{}: skipping frame: {reason}", self.label);
        EngineError::transient(format!("{}: {reason}", self.label))
    }
}

impl RenderTask for VideoTask {
    fn kind(&self) -> RenderKind {
        RenderKind::Video
    }

    fn next_frame(&mut self, profile: &ColorProfile) -> Result<FrameStep, EngineError> {
        let raw = match self.source.next_frame() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(FrameStep::EndOfStream),
            Err(FrameError::Timeout) => {
                self.stalls += 1;
                if self.stalls >= self.stall_limit {
                    return Err(EngineError::FatalStream(format!(
                        "{}: no frame after {} read timeouts",
                        self.label, self.stalls
                    )));
                }
                return Err(self.skip(&FrameError::Timeout));
            }
            Err(e @ FrameError::Corrupt(_)) => return Err(self.skip(&e)),
            Err(FrameError::Decoder(reason)) => {
                return Err(EngineError::FatalStream(format!("{}: {reason}", self.label)))
            }
        };
        self.stalls = 0;

        let mut frame = match raw.to_frame() {
            Ok(frame) => frame,
            Err(e) => return Err(self.skip(&e)),
        };
        // Live profile, re-read by the driver every frame
        transform_pixels(frame.pixels_mut(), profile);
        let frame = frame.resized(self.context.width, self.context.height);

        Ok(FrameStep::Show {
            frame,
            hold: Duration::ZERO,
        })
    }
}

impl Drop for VideoTask {
    fn drop(&mut self) {
        debug!("{}: releasing decoder ({} frames skipped)", self.label, self.skipped);
    }
}
