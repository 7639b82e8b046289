use log::debug;

use crate::core::frame::Frame;
use crate::error::EngineError;
use crate::math::transform_frame;
use crate::traits::{FrameStep, ImageFrame, RenderTask};
use crate::types::{ColorProfile, RenderKind};

/// Loops a decoded still or animation
///
/// The color profile is applied once to the whole sequence rather than per
/// display; the baked frames are rebuilt only when the shared profile changes.
#[derive(Debug)]
pub struct ImageTask {
    frames: Vec<ImageFrame>,
    baked: Vec<Frame>,
    baked_for: ColorProfile,
    index: usize,
}

impl ImageTask {
    /// `frames` must be non-empty and already sized to the device
    pub fn new(frames: Vec<ImageFrame>, profile: ColorProfile) -> Result<Self, EngineError> {
        if frames.is_empty() {
            return Err(EngineError::resource("image", "no frames decoded"));
        }
        let baked = bake(&frames, &profile);
        Ok(Self {
            frames,
            baked,
            baked_for: profile,
            index: 0,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Profile the current baked frames were produced with
    pub fn baked_profile(&self) -> ColorProfile {
        self.baked_for
    }
}

fn bake(frames: &[ImageFrame], profile: &ColorProfile) -> Vec<Frame> {
    frames
        .iter()
        .map(|f| transform_frame(&f.frame, profile))
        .collect()
}

impl RenderTask for ImageTask {
    fn kind(&self) -> RenderKind {
        RenderKind::Image
    }

    fn next_frame(&mut self, profile: &ColorProfile) -> Result<FrameStep, EngineError> {
        if *profile != self.baked_for {
            debug!("color profile changed, re-baking {} image frames", self.frames.len());
            self.baked = bake(&self.frames, profile);
            self.baked_for = *profile;
        }

        let step = FrameStep::Show {
            frame: self.baked[self.index].clone(),
            hold: self.frames[self.index].duration,
        };
        // Restart from the first frame after the last
        self.index = (self.index + 1) % self.frames.len();
        Ok(step)
    }
}
