use std::time::Duration;

use crate::core::frame::Frame;
use crate::error::EngineError;
use crate::types::{ColorProfile, RenderKind};

/// Result of asking a render task for its next frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameStep {
    /// Push this frame, then wait `hold` before the next one
    Show { frame: Frame, hold: Duration },
    /// Source exhausted; the loop ends normally
    EndOfStream,
}

/// Content-specific frame producer driven by the generic render loop
pub trait RenderTask: Send {
    fn kind(&self) -> RenderKind;

    /// Produce the next frame using the color profile active for this iteration
    ///
    /// `EngineError::TransientFrame` drops this iteration and the loop carries on;
    /// any other `Err` ends the loop.
    fn next_frame(&mut self, profile: &ColorProfile) -> Result<FrameStep, EngineError>;
}
