use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use log::warn;

use crate::core::display_context::DisplayContext;
use crate::core::frame::Frame;
use crate::core::glyphs::Glyphs;
use crate::error::EngineError;
use crate::math::transform;
use crate::traits::{FrameStep, RenderTask, TimeSource};
use crate::types::{ColorProfile, RenderKind, Rgb};

/// Centered clock, redrawn at a fixed interval
pub struct ClockTask {
    color: Rgb,
    format: String,
    glyphs: Glyphs,
    context: DisplayContext,
    local: Arc<dyn TimeSource>,
    /// Preferred source; falls back to `local` on any failure
    network: Option<Arc<dyn TimeSource>>,
    interval: Duration,
}

impl ClockTask {
    /// `format` must already be a valid strftime pattern
    pub fn new(
        color: Rgb,
        format: impl Into<String>,
        glyphs: Glyphs,
        context: DisplayContext,
        local: Arc<dyn TimeSource>,
        interval: Duration,
    ) -> Self {
        Self {
            color,
            format: format.into(),
            glyphs,
            context,
            local,
            network: None,
            interval,
        }
    }

    pub fn with_network_time(mut self, source: Arc<dyn TimeSource>) -> Self {
        self.network = Some(source);
        self
    }

    /// Current time from the network source, or local time if that fails
    pub fn current_time(&self) -> DateTime<Local> {
        if let Some(network) = &self.network {
            match network.now() {
                Ok(time) => return time,
                Err(e) => warn!("{} failed, using local time: {e}", network.name()),
            }
        }
        match self.local.now() {
            Ok(time) => time,
            Err(e) => {
                warn!("{} failed: {e}", self.local.name());
                Local::now()
            }
        }
    }

    /// The string drawn on this tick
    pub fn time_text(&self) -> String {
        self.current_time().format(&self.format).to_string()
    }
}

impl RenderTask for ClockTask {
    fn kind(&self) -> RenderKind {
        RenderKind::Clock
    }

    fn next_frame(&mut self, profile: &ColorProfile) -> Result<FrameStep, EngineError> {
        let text = self.time_text();
        let mut frame = Frame::new(self.context.width, self.context.height);
        let x = self.context.center_x(self.glyphs.measure(&text));
        let y = self.context.center_y(self.glyphs.line_height());
        self.glyphs.draw(&mut frame, &text, x, y, transform(self.color, profile));

        Ok(FrameStep::Show {
            frame,
            hold: self.interval,
        })
    }
}

impl std::fmt::Debug for ClockTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockTask")
            .field("format", &self.format)
            .field("glyphs", &self.glyphs)
            .field("network", &self.network.as_ref().map(|n| n.name().to_string()))
            .finish()
    }
}
