use std::time::Duration;

use crate::core::display_context::DisplayContext;
use crate::core::frame::Frame;
use crate::core::glyphs::Glyphs;
use crate::error::EngineError;
use crate::math::transform;
use crate::traits::{FrameStep, RenderTask};
use crate::types::{ColorProfile, RenderKind, Rgb};

/// Static or right-to-left scrolling text
#[derive(Debug)]
pub struct TextTask {
    content: String,
    color: Rgb,
    glyphs: Glyphs,
    context: DisplayContext,
    scroll: bool,
    /// Left edge of the text for the next frame
    position: i32,
    text_width: i32,
    top: i32,
    hold: Duration,
}

impl TextTask {
    /// `base_interval` is the step interval at speed 1.0; speed must be positive
    pub fn new(
        content: impl Into<String>,
        color: Rgb,
        glyphs: Glyphs,
        context: DisplayContext,
        scroll: bool,
        speed: f32,
        base_interval: Duration,
    ) -> Self {
        let content = content.into();
        let text_width = glyphs.measure(&content);
        let position = if scroll {
            context.width as i32
        } else {
            context.center_x(text_width)
        };

        Self {
            top: context.center_y(glyphs.line_height()),
            hold: scaled_interval(base_interval, speed),
            content,
            color,
            glyphs,
            context,
            scroll,
            position,
            text_width: text_width as i32,
        }
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn text_width(&self) -> i32 {
        self.text_width
    }

    /// Delay between frames
    pub fn hold(&self) -> Duration {
        self.hold
    }

    fn advance(&mut self) {
        if !self.scroll {
            return;
        }
        self.position -= 1;
        // Wrap once the text has fully left the left edge
        if self.position + self.text_width < 0 {
            self.position = self.context.width as i32;
        }
    }
}

/// `base / speed`, rounded to the nearest nanosecond
fn scaled_interval(base: Duration, speed: f32) -> Duration {
    Duration::from_nanos((base.as_nanos() as f64 / speed as f64).round() as u64)
}

impl RenderTask for TextTask {
    fn kind(&self) -> RenderKind {
        RenderKind::Text
    }

    fn next_frame(&mut self, profile: &ColorProfile) -> Result<FrameStep, EngineError> {
        let mut frame = Frame::new(self.context.width, self.context.height);
        let color = transform(self.color, profile);
        self.glyphs.draw(&mut frame, &self.content, self.position, self.top, color);
        self.advance();

        Ok(FrameStep::Show {
            frame,
            hold: self.hold,
        })
    }
}
