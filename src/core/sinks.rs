use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{bail, Context};

use crate::core::frame::Frame;
use crate::math::scale_channel;
use crate::traits::FrameSink;
use crate::types::Rgb;

/// In-memory sink that records every frame it receives
///
/// Clones share the same recording, so a test can keep one handle while the
/// engine owns another.
#[derive(Debug, Clone)]
pub struct MemorySink {
    width: u32,
    height: u32,
    frames: Arc<Mutex<Vec<Frame>>>,
    brightness: Arc<AtomicU8>,
    failing: Arc<AtomicBool>,
}

impl MemorySink {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frames: Arc::default(),
            brightness: Arc::new(AtomicU8::new(100)),
            failing: Arc::default(),
        }
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn frame_count(&self) -> usize {
        self.recorded().len()
    }

    /// Copy of everything written so far
    pub fn recorded(&self) -> Vec<Frame> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn brightness(&self) -> u8 {
        self.brightness.load(Ordering::SeqCst)
    }
}

impl FrameSink for MemorySink {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn write_frame(&mut self, frame: &Frame) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("memory sink set to fail");
        }
        if frame.dimensions() != (self.width, self.height) {
            bail!(
                "frame is {:?}, sink is {}x{}",
                frame.dimensions(),
                self.width,
                self.height
            );
        }
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame.clone());
        Ok(())
    }

    fn set_brightness(&mut self, percent: u8) -> anyhow::Result<()> {
        self.brightness.store(percent, Ordering::SeqCst);
        Ok(())
    }
}

/// Preview sink drawing the panel in a truecolor terminal
///
/// Each text cell shows two pixel rows with an upper half block: the
/// foreground is the top pixel and the background the bottom one.
pub struct TerminalSink<W: Write + Send> {
    out: W,
    width: u32,
    height: u32,
    brightness: u8,
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W, width: u32, height: u32) -> Self {
        Self {
            out,
            width,
            height,
            brightness: 100,
        }
    }

    fn dim(&self, color: Rgb) -> Rgb {
        let factor = self.brightness as f32 / 100.0;
        Rgb::new(
            scale_channel(color.r, factor),
            scale_channel(color.g, factor),
            scale_channel(color.b, factor),
        )
    }

    fn encode(&self, frame: &Frame) -> String {
        let mut screen = String::with_capacity((self.width * self.height * 20) as usize);
        // Cursor home, then redraw in place
        screen.push_str("\x1b[H");
        for y in (0..frame.height()).step_by(2) {
            for x in 0..frame.width() {
                let top = self.dim(frame.get(x, y).unwrap_or_default());
                let bottom = self.dim(frame.get(x, y + 1).unwrap_or_default());
                screen.push_str(&format!(
                    "\x1b[38;2;{};{};{}m\x1b[48;2;{};{};{}m\u{2580}",
                    top.r, top.g, top.b, bottom.r, bottom.g, bottom.b
                ));
            }
            screen.push_str("\x1b[0m\r\n");
        }
        screen
    }
}

impl<W: Write + Send> FrameSink for TerminalSink<W> {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn write_frame(&mut self, frame: &Frame) -> anyhow::Result<()> {
        let screen = self.encode(frame);
        self.out
            .write_all(screen.as_bytes())
            .context("Failed to write frame to terminal")?;
        self.out.flush().context("Failed to flush terminal")
    }

    fn set_brightness(&mut self, percent: u8) -> anyhow::Result<()> {
        self.brightness = percent.min(100);
        Ok(())
    }
}
