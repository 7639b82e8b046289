use crate::core::frame::Frame;

/// Hardware sink - accepts one fully composed frame at a time
///
/// Only the active render loop writes frames; control operations
/// (brightness, clear) are serialized with it through the engine's sink lock.
pub trait FrameSink: Send {
    /// Device dimensions in pixels (width, height)
    fn dimensions(&self) -> (u32, u32);

    /// Push a frame to the device
    fn write_frame(&mut self, frame: &Frame) -> anyhow::Result<()>;

    /// Set global brightness in percent (0-100)
    fn set_brightness(&mut self, _percent: u8) -> anyhow::Result<()> {
        Ok(())
    }

    /// Blank the device
    fn clear(&mut self) -> anyhow::Result<()> {
        let (width, height) = self.dimensions();
        self.write_frame(&Frame::new(width, height))
    }
}
