/// Display context - device dimensions every renderer draws into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayContext {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl DisplayContext {
    /// Create new display context
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels
    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// Total size in bytes for a packed RGB buffer
    pub fn buffer_size(&self) -> usize {
        self.pixel_count() * 3
    }

    /// Horizontal offset that centers content of the given width (may be negative)
    pub fn center_x(&self, content_width: u32) -> i32 {
        (self.width as i32 - content_width as i32) / 2
    }

    /// Vertical offset that centers content of the given height (may be negative)
    pub fn center_y(&self, content_height: u32) -> i32 {
        (self.height as i32 - content_height as i32) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_context_with_dimensions() {
        let ctx = DisplayContext::new(64, 32);
        assert_eq!(ctx.width, 64);
        assert_eq!(ctx.height, 32);
    }

    #[test]
    fn test_pixel_count_calculation() {
        let ctx = DisplayContext::new(64, 32);
        assert_eq!(ctx.pixel_count(), 2048);
    }

    #[test]
    fn test_buffer_size_rgb() {
        let ctx = DisplayContext::new(64, 32);
        // 64x32 pixels * 3 bytes per pixel
        assert_eq!(ctx.buffer_size(), 6144);
    }

    #[test]
    fn test_center_x() {
        let ctx = DisplayContext::new(64, 32);
        assert_eq!(ctx.center_x(12), 26);
        assert_eq!(ctx.center_x(64), 0);
        // Wider than the panel: left edge goes off-screen
        assert_eq!(ctx.center_x(80), -8);
    }

    #[test]
    fn test_center_y() {
        let ctx = DisplayContext::new(64, 32);
        assert_eq!(ctx.center_y(10), 11);
    }

    #[test]
    fn test_copy_semantics() {
        let ctx1 = DisplayContext::new(128, 64);
        let ctx2 = ctx1; // Copy, not move

        assert_eq!(ctx1, ctx2);
    }
}
