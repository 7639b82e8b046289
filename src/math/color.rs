use crate::core::frame::Frame;
use crate::types::{ColorProfile, Rgb};

/// Scale one channel intensity, clamping into [0, 255]
pub fn scale_channel(value: u8, factor: f32) -> u8 {
    (value as f32 * factor).clamp(0.0, 255.0) as u8
}

/// Apply a color profile to one pixel: scale each channel, then reorder
pub fn transform(pixel: Rgb, profile: &ColorProfile) -> Rgb {
    let factors = profile.factors();
    let scaled = [
        scale_channel(pixel.r, factors[0]),
        scale_channel(pixel.g, factors[1]),
        scale_channel(pixel.b, factors[2]),
    ];
    let [a, b, c] = profile.channel_order().source_indices();
    Rgb::new(scaled[a], scaled[b], scaled[c])
}

/// Apply a color profile to every pixel in place
pub fn transform_pixels(pixels: &mut [Rgb], profile: &ColorProfile) {
    if profile.is_identity() {
        return;
    }
    for pixel in pixels {
        *pixel = transform(*pixel, profile);
    }
}

/// Return a transformed copy of a frame
pub fn transform_frame(frame: &Frame, profile: &ColorProfile) -> Frame {
    let mut out = frame.clone();
    transform_pixels(out.pixels_mut(), profile);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelOrder;

    #[test]
    fn test_identity_profile_leaves_pixel() {
        let pixel = Rgb::new(12, 34, 56);
        assert_eq!(transform(pixel, &ColorProfile::default()), pixel);
    }

    #[test]
    fn test_each_channel_order() {
        let pixel = Rgb::new(1, 2, 3);
        let expect = [
            (ChannelOrder::Rgb, Rgb::new(1, 2, 3)),
            (ChannelOrder::Grb, Rgb::new(2, 1, 3)),
            (ChannelOrder::Rbg, Rgb::new(1, 3, 2)),
            (ChannelOrder::Brg, Rgb::new(3, 1, 2)),
            (ChannelOrder::Bgr, Rgb::new(3, 2, 1)),
        ];
        for (order, expected) in expect {
            let profile = ColorProfile::default().with_channel_order(order);
            assert_eq!(transform(pixel, &profile), expected, "{order}");
        }
    }

    #[test]
    fn test_scale_happens_before_reorder() {
        // Red halved, then moved into the green slot
        let profile = ColorProfile::new([0.5, 1.0, 1.0], ChannelOrder::Grb);
        assert_eq!(transform(Rgb::new(200, 10, 0), &profile), Rgb::new(10, 100, 0));
    }

    #[test]
    fn test_scale_truncates() {
        assert_eq!(scale_channel(255, 0.5), 127);
        assert_eq!(scale_channel(3, 0.3), 0);
        assert_eq!(scale_channel(255, 1.0), 255);
    }

    #[test]
    fn test_transform_frame_leaves_source() {
        let frame = Frame::filled(2, 2, Rgb::new(100, 0, 0));
        let profile = ColorProfile::default().with_channel_order(ChannelOrder::Bgr);
        let out = transform_frame(&frame, &profile);
        assert_eq!(frame.pixels()[0], Rgb::new(100, 0, 0));
        assert!(out.pixels().iter().all(|p| *p == Rgb::new(0, 0, 100)));
    }
}
