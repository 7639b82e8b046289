use anyhow::{bail, Context, Result};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat, ImageReader, RgbImage, RgbaImage};
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::core::display_context::DisplayContext;
use crate::core::frame::Frame;
use crate::traits::ImageFrame;

/// Decodes a still or animated image into device-sized frames
///
/// GIFs yield one frame per animation frame with its own delay; a zero delay
/// takes `default_duration`. Every other format yields a single frame.
pub fn decode_image(
    path: impl AsRef<Path>,
    context: DisplayContext,
    default_duration: Duration,
) -> Result<Vec<ImageFrame>> {
    let path = path.as_ref();
    let reader = ImageReader::open(path)
        .with_context(|| format!("Failed to open image: {:?}", path))?
        .with_guessed_format()
        .with_context(|| format!("Failed to read image: {:?}", path))?;

    let frames = if reader.format() == Some(ImageFormat::Gif) {
        decode_animation(path, context, default_duration)?
    } else {
        let image = reader
            .decode()
            .with_context(|| format!("Failed to decode image: {:?}", path))?;
        vec![ImageFrame {
            frame: fit(&image.to_rgb8(), context),
            duration: default_duration,
        }]
    };

    if frames.is_empty() {
        bail!("Image has no frames: {:?}", path);
    }
    debug!("decoded {} frame(s) from {:?}", frames.len(), path);
    Ok(frames)
}

fn decode_animation(
    path: &Path,
    context: DisplayContext,
    default_duration: Duration,
) -> Result<Vec<ImageFrame>> {
    let file = File::open(path).with_context(|| format!("Failed to open image: {:?}", path))?;
    let decoder = GifDecoder::new(BufReader::new(file))
        .with_context(|| format!("Failed to read GIF header: {:?}", path))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .with_context(|| format!("Failed to decode GIF frames: {:?}", path))?;

    Ok(frames
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let millis = if denom == 0 { 0 } else { numer / denom };
            let duration = if millis == 0 {
                default_duration
            } else {
                Duration::from_millis(millis as u64)
            };
            ImageFrame {
                frame: fit(&flatten(frame.buffer()), context),
                duration,
            }
        })
        .collect())
}

/// Composite over black; the panel has no notion of transparency
fn flatten(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| ((c as u16 * a as u16) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

fn fit(image: &RgbImage, context: DisplayContext) -> Frame {
    Frame::from_image(image).resized(context.width, context.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_premultiplies_alpha() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, image::Rgba([200, 100, 50, 255]));
        rgba.put_pixel(1, 0, image::Rgba([200, 100, 50, 0]));
        let rgb = flatten(&rgba);
        assert_eq!(rgb.get_pixel(0, 0).0, [200, 100, 50]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_missing_file_fails() {
        let result = decode_image(
            "/no/such/image.png",
            DisplayContext::new(8, 8),
            Duration::from_millis(100),
        );
        assert!(result.is_err());
    }
}
