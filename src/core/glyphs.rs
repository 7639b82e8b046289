use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use embedded_graphics::mono_font::{iso_8859_1, MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::renderer::TextRenderer;
use embedded_graphics::text::{Baseline, Text};
use fontdue::{Font, FontSettings, Metrics};

use crate::core::frame::Frame;
use crate::error::EngineError;
use crate::types::Rgb;

pub const DEFAULT_FONT: &str = "6x10";

/// Font files rasterized with fontdue instead of a built-in bitmap face
const OUTLINE_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

// Latin-1 faces; characters outside the set draw as '?'
const FONTS: &[(&str, &MonoFont<'static>)] = &[
    ("4x6", &iso_8859_1::FONT_4X6),
    ("5x7", &iso_8859_1::FONT_5X7),
    ("5x8", &iso_8859_1::FONT_5X8),
    ("6x9", &iso_8859_1::FONT_6X9),
    ("6x10", &iso_8859_1::FONT_6X10),
    ("6x12", &iso_8859_1::FONT_6X12),
    ("6x13", &iso_8859_1::FONT_6X13),
    ("7x13", &iso_8859_1::FONT_7X13),
    ("7x14", &iso_8859_1::FONT_7X14),
    ("8x13", &iso_8859_1::FONT_8X13),
    ("9x15", &iso_8859_1::FONT_9X15),
    ("9x18", &iso_8859_1::FONT_9X18),
    ("10x20", &iso_8859_1::FONT_10X20),
];

/// Names of the built-in bitmap fonts
pub fn font_names() -> impl Iterator<Item = &'static str> {
    FONTS.iter().map(|(name, _)| *name)
}

/// True when `name` refers to a font file rather than a built-in face
pub fn is_font_file(name: &str) -> bool {
    Path::new(name.trim())
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| OUTLINE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}

struct Raster {
    metrics: Metrics,
    coverage: Vec<u8>,
}

/// TrueType/OpenType face at a fixed pixel size, with a per-character raster cache
struct Outline {
    font: Font,
    px: f32,
    ascent: i32,
    line_height: u32,
    cache: Mutex<HashMap<char, Arc<Raster>>>,
}

impl Outline {
    fn load(path: &Path, px: f32) -> Result<Self, EngineError> {
        let bytes = fs::read(path)
            .map_err(|e| EngineError::invalid(format!("cannot read font {}: {e}", path.display())))?;
        let settings = FontSettings {
            scale: px,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(bytes, settings)
            .map_err(|e| EngineError::invalid(format!("cannot parse font {}: {e}", path.display())))?;

        let (ascent, descent) = font
            .horizontal_line_metrics(px)
            .map(|line| (line.ascent, line.descent))
            .unwrap_or((px, 0.0));

        Ok(Self {
            font,
            px,
            ascent: ascent.round() as i32,
            line_height: (ascent - descent).ceil().max(1.0) as u32,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn raster(&self, c: char) -> Arc<Raster> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(c)
            .or_insert_with(|| {
                let (metrics, coverage) = self.font.rasterize(c, self.px);
                Arc::new(Raster { metrics, coverage })
            })
            .clone()
    }

    fn measure(&self, text: &str) -> u32 {
        let width: f32 = text
            .chars()
            .map(|c| self.font.metrics(c, self.px).advance_width)
            .sum();
        width.ceil().max(0.0) as u32
    }

    fn draw(&self, frame: &mut Frame, text: &str, x: i32, y: i32, color: Rgb) {
        let baseline = y + self.ascent;
        let mut pen = x as f32;
        for c in text.chars() {
            let glyph = self.raster(c);
            let metrics = &glyph.metrics;
            if metrics.width > 0 {
                let left = pen.round() as i32 + metrics.xmin;
                let top = baseline - metrics.height as i32 - metrics.ymin;
                for (row, line) in glyph.coverage.chunks(metrics.width).enumerate() {
                    for (col, &coverage) in line.iter().enumerate() {
                        blend(frame, left + col as i32, top + row as i32, color, coverage);
                    }
                }
            }
            pen += metrics.advance_width;
        }
    }
}

/// Mix `color` over the existing pixel by glyph coverage
fn blend(frame: &mut Frame, x: i32, y: i32, color: Rgb, coverage: u8) {
    if coverage == 0 || x < 0 || y < 0 {
        return;
    }
    let Some(under) = frame.get(x as u32, y as u32) else {
        return;
    };
    let alpha = coverage as u32;
    let mix = |under: u8, over: u8| ((under as u32 * (255 - alpha) + over as u32 * alpha + 127) / 255) as u8;
    frame.set(x, y, Rgb::new(mix(under.r, color.r), mix(under.g, color.g), mix(under.b, color.b)));
}

#[derive(Clone)]
enum Face {
    Bitmap(&'static MonoFont<'static>),
    Outline(Arc<Outline>),
}

/// Font used by the text and clock renderers
///
/// Either one of the built-in Latin-1 bitmap faces, looked up by name, or a
/// font file rasterized at a fixed pixel size. Clones share the glyph cache.
#[derive(Clone)]
pub struct Glyphs {
    name: String,
    face: Face,
}

impl Glyphs {
    /// Look up a built-in font by name (e.g. "6x10")
    pub fn by_name(name: &str) -> Result<Self, EngineError> {
        FONTS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
            .map(|&(name, font)| Glyphs {
                name: name.to_string(),
                face: Face::Bitmap(font),
            })
            .ok_or_else(|| {
                EngineError::invalid(format!(
                    "unknown font {name:?}; available: {}, or a .ttf/.otf file",
                    font_names().collect::<Vec<_>>().join(", ")
                ))
            })
    }

    /// Load a font file rendered at `px` pixels per em
    pub fn load(path: impl AsRef<Path>, px: f32) -> Result<Self, EngineError> {
        let path = path.as_ref();
        if !px.is_finite() || px <= 0.0 {
            return Err(EngineError::invalid(format!("font size must be positive, got {px}")));
        }
        let outline = Outline::load(path, px)?;
        Ok(Glyphs {
            name: path.display().to_string(),
            face: Face::Outline(Arc::new(outline)),
        })
    }

    /// Resolve a request's font name
    ///
    /// File names are looked up in `font_dir` first, then as given.
    pub fn resolve(name: &str, font_dir: &Path, px: f32) -> Result<Self, EngineError> {
        let name = name.trim();
        if !is_font_file(name) {
            return Self::by_name(name);
        }
        let in_dir = font_dir.join(name);
        let path = if in_dir.is_file() {
            in_dir
        } else {
            PathBuf::from(name)
        };
        Self::load(path, px)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line_height(&self) -> u32 {
        match &self.face {
            Face::Bitmap(font) => font.character_size.height,
            Face::Outline(outline) => outline.line_height,
        }
    }

    /// Rendered width of `text` in pixels
    pub fn measure(&self, text: &str) -> u32 {
        match &self.face {
            Face::Bitmap(font) => MonoTextStyle::new(font, Rgb888::WHITE)
                .measure_string(text, Point::zero(), Baseline::Top)
                .bounding_box
                .size
                .width,
            Face::Outline(outline) => outline.measure(text),
        }
    }

    /// Draw `text` with its top-left corner at (x, y)
    pub fn draw(&self, frame: &mut Frame, text: &str, x: i32, y: i32, color: Rgb) {
        match &self.face {
            Face::Bitmap(font) => {
                let style = MonoTextStyle::new(font, Rgb888::new(color.r, color.g, color.b));
                // Frame's DrawTarget is infallible
                let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(frame);
            }
            Face::Outline(outline) => outline.draw(frame, text, x, y, color),
        }
    }
}

impl std::fmt::Debug for Glyphs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.face {
            Face::Bitmap(_) => "bitmap",
            Face::Outline(_) => "outline",
        };
        f.debug_struct("Glyphs")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(glyphs: &Glyphs, text: &str) -> Frame {
        let mut frame = Frame::new(64, 32);
        glyphs.draw(&mut frame, text, 0, 0, Rgb::WHITE);
        frame
    }

    #[test]
    fn test_default_font_exists() {
        let glyphs = Glyphs::by_name(DEFAULT_FONT).unwrap();
        assert_eq!(glyphs.name(), "6x10");
        assert_eq!(glyphs.line_height(), 10);
    }

    #[test]
    fn test_unknown_font_is_invalid_input() {
        let err = Glyphs::by_name("comic-sans").unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_measure_monospace() {
        let glyphs = Glyphs::by_name("6x10").unwrap();
        assert_eq!(glyphs.measure("HI"), 12);
        assert_eq!(glyphs.measure(""), 0);
    }

    #[test]
    fn test_draw_marks_pixels_in_color() {
        let glyphs = Glyphs::by_name("6x10").unwrap();
        let mut frame = Frame::new(64, 32);
        glyphs.draw(&mut frame, "X", 0, 0, Rgb::RED);
        assert!(!frame.is_blank());
        assert!(frame.pixels().iter().all(|p| *p == Rgb::BLACK || *p == Rgb::RED));
    }

    #[test]
    fn test_draw_off_screen_is_harmless() {
        let glyphs = Glyphs::by_name("6x10").unwrap();
        let mut frame = Frame::new(64, 32);
        glyphs.draw(&mut frame, "HELLO", -100, 0, Rgb::RED);
        glyphs.draw(&mut frame, "HELLO", 64, 0, Rgb::RED);
        assert!(frame.is_blank());
    }

    #[test]
    fn test_builtin_fonts_draw_latin1_accents() {
        let glyphs = Glyphs::by_name("6x10").unwrap();
        assert_ne!(render(&glyphs, "café"), render(&glyphs, "caf?"));
        assert_ne!(render(&glyphs, "Ä"), render(&glyphs, "A"));
        assert_eq!(glyphs.measure("café"), 24);
    }

    #[test]
    fn test_font_file_names_detected() {
        assert!(is_font_file("DejaVuSans.ttf"));
        assert!(is_font_file("./fonts/Noto.OTF"));
        assert!(!is_font_file("6x10"));
        assert!(!is_font_file("picture.png"));
    }

    #[test]
    fn test_missing_font_file_is_invalid_input() {
        let err = Glyphs::resolve("no-such-font.ttf", Path::new("/nonexistent"), 10.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_garbage_font_file_is_invalid_input() {
        let path = std::env::temp_dir().join(format!("matrix-engine-{}-garbage.ttf", std::process::id()));
        fs::write(&path, b"not a font").unwrap();
        assert!(matches!(Glyphs::load(&path, 10.0), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_blend_scales_by_coverage() {
        let mut frame = Frame::new(1, 1);
        blend(&mut frame, 0, 0, Rgb::new(200, 100, 0), 128);
        assert_eq!(frame.pixels()[0], Rgb::new(100, 50, 0));
        blend(&mut frame, 0, 0, Rgb::WHITE, 255);
        assert_eq!(frame.pixels()[0], Rgb::WHITE);
        blend(&mut frame, -1, 0, Rgb::BLACK, 255);
        assert_eq!(frame.pixels()[0], Rgb::WHITE);
    }
}
