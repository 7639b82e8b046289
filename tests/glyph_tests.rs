use std::path::{Path, PathBuf};
use std::time::Duration;

use matrix_engine::core::{DisplayContext, Frame, Glyphs, TextTask};
use matrix_engine::traits::{FrameStep, RenderTask};
use matrix_engine::{ColorProfile, EngineConfig, Rgb, TextConfig};

const LATIN_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
];

const CJK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
];

/// First installed font from `candidates`; `None` skips the test
fn system_font(candidates: &[&str]) -> Option<PathBuf> {
    let found = candidates.iter().map(PathBuf::from).find(|p| p.is_file());
    if found.is_none() {
        eprintln!("no suitable system font installed, skipping");
    }
    found
}

fn render(glyphs: &Glyphs, text: &str) -> Frame {
    let mut frame = Frame::new(64, 32);
    glyphs.draw(&mut frame, text, 0, 8, Rgb::WHITE);
    frame
}

// ============================================================================
// Built-in Fonts
// ============================================================================

#[test]
fn test_builtin_font_renders_accented_text() {
    let glyphs = Glyphs::by_name("6x10").unwrap();
    assert_ne!(render(&glyphs, "café"), render(&glyphs, "caf?"));
    assert_ne!(render(&glyphs, "naïve"), render(&glyphs, "na?ve"));
}

// ============================================================================
// Font Files
// ============================================================================

#[test]
fn test_font_file_renders_non_latin_text() {
    let Some(path) = system_font(LATIN_FONTS) else {
        return;
    };
    let glyphs = Glyphs::load(&path, 10.0).unwrap();

    let cyrillic = render(&glyphs, "Привет");
    assert!(!cyrillic.is_blank());
    assert_ne!(cyrillic, render(&glyphs, "??????"));
    assert_ne!(render(&glyphs, "café"), render(&glyphs, "caf?"));
}

#[test]
fn test_font_file_renders_cjk_text() {
    let Some(path) = system_font(CJK_FONTS) else {
        return;
    };
    let glyphs = Glyphs::load(&path, 12.0).unwrap();

    let hello = render(&glyphs, "你好");
    assert!(!hello.is_blank());
    assert_ne!(hello, render(&glyphs, "??"));
}

#[test]
fn test_font_file_metrics_follow_pixel_size() {
    let Some(path) = system_font(LATIN_FONTS) else {
        return;
    };
    let small = Glyphs::load(&path, 8.0).unwrap();
    let large = Glyphs::load(&path, 16.0).unwrap();

    assert!(large.line_height() > small.line_height());
    assert!(large.measure("HELLO") > small.measure("HELLO"));
    assert_eq!(small.measure(""), 0);
}

#[test]
fn test_font_file_drawn_in_request_color() {
    let Some(path) = system_font(LATIN_FONTS) else {
        return;
    };
    let glyphs = Glyphs::load(&path, 12.0).unwrap();
    let mut frame = Frame::new(64, 32);
    glyphs.draw(&mut frame, "H", 0, 0, Rgb::new(0, 200, 0));

    // Anti-aliased edges are dimmer shades of the same color
    assert!(frame.pixels().iter().any(|p| p.g > 150));
    assert!(frame.pixels().iter().all(|p| p.r == 0 && p.b == 0));
}

// ============================================================================
// Requests
// ============================================================================

#[test]
fn test_text_request_resolves_font_from_font_dir() {
    let Some(path) = system_font(LATIN_FONTS) else {
        return;
    };
    let dir = path.parent().unwrap_or(Path::new("/"));
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    let config = EngineConfig {
        font_dir: dir.to_path_buf(),
        ..EngineConfig::default()
    };

    let glyphs = TextConfig::new("Grüße").font(&name).validate(&config).unwrap();
    assert_eq!(glyphs.name(), path.display().to_string());

    let mut task = TextTask::new(
        "Grüße",
        Rgb::WHITE,
        glyphs,
        DisplayContext::new(64, 32),
        false,
        1.0,
        Duration::from_millis(50),
    );
    match task.next_frame(&ColorProfile::default()).unwrap() {
        FrameStep::Show { frame, .. } => assert!(!frame.is_blank()),
        other => panic!("expected a frame, got {other:?}"),
    }
}
