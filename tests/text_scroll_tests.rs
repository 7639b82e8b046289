use std::time::Duration;

use matrix_engine::core::{DisplayContext, Glyphs, TextTask};
use matrix_engine::traits::{FrameStep, RenderTask};
use matrix_engine::{ColorProfile, Rgb};

fn scrolling(content: &str) -> TextTask {
    TextTask::new(
        content,
        Rgb::WHITE,
        Glyphs::by_name("6x10").unwrap(),
        DisplayContext::new(64, 32),
        true,
        1.0,
        Duration::from_millis(50),
    )
}

/// Draw positions of the next `count` frames
fn positions(task: &mut TextTask, count: usize) -> Vec<i32> {
    let profile = ColorProfile::default();
    (0..count)
        .map(|_| {
            let position = task.position();
            task.next_frame(&profile).unwrap();
            position
        })
        .collect()
}

// ============================================================================
// Scroll Wrap
// ============================================================================

#[test]
fn test_scroll_wraps_after_leaving_left_edge() {
    let mut task = scrolling("HI");
    assert_eq!(task.text_width(), 12);

    let seen = positions(&mut task, 78);
    let expected: Vec<i32> = (-12..=64).rev().chain(std::iter::once(64)).collect();
    assert_eq!(seen, expected);
}

#[test]
fn test_scroll_cycle_repeats() {
    let mut task = scrolling("HI");
    let first = positions(&mut task, 77);
    let second = positions(&mut task, 77);
    assert_eq!(first, second);
}

#[test]
fn test_text_visible_mid_scroll() {
    let mut task = scrolling("HI");
    let profile = ColorProfile::default();
    positions(&mut task, 30);
    match task.next_frame(&profile).unwrap() {
        FrameStep::Show { frame, hold } => {
            assert!(!frame.is_blank());
            assert_eq!(hold, Duration::from_millis(50));
        }
        other => panic!("expected a frame, got {other:?}"),
    }
}

#[test]
fn test_long_text_wraps_at_its_own_width() {
    let mut task = scrolling("A MUCH LONGER MESSAGE");
    let width = task.text_width();
    assert!(width > 64);

    let seen = positions(&mut task, (64 + width + 2) as usize);
    let last_on_screen = seen.iter().position(|&p| p == -width).unwrap();
    assert_eq!(seen[last_on_screen + 1], 64);
}
