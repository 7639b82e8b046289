use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use matrix_engine::core::{DisplayContext, VideoTask};
use matrix_engine::loaders::{ffmpeg_available, FfmpegOptions, FfmpegVideoSource};
use matrix_engine::traits::{FrameStep, RenderTask, VideoLocation, VideoSource};
use matrix_engine::ColorProfile;

fn options() -> FfmpegOptions {
    FfmpegOptions {
        program: PathBuf::from("ffmpeg"),
        realtime: false,
        read_timeout: Duration::from_secs(5),
    }
}

/// Render a one second, 10 fps test pattern; `None` when ffmpeg is missing
fn test_clip(name: &str) -> Option<PathBuf> {
    if !ffmpeg_available(Path::new("ffmpeg")) {
        eprintln!("ffmpeg not installed, skipping");
        return None;
    }
    let path = std::env::temp_dir().join(format!("matrix-engine-{}-{name}.mp4", std::process::id()));
    let status = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error", "-f", "lavfi", "-i"])
        .arg("testsrc=size=64x32:rate=10")
        .args(["-t", "1", "-pix_fmt", "yuv420p"])
        .arg(&path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .ok()?;
    status.success().then_some(path)
}

// ============================================================================
// ffmpeg Source
// ============================================================================

#[test]
fn test_decodes_every_frame_then_ends() {
    let Some(path) = test_clip("frames") else {
        return;
    };
    let context = DisplayContext::new(32, 16);
    let mut source = FfmpegVideoSource::open(&VideoLocation::File(path), context, &options()).unwrap();

    let mut count = 0;
    while let Some(frame) = source.next_frame().unwrap() {
        assert_eq!((frame.width, frame.height), (32, 16));
        assert_eq!(frame.data.len(), context.buffer_size());
        count += 1;
    }
    // Container timing may add or drop a frame at the edges
    assert!((9..=11).contains(&count), "{count} frames");
    assert!(source.next_frame().unwrap().is_none());
}

#[test]
fn test_video_task_plays_once() {
    let Some(path) = test_clip("task") else {
        return;
    };
    let context = DisplayContext::new(32, 16);
    let source = FfmpegVideoSource::open(&VideoLocation::File(path), context, &options()).unwrap();
    let mut task = VideoTask::new(Box::new(source), "test clip", context);

    let profile = ColorProfile::default();
    let mut shown = 0;
    loop {
        match task.next_frame(&profile) {
            Ok(FrameStep::Show { frame, .. }) => {
                assert_eq!(frame.dimensions(), (32, 16));
                shown += 1;
            }
            Ok(FrameStep::EndOfStream) => break,
            Err(e) => assert!(e.is_transient(), "unexpected {e}"),
        }
    }
    assert!((9..=11).contains(&shown), "{shown} frames");
}

#[test]
fn test_unreadable_file_fails_on_open() {
    if !ffmpeg_available(Path::new("ffmpeg")) {
        return;
    }
    let path = std::env::temp_dir().join(format!("matrix-engine-{}-bad.mp4", std::process::id()));
    std::fs::write(&path, b"not a video").unwrap();

    let result = FfmpegVideoSource::open(&VideoLocation::File(path), DisplayContext::new(8, 8), &options());
    assert!(result.is_err());
}
