use anyhow::{anyhow, bail, Context, Result};
use log::{debug, warn};
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::core::display_context::DisplayContext;
use crate::error::FrameError;
use crate::traits::{PixelLayout, RawVideoFrame, VideoLocation, VideoSource};

/// Decoded frames buffered ahead of the render loop
const FRAME_QUEUE: usize = 2;

/// How the ffmpeg child is launched
#[derive(Debug, Clone)]
pub struct FfmpegOptions {
    pub program: PathBuf,
    /// Pace output at the native frame rate (`-re`)
    pub realtime: bool,
    pub read_timeout: Duration,
}

enum Chunk {
    Frame(Vec<u8>),
    End,
    Failed(String),
}

/// Streaming decoder backed by an ffmpeg child writing raw RGB24 to a pipe
///
/// ffmpeg scales to the device size itself. A reader thread cuts stdout into
/// whole frames so reads can time out; the child is killed on drop.
pub struct FfmpegVideoSource {
    child: Child,
    frames: Option<Receiver<Chunk>>,
    reader: Option<JoinHandle<()>>,
    stderr: Option<JoinHandle<()>>,
    context: DisplayContext,
    read_timeout: Duration,
    pending: Option<RawVideoFrame>,
    finished: bool,
}

impl FfmpegVideoSource {
    /// Spawn ffmpeg and wait for the first frame so bad sources fail here
    pub fn open(location: &VideoLocation, context: DisplayContext, options: &FfmpegOptions) -> Result<Self> {
        if let VideoLocation::File(path) = location {
            if !path.is_file() {
                bail!("Video file does not exist: {:?}", path);
            }
        }

        let mut child = spawn_ffmpeg(location, context, options)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("failed to capture ffmpeg stderr"))?;

        let last_error = Arc::new(Mutex::new(None));
        let stderr = spawn_stderr_worker(stderr, last_error.clone())?;
        let (sender, receiver) = mpsc::sync_channel(FRAME_QUEUE);
        let reader = spawn_stdout_worker(stdout, context.buffer_size(), sender)?;

        let mut source = Self {
            child,
            frames: Some(receiver),
            reader: Some(reader),
            stderr: Some(stderr),
            context,
            read_timeout: options.read_timeout,
            pending: None,
            finished: false,
        };

        match source.next_frame() {
            Ok(Some(frame)) => source.pending = Some(frame),
            // Slow network sources may take longer than one read to start
            Err(FrameError::Timeout) => debug!("{location}: no frame yet, continuing"),
            Ok(None) | Err(_) => {
                // Let the stderr worker record why ffmpeg gave up
                let _ = source.child.kill();
                let _ = source.child.wait();
                if let Some(handle) = source.stderr.take() {
                    let _ = handle.join();
                }
                let reason = last_error
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take()
                    .unwrap_or_else(|| "stream produced no frames".to_string());
                bail!("{reason}");
            }
        }

        debug!("{location}: ffmpeg decoder running");
        Ok(source)
    }

    fn raw(&self, data: Vec<u8>) -> RawVideoFrame {
        RawVideoFrame {
            width: self.context.width,
            height: self.context.height,
            layout: PixelLayout::Rgb24,
            data,
        }
    }
}

impl VideoSource for FfmpegVideoSource {
    fn next_frame(&mut self) -> Result<Option<RawVideoFrame>, FrameError> {
        if let Some(frame) = self.pending.take() {
            return Ok(Some(frame));
        }
        if self.finished {
            return Ok(None);
        }
        let Some(frames) = &self.frames else {
            return Ok(None);
        };

        match frames.recv_timeout(self.read_timeout) {
            Ok(Chunk::Frame(data)) => Ok(Some(self.raw(data))),
            Ok(Chunk::End) | Err(RecvTimeoutError::Disconnected) => {
                self.finished = true;
                Ok(None)
            }
            Ok(Chunk::Failed(reason)) => {
                self.finished = true;
                Err(FrameError::Decoder(reason))
            }
            Err(RecvTimeoutError::Timeout) => Err(FrameError::Timeout),
        }
    }
}

impl Drop for FfmpegVideoSource {
    fn drop(&mut self) {
        // Unblocks a reader stuck on a full queue
        self.frames.take();
        if let Err(e) = self.child.kill() {
            if e.kind() != ErrorKind::InvalidInput {
                warn!("failed to kill ffmpeg: {e}");
            }
        }
        let _ = self.child.wait();
        for handle in [self.reader.take(), self.stderr.take()].into_iter().flatten() {
            let _ = handle.join();
        }
        debug!("ffmpeg decoder released");
    }
}

fn spawn_ffmpeg(location: &VideoLocation, context: DisplayContext, options: &FfmpegOptions) -> Result<Child> {
    let mut command = Command::new(&options.program);
    command.args(["-hide_banner", "-loglevel", "error", "-nostdin"]);
    if options.realtime {
        command.arg("-re");
    }
    command.arg("-i");
    match location {
        VideoLocation::File(path) => command.arg(path),
        VideoLocation::Url(url) => command.arg(url),
    };
    command
        .args(["-an", "-sn", "-f", "rawvideo", "-pix_fmt", "rgb24"])
        .arg("-vf")
        .arg(format!("scale={}:{}", context.width, context.height))
        .arg("-")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    command.spawn().map_err(|error| {
        if error.kind() == ErrorKind::NotFound {
            anyhow!(
                "{} was not found. Install ffmpeg or set `ffmpeg` in the config",
                options.program.display()
            )
        } else {
            anyhow!("failed to spawn ffmpeg: {error}")
        }
    })
}

fn spawn_stdout_worker(
    mut stdout: ChildStdout,
    frame_size: usize,
    sender: SyncSender<Chunk>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("ffmpeg-stdout".into())
        .spawn(move || loop {
            let mut buffer = vec![0u8; frame_size];
            let chunk = match stdout.read_exact(&mut buffer) {
                Ok(()) => Chunk::Frame(buffer),
                // A trailing partial frame is dropped
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => Chunk::End,
                Err(e) => Chunk::Failed(format!("ffmpeg pipe read failed: {e}")),
            };
            let last = !matches!(chunk, Chunk::Frame(_));
            if sender.send(chunk).is_err() || last {
                break;
            }
        })
        .context("failed to start ffmpeg reader thread")
}

fn spawn_stderr_worker(stderr: ChildStderr, last_error: Arc<Mutex<Option<String>>>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("ffmpeg-stderr".into())
        .spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(|line| line.ok()) {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                warn!("ffmpeg: {line}");
                *last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(line);
            }
        })
        .context("failed to start ffmpeg stderr thread")
}

/// True when `program` can be launched at all
pub fn ffmpeg_available(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
