use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, trace, warn};

use crate::core::cancel::CancelToken;
use crate::core::frame::Frame;
use crate::core::profile::SharedProfile;
use crate::error::EngineError;
use crate::frame::FrameIterator;
use crate::traits::{FrameSink, FrameStep, RenderTask};

/// Hardware sink shared between the engine and the active render loop
pub type SharedSink = Arc<Mutex<Box<dyn FrameSink>>>;

/// Why a render loop returned
#[derive(Debug, Clone, PartialEq)]
pub enum LoopExit {
    /// The cancel token was observed
    Cancelled,
    /// The task ran out of frames
    EndOfStream,
    /// The task or the sink failed; only this loop ends
    Failed(EngineError),
}

/// Generic render loop: pull a frame from the task, push it, sleep, repeat
///
/// The cancel token is checked at the top of every iteration and the pacing
/// sleep wakes as soon as it is cancelled, so stop latency is bounded by one
/// `next_frame` call. The color profile is re-read every iteration and the
/// lock is released before the task runs.
pub struct RenderLoop {
    task: Box<dyn RenderTask>,
    sink: SharedSink,
    profile: SharedProfile,
    token: CancelToken,
    pushed: Arc<AtomicU64>,
}

impl RenderLoop {
    pub fn new(
        task: Box<dyn RenderTask>,
        sink: SharedSink,
        profile: SharedProfile,
        token: CancelToken,
    ) -> Self {
        Self {
            task,
            sink,
            profile,
            token,
            pushed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Count pushed frames into an external counter
    pub fn with_counter(mut self, pushed: Arc<AtomicU64>) -> Self {
        self.pushed = pushed;
        self
    }

    /// Run until cancelled, exhausted or failed
    ///
    /// The task is dropped before this returns, so any decoder it owns is
    /// released on every exit path.
    pub fn run(mut self) -> LoopExit {
        let kind = self.task.kind();
        info!("{kind} loop started");

        let mut frames = FrameIterator::new();
        let exit = self.drive(&mut frames);

        drop(self.task);
        match &exit {
            LoopExit::Failed(e) => warn!(
                "{kind} loop failed after {} iterations: {e}",
                frames.frame_number()
            ),
            other => info!(
                "{kind} loop exited ({other:?}) after {} iterations in {:.1?}",
                frames.frame_number(),
                frames.elapsed()
            ),
        }
        exit
    }

    fn drive(&mut self, frames: &mut FrameIterator) -> LoopExit {
        for tick in frames {
            if self.token.is_cancelled() {
                return LoopExit::Cancelled;
            }

            let profile = self.profile.get();
            let step = match self.task.next_frame(&profile) {
                Ok(step) => step,
                Err(e) if e.is_transient() => {
                    debug!("iteration {} dropped: {e}", tick.number);
                    continue;
                }
                Err(e) => return LoopExit::Failed(e),
            };

            match step {
                FrameStep::Show { frame, hold } => {
                    if let Err(e) = self.push(&frame) {
                        return LoopExit::Failed(e);
                    }
                    trace!("frame {} pushed, {:?} since last", tick.number, tick.delta);
                    if self.token.wait_timeout(hold) {
                        return LoopExit::Cancelled;
                    }
                }
                FrameStep::EndOfStream => return LoopExit::EndOfStream,
            }
        }
        LoopExit::Cancelled
    }

    fn push(&self, frame: &Frame) -> Result<(), EngineError> {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_frame(frame)
            .map_err(|e| EngineError::Sink(format!("{e:#}")))?;
        self.pushed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
