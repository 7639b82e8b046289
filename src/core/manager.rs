use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::{ClockConfig, EngineConfig, TextConfig};
use crate::core::cancel::CancelToken;
use crate::core::clock::{LocalClock, SntpClock};
use crate::core::clock_task::ClockTask;
use crate::core::display_context::DisplayContext;
use crate::core::driver::{LoopExit, RenderLoop, SharedSink};
use crate::core::image_task::ImageTask;
use crate::core::profile::SharedProfile;
use crate::core::text_task::TextTask;
use crate::core::video_task::VideoTask;
use crate::error::EngineError;
use crate::loaders::FileMediaProvider;
use crate::traits::{resolve_media_path, FrameSink, MediaProvider, RenderTask, TimeSource, VideoLocation};
use crate::types::{ChannelOrder, ColorProfile, RenderKind, TaskParams};

/// Identifier of one started renderer, unique per manager
pub type RendererId = u64;

/// Lifecycle manager as seen by a control surface
pub type Engine = RendererManager;

/// Externally visible lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Idle,
    Running,
    /// A stop is in progress
    Stopping,
}

/// Point-in-time view of the engine, cheap to take and serializable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub state: EngineState,
    pub active: Option<RenderKind>,
    pub params: Option<TaskParams>,
    pub renderer_id: Option<RendererId>,
    pub color_profile: ColorProfile,
    pub brightness: u8,
    /// Frames pushed by the current (or last) renderer
    pub frames_pushed: u64,
    pub last_error: Option<String>,
}

/// Everything a task constructor may need, handed over after the old renderer has joined
pub struct BuildContext<'a> {
    pub display: DisplayContext,
    pub config: &'a EngineConfig,
    /// Profile in effect when the task is built
    pub profile: ColorProfile,
    pub media: &'a dyn MediaProvider,
    pub local_time: Arc<dyn TimeSource>,
    pub network_time: Arc<dyn TimeSource>,
}

type BuildFn = Box<dyn FnOnce(&BuildContext<'_>) -> Result<Box<dyn RenderTask>, EngineError> + Send>;

/// A validated request: its reported parameters plus a deferred constructor
///
/// The constructor runs only after the previous renderer is gone, so opening
/// files or decoders never overlaps with the outgoing loop.
pub struct PendingTask {
    params: TaskParams,
    build: BuildFn,
}

impl PendingTask {
    pub fn new<F>(params: TaskParams, build: F) -> Self
    where
        F: FnOnce(&BuildContext<'_>) -> Result<Box<dyn RenderTask>, EngineError> + Send + 'static,
    {
        Self {
            params,
            build: Box::new(build),
        }
    }

    pub fn params(&self) -> &TaskParams {
        &self.params
    }
}

impl std::fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTask").field("params", &self.params).finish()
    }
}

struct RendererHandle {
    id: RendererId,
    kind: RenderKind,
    token: CancelToken,
    thread: JoinHandle<()>,
}

#[derive(Debug)]
struct StatusBoard {
    state: EngineState,
    params: Option<TaskParams>,
    renderer_id: Option<RendererId>,
    brightness: u8,
    last_error: Option<String>,
}

impl StatusBoard {
    fn set_idle(&mut self) {
        self.state = EngineState::Idle;
        self.params = None;
        self.renderer_id = None;
    }
}

/// Decrements the live renderer count when the render thread finishes
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn enter(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(live.clone())
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the single active renderer and the shared color profile
///
/// `replace` and `stop` block until the outgoing render thread has joined, so
/// at most one renderer thread exists at any time. Control calls are
/// serialized through the handle lock; `status` only touches the status
/// board and never waits on a stop.
pub struct RendererManager {
    display: DisplayContext,
    config: EngineConfig,
    sink: SharedSink,
    profile: SharedProfile,
    media: Arc<dyn MediaProvider>,
    local_time: Arc<dyn TimeSource>,
    network_time: Arc<dyn TimeSource>,
    current: Mutex<Option<RendererHandle>>,
    board: Arc<Mutex<StatusBoard>>,
    frames_pushed: Arc<AtomicU64>,
    live: Arc<AtomicUsize>,
    next_id: AtomicU64,
}

/// Builder for `RendererManager`; collaborators default to the file/ffmpeg
/// media provider, the system clock and SNTP
pub struct EngineBuilder {
    sink: Box<dyn FrameSink>,
    config: EngineConfig,
    media: Option<Arc<dyn MediaProvider>>,
    local_time: Option<Arc<dyn TimeSource>>,
    network_time: Option<Arc<dyn TimeSource>>,
}

impl EngineBuilder {
    pub fn media(mut self, media: Arc<dyn MediaProvider>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn local_time(mut self, source: Arc<dyn TimeSource>) -> Self {
        self.local_time = Some(source);
        self
    }

    pub fn network_time(mut self, source: Arc<dyn TimeSource>) -> Self {
        self.network_time = Some(source);
        self
    }

    /// Validate the config and apply its default brightness to the sink
    pub fn build(self) -> Result<RendererManager, EngineError> {
        let config = self.config;
        config.validate()?;

        let mut sink = self.sink;
        let (width, height) = sink.dimensions();
        if width == 0 || height == 0 {
            return Err(EngineError::invalid("sink reports a zero-sized panel"));
        }
        sink.set_brightness(config.brightness)
            .map_err(|e| EngineError::Sink(format!("{e:#}")))?;

        let media = self
            .media
            .unwrap_or_else(|| Arc::new(FileMediaProvider::from_config(&config)));
        let local_time = self.local_time.unwrap_or_else(|| Arc::new(LocalClock));
        let network_time = self.network_time.unwrap_or_else(|| {
            Arc::new(
                SntpClock::new(config.ntp_server.clone(), config.ntp_timeout(), config.ntp_resync())
                    .with_retry_backoff(config.ntp_retry()),
            )
        });

        info!("display engine ready: {width}x{height}, brightness {}%", config.brightness);
        Ok(RendererManager {
            display: DisplayContext::new(width, height),
            sink: Arc::new(Mutex::new(sink)),
            profile: SharedProfile::new(config.profile()),
            board: Arc::new(Mutex::new(StatusBoard {
                state: EngineState::Idle,
                params: None,
                renderer_id: None,
                brightness: config.brightness,
                last_error: None,
            })),
            config,
            media,
            local_time,
            network_time,
            current: Mutex::new(None),
            frames_pushed: Arc::new(AtomicU64::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(0),
        })
    }
}

impl RendererManager {
    pub fn builder(sink: Box<dyn FrameSink>, config: EngineConfig) -> EngineBuilder {
        EngineBuilder {
            sink,
            config,
            media: None,
            local_time: None,
            network_time: None,
        }
    }

    /// Engine with default collaborators
    pub fn new(sink: Box<dyn FrameSink>, config: EngineConfig) -> Result<Self, EngineError> {
        Self::builder(sink, config).build()
    }

    pub fn display(&self) -> DisplayContext {
        self.display
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // === Lifecycle ===

    /// Stop the current renderer (joining its thread), then start `next`
    ///
    /// `None` only stops. If the new task cannot be built the engine is left
    /// idle and the error is both returned and recorded in the status.
    pub fn replace(&self, next: Option<PendingTask>) -> Result<Option<RendererId>, EngineError> {
        let mut current = lock(&self.current);
        if let Some(handle) = current.take() {
            self.join(handle);
        }

        let Some(PendingTask { params, build }) = next else {
            return Ok(None);
        };
        let kind = params.kind();

        let context = BuildContext {
            display: self.display,
            config: &self.config,
            profile: self.profile.get(),
            media: self.media.as_ref(),
            local_time: self.local_time.clone(),
            network_time: self.network_time.clone(),
        };
        let task = match build(&context) {
            Ok(task) => task,
            Err(e) => {
                warn!("{kind} renderer not started: {e}");
                lock(&self.board).last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancelToken::new();
        self.frames_pushed.store(0, Ordering::SeqCst);
        {
            let mut board = lock(&self.board);
            board.state = EngineState::Running;
            board.params = Some(params);
            board.renderer_id = Some(id);
            board.last_error = None;
        }

        let render = RenderLoop::new(task, self.sink.clone(), self.profile.clone(), token.clone())
            .with_counter(self.frames_pushed.clone());
        let board = self.board.clone();
        let live = LiveGuard::enter(&self.live);

        let spawned = thread::Builder::new()
            .name(format!("render-{kind}"))
            .spawn(move || {
                let _live = live;
                let exit = render.run();
                finish(&board, id, exit);
            });

        match spawned {
            Ok(thread) => {
                debug!("started {kind} renderer {id}");
                *current = Some(RendererHandle {
                    id,
                    kind,
                    token,
                    thread,
                });
                Ok(Some(id))
            }
            Err(e) => {
                let e = EngineError::resource("render thread", e);
                let mut board = lock(&self.board);
                board.set_idle();
                board.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Synchronous stop; no-op when idle
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.current).take() {
            self.join(handle);
        }
    }

    fn join(&self, handle: RendererHandle) {
        let RendererHandle {
            id,
            kind,
            token,
            thread,
        } = handle;

        {
            let mut board = lock(&self.board);
            if board.renderer_id == Some(id) {
                board.state = EngineState::Stopping;
            }
        }
        token.cancel();
        debug!("waiting for {kind} renderer {id} to stop");
        if thread.join().is_err() {
            error!("{kind} renderer {id} panicked");
        }

        let mut board = lock(&self.board);
        if board.renderer_id == Some(id) {
            board.set_idle();
        }
        debug!("{kind} renderer {id} joined");
    }

    // === Content ===

    pub fn show_text(&self, request: TextConfig) -> Result<Option<RendererId>, EngineError> {
        let glyphs = request.validate(&self.config)?;
        let params = TaskParams::Text {
            content: request.content.clone(),
            color: request.color,
            speed: request.speed,
            scroll: request.scroll,
            font: glyphs.name().to_string(),
        };

        self.replace(Some(PendingTask::new(params, move |ctx| {
            let task = TextTask::new(
                request.content,
                request.color,
                glyphs,
                ctx.display,
                request.scroll,
                request.speed,
                ctx.config.text_interval(),
            );
            Ok(Box::new(task) as Box<dyn RenderTask>)
        })))
    }

    pub fn show_clock(&self, request: ClockConfig) -> Result<Option<RendererId>, EngineError> {
        let glyphs = request.validate(&self.config)?;
        let params = TaskParams::Clock {
            color: request.color,
            format: request.format.clone(),
            use_network_time: request.use_network_time,
            font: glyphs.name().to_string(),
        };

        self.replace(Some(PendingTask::new(params, move |ctx| {
            let mut task = ClockTask::new(
                request.color,
                request.format,
                glyphs,
                ctx.display,
                ctx.local_time.clone(),
                ctx.config.clock_interval(),
            );
            if request.use_network_time {
                task = task.with_network_time(ctx.network_time.clone());
            }
            Ok(Box::new(task) as Box<dyn RenderTask>)
        })))
    }

    /// Decode and loop an image; relative paths resolve against the media root
    pub fn show_image(&self, path: impl Into<PathBuf>) -> Result<Option<RendererId>, EngineError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(EngineError::invalid("image path is empty"));
        }

        let params = TaskParams::Image { path: path.clone() };
        self.replace(Some(PendingTask::new(params, move |ctx| {
            let path = resolve_media_path(&path, ctx.config.media_root.as_deref());
            let frames = ctx.media.decode_image(&path, ctx.display)?;
            let task = ImageTask::new(frames, ctx.profile)?;
            Ok(Box::new(task) as Box<dyn RenderTask>)
        })))
    }

    /// Play a file or URL once
    pub fn show_video(&self, source: impl Into<String>) -> Result<Option<RendererId>, EngineError> {
        let source = source.into();
        if source.trim().is_empty() {
            return Err(EngineError::invalid("video source is empty"));
        }

        let params = TaskParams::Video {
            source: source.clone(),
        };
        self.replace(Some(PendingTask::new(params, move |ctx| {
            let location = VideoLocation::parse(&source, ctx.config.media_root.as_deref());
            let decoder = ctx.media.open_video(&location, ctx.display)?;
            let task = VideoTask::new(decoder, location.to_string(), ctx.display)
                .with_stall_limit(ctx.config.video_stall_limit);
            Ok(Box::new(task) as Box<dyn RenderTask>)
        })))
    }

    // === Color ===

    /// Replace the whole profile; picked up by the next frame
    pub fn set_color_profile(&self, profile: ColorProfile) {
        self.profile.set(profile);
    }

    /// Factors are clamped into [0, 1]
    pub fn set_color_factors(&self, r: f32, g: f32, b: f32) -> ColorProfile {
        let profile = self.profile.set_factors([r, g, b]);
        debug!("color factors now {:?}", profile.factors());
        profile
    }

    pub fn set_channel_order(&self, order: ChannelOrder) -> ColorProfile {
        let profile = self.profile.set_channel_order(order);
        debug!("channel order now {order}");
        profile
    }

    pub fn color_profile(&self) -> ColorProfile {
        self.profile.get()
    }

    // === Device ===

    pub fn set_brightness(&self, percent: u8) -> Result<(), EngineError> {
        if percent > 100 {
            return Err(EngineError::invalid(format!("brightness {percent} is above 100")));
        }
        lock(&self.sink)
            .set_brightness(percent)
            .map_err(|e| EngineError::Sink(format!("{e:#}")))?;
        lock(&self.board).brightness = percent;
        Ok(())
    }

    pub fn display_off(&self) -> Result<(), EngineError> {
        self.set_brightness(0)
    }

    /// Restore the configured brightness
    pub fn display_on(&self) -> Result<(), EngineError> {
        self.set_brightness(self.config.brightness)
    }

    /// Stop whatever is showing and blank the panel
    pub fn clear(&self) -> Result<(), EngineError> {
        self.stop();
        lock(&self.sink)
            .clear()
            .map_err(|e| EngineError::Sink(format!("{e:#}")))
    }

    // === Status ===

    pub fn status(&self) -> EngineStatus {
        let board = lock(&self.board);
        EngineStatus {
            state: board.state,
            active: board.params.as_ref().map(TaskParams::kind),
            params: board.params.clone(),
            renderer_id: board.renderer_id,
            color_profile: self.profile.get(),
            brightness: board.brightness,
            frames_pushed: self.frames_pushed.load(Ordering::SeqCst),
            last_error: board.last_error.clone(),
        }
    }

    pub fn get_status(&self) -> EngineStatus {
        self.status()
    }

    /// Render threads currently alive; never more than one
    pub fn live_renderers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Record how a loop ended, unless a newer renderer already owns the board
fn finish(board: &Mutex<StatusBoard>, id: RendererId, exit: LoopExit) {
    let mut board = lock(board);
    if board.renderer_id != Some(id) {
        return;
    }
    match exit {
        // The joining control thread resets the board
        LoopExit::Cancelled => {}
        LoopExit::EndOfStream => board.set_idle(),
        LoopExit::Failed(e) => {
            board.set_idle();
            board.last_error = Some(e.to_string());
        }
    }
}

impl Drop for RendererManager {
    fn drop(&mut self) {
        self.stop();
    }
}
