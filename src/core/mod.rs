pub mod cancel;
pub mod clock;
pub mod clock_task;
pub mod display_context;
pub mod driver;
pub mod frame;
pub mod glyphs;
pub mod image_task;
pub mod manager;
pub mod profile;
pub mod sinks;
pub mod text_task;
pub mod video_task;

pub use cancel::CancelToken;
pub use clock::{parse_ntp_response, LocalClock, SntpClock};
pub use clock_task::ClockTask;
pub use display_context::DisplayContext;
pub use driver::{LoopExit, RenderLoop, SharedSink};
pub use frame::Frame;
pub use glyphs::{font_names, is_font_file, Glyphs, DEFAULT_FONT};
pub use image_task::ImageTask;
pub use manager::{
    BuildContext, Engine, EngineBuilder, EngineState, EngineStatus, PendingTask, RendererId,
    RendererManager,
};
pub use profile::SharedProfile;
pub use sinks::{MemorySink, TerminalSink};
pub use text_task::TextTask;
pub use video_task::VideoTask;
