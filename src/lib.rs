pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod frame;
pub mod loaders;
pub mod math;
pub mod traits;
pub mod types;

pub use config::{ClockConfig, EngineConfig, TextConfig};
pub use crate::core::{Engine, EngineState, EngineStatus, Frame, RendererManager};
pub use error::{EngineError, FrameError, TimeError};
pub use types::{ChannelOrder, ColorProfile, RenderKind, Rgb, TaskParams};
