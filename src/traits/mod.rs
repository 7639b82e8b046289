pub mod media;
pub mod sink;
pub mod task;
pub mod time_source;

pub use media::*;
pub use sink::*;
pub use task::*;
pub use time_source::*;
