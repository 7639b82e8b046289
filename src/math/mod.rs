mod color;

pub use color::{scale_channel, transform, transform_frame, transform_pixels};
