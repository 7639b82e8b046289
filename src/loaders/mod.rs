pub mod image_decoder;
pub mod provider;
pub mod video_decoder;

pub use image_decoder::decode_image;
pub use provider::{FileMediaProvider, MediaKind, MediaLibrary};
pub use video_decoder::{ffmpeg_available, FfmpegOptions, FfmpegVideoSource};
