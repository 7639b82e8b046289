// cli.rs - Command-line interface configuration
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::{ChannelOrder, Rgb};

#[derive(Parser, Debug, Clone)]
#[command(name = "matrix-engine")]
#[command(about = "LED matrix display engine with a terminal preview", long_about = None)]
pub struct Cli {
    /// JSON engine configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the configured panel width
    #[arg(long)]
    pub width: Option<u32>,

    /// Override the configured panel height
    #[arg(long)]
    pub height: Option<u32>,

    /// Stop after this many seconds (0 runs until the content ends)
    #[arg(short, long, default_value = "10")]
    pub seconds: u64,

    /// Color factors as three values in [0, 1]
    #[arg(long, num_args = 3, value_names = ["R", "G", "B"], allow_negative_numbers = true)]
    pub factors: Option<Vec<f32>>,

    /// Channel order of the panel wiring (rgb, grb, rbg, brg, bgr)
    #[arg(long)]
    pub order: Option<ChannelOrder>,

    /// Brightness in percent
    #[arg(short, long)]
    pub brightness: Option<u8>,

    /// Print the final engine status as JSON
    #[arg(long, default_value = "false")]
    pub status: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Static or scrolling text
    Text {
        content: String,
        #[arg(long, default_value = "#ff0000")]
        color: Rgb,
        #[arg(long, default_value = "5.0")]
        speed: f32,
        /// Center the text instead of scrolling it
        #[arg(long, default_value = "false")]
        no_scroll: bool,
        /// Built-in font name or a .ttf/.otf file
        #[arg(long)]
        font: Option<String>,
    },
    /// Current time
    Clock {
        #[arg(long, default_value = "#ff0000")]
        color: Rgb,
        #[arg(long, default_value = "%H:%M:%S")]
        format: String,
        /// Query the configured NTP server, falling back to local time
        #[arg(long, default_value = "false")]
        network_time: bool,
        #[arg(long)]
        font: Option<String>,
    },
    /// Still image or animated GIF
    Image { path: PathBuf },
    /// Video file or stream URL, played once
    Video { source: String },
    /// List fonts and the media files under the media root
    List,
}
