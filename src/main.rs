use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use log::{info, warn};
use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use matrix_engine::cli::{Cli, Command};
use matrix_engine::config::{ClockConfig, EngineConfig, TextConfig};
use matrix_engine::core::{font_names, Engine, EngineState, TerminalSink};
use matrix_engine::loaders::{ffmpeg_available, MediaKind, MediaLibrary};

const STATUS_POLL: Duration = Duration::from_millis(100);

fn init_logger() {
    // Logs go to stderr; stdout is the panel preview
    let _ = Builder::from_env(Env::default().default_filter_or("warn")).try_init();
}

fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    if let Some(brightness) = cli.brightness {
        config.brightness = brightness;
    }

    if let Command::List = cli.command {
        return list_media(&config);
    }

    let sink = TerminalSink::new(io::stdout(), config.width, config.height);
    let engine = Engine::new(Box::new(sink), config.clone()).context("Failed to start display engine")?;

    if let Some([r, g, b]) = cli.factors.as_deref() {
        engine.set_color_factors(*r, *g, *b);
    }
    if let Some(order) = cli.order {
        engine.set_channel_order(order);
    }

    // Clear the terminal once; frames redraw from the top-left corner
    print!("\x1b[2J");
    io::stdout().flush().context("Failed to clear terminal")?;

    match cli.command {
        Command::Text {
            content,
            color,
            speed,
            no_scroll,
            font,
        } => {
            let mut request = TextConfig::new(content).color(color).speed(speed).scroll(!no_scroll);
            request.font = font;
            engine.show_text(request)?;
        }
        Command::Clock {
            color,
            format,
            network_time,
            font,
        } => {
            let mut request = ClockConfig::default()
                .color(color)
                .format(format)
                .network_time(network_time);
            request.font = font;
            engine.show_clock(request)?;
        }
        Command::Image { path } => {
            engine.show_image(path)?;
        }
        Command::Video { source } => {
            if !ffmpeg_available(&config.ffmpeg) {
                warn!("{} does not run; video playback will fail", config.ffmpeg.display());
            }
            engine.show_video(source)?;
        }
        // Handled before the engine starts
        Command::List => {}
    }

    wait_for_content(&engine, cli.seconds);
    engine.stop();

    if cli.status {
        println!("{}", serde_json::to_string_pretty(&engine.status())?);
    }
    Ok(())
}

/// Block until the deadline passes or the content ends by itself
fn wait_for_content(engine: &Engine, seconds: u64) {
    let deadline = (seconds > 0).then(|| Instant::now() + Duration::from_secs(seconds));
    loop {
        let status = engine.status();
        if status.state == EngineState::Idle {
            match status.last_error {
                Some(error) => warn!("renderer stopped: {error}"),
                None => info!("content finished"),
            }
            return;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return;
        }
        thread::sleep(STATUS_POLL);
    }
}

fn list_media(config: &EngineConfig) -> Result<()> {
    println!("fonts:");
    for name in font_names() {
        println!("  {name}");
    }
    for name in MediaLibrary::new(&config.font_dir).list(MediaKind::Font)? {
        println!("  {name}");
    }

    let Some(root) = &config.media_root else {
        println!("no media_root configured");
        return Ok(());
    };
    let library = MediaLibrary::new(root);
    for (label, kind) in [("images", MediaKind::Image), ("videos", MediaKind::Video)] {
        println!("{label}:");
        for name in library.list(kind)? {
            println!("  {name}");
        }
    }
    Ok(())
}
