use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use cuelight_core::{
    ArtNetSink, Clip, ClipStore, Clock, ConfigManager, DispatchSink, Frame, LogStatus, ModuleEvent,
    ModuleId, ModuleManager, ModuleMessage, NetworkConfig, NullSink, OscModule, OutputModule,
    PlaybackModule, Scheduler, Settings,
};

mod tools;

use tools::LIGHT_COUNT;

/// Plays lighting clips in response to show-control cues.
#[derive(Parser, Debug)]
#[command(name = "cuelight")]
#[command(about = "Cue-driven lighting clip playback")]
struct Args {
    /// Settings file (created with defaults if missing)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the clip files (overrides the settings file)
    #[arg(short, long, global = true)]
    directory: Option<PathBuf>,

    /// Don't send anything to the lights
    #[arg(long, global = true)]
    disable_output: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Listen for cues and play clips until Ctrl-C (the default)
    Serve {
        /// OSC listen port (overrides the settings file)
        #[arg(long)]
        osc_port: Option<u16>,
    },
    /// Send a single frame of a clip at full brightness
    Frame {
        #[arg(short, long)]
        clip: String,

        #[arg(short, long, default_value = "0")]
        frame: usize,

        /// Afterwards light each fixture on its own, half a second apiece
        #[arg(long)]
        walk: bool,
    },
    /// Set every light to one color
    Fill {
        #[arg(short, long, default_value = "0")]
        red: u8,

        #[arg(short, long, default_value = "0")]
        green: u8,

        #[arg(short, long, default_value = "0")]
        blue: u8,
    },
    /// Print per-light RGB values of a clip
    Table {
        #[arg(short, long)]
        clip: String,

        /// Light indices to show (all lights when omitted)
        #[arg(short, long, value_delimiter = ',')]
        lights: Vec<usize>,

        #[arg(short, long, default_value = "0")]
        start_frame: usize,

        #[arg(short = 'n', long)]
        count_frames: Option<usize>,
    },
    /// List the clips found in the clip directory
    List,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = ConfigManager::new(args.config.clone());
    let mut settings = config.load().context("Failed to load settings")?;
    if let Some(directory) = &args.directory {
        settings.clip_directory = directory.display().to_string();
    }
    if args.disable_output {
        settings.output_enabled = false;
    }

    match args.command.unwrap_or(Command::Serve { osc_port: None }) {
        Command::Serve { osc_port } => {
            if let Some(port) = osc_port {
                settings.osc_port = port;
            }
            serve(settings).await
        }
        Command::Frame { clip, frame, walk } => send_clip_frame(&settings, &clip, frame, walk).await,
        Command::Fill { red, green, blue } => {
            let frame = Frame::filled(&[red, green, blue], LIGHT_COUNT);
            output_frame(&settings, &frame)?;
            log::info!("Set {} lights to rgb({}, {}, {})", LIGHT_COUNT, red, green, blue);
            Ok(())
        }
        Command::Table {
            clip,
            lights,
            start_frame,
            count_frames,
        } => {
            let clips = load_clips(&settings)?;
            let clip = find_clip(&clips, &clip)?;
            let lights = if lights.is_empty() {
                (0..LIGHT_COUNT).collect()
            } else {
                lights
            };
            print!(
                "{}",
                tools::light_table(clip, &lights, start_frame, count_frames)
            );
            Ok(())
        }
        Command::List => {
            let clips = load_clips(&settings)?;
            for name in clips.names() {
                if let Some(clip) = clips.get(name) {
                    println!("{:<32} {:>6} frames", name, clip.len());
                }
            }
            Ok(())
        }
    }
}

fn load_clips(settings: &Settings) -> anyhow::Result<ClipStore> {
    ClipStore::load_directory(&settings.clip_directory)
        .with_context(|| format!("Failed to load clips from {}", settings.clip_directory))
}

fn find_clip<'a>(clips: &'a ClipStore, name: &str) -> anyhow::Result<&'a Clip> {
    match clips.get(name) {
        Some(clip) => Ok(clip.as_ref()),
        None => bail!(
            "No clip named '{}'. Available clips: {}",
            name,
            clips.names().join(", ")
        ),
    }
}

fn output_frame(settings: &Settings, frame: &Frame) -> anyhow::Result<()> {
    if !settings.output_enabled {
        log::warn!("Output disabled, not sending");
        return Ok(());
    }
    tools::send_frame(settings, frame, 1.0)
}

async fn send_clip_frame(
    settings: &Settings,
    clip_name: &str,
    index: usize,
    walk: bool,
) -> anyhow::Result<()> {
    let clips = load_clips(settings)?;
    let clip = find_clip(&clips, clip_name)?;
    let Some(frame) = clip.frame(index) else {
        log::warn!("Clip '{}' has no frame {} ({} frames)", clip_name, index, clip.len());
        return Ok(());
    };

    output_frame(settings, frame)?;

    if walk {
        for light in 0..LIGHT_COUNT {
            output_frame(settings, &tools::isolate_light(frame, light))?;
            log::info!("Sending light {}", light);
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    for light in 0..LIGHT_COUNT {
        let (r, g, b) = tools::light_rgb(frame, light);
        println!("Light {}: rgb({}, {}, {})", light, r, g, b);
    }
    Ok(())
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let clips = Arc::new(load_clips(&settings)?);
    let clock = Clock::from_fps(settings.target_fps)?;

    let mut manager = ModuleManager::new();

    let dispatch: Box<dyn DispatchSink> = if settings.output_enabled {
        let network_config = NetworkConfig::from_settings(&settings);
        log::info!(
            "Art-Net {} output: {}",
            network_config.get_mode_string(),
            network_config.get_destination()
        );
        manager.register_module(Box::new(OutputModule::new(
            network_config,
            Duration::from_millis(settings.keepalive_interval_ms),
        )));
        let output = manager
            .sender(ModuleId::Output)
            .ok_or_else(|| anyhow!("Output module is not registered"))?;
        Box::new(ArtNetSink::from_settings(output, &settings))
    } else {
        log::warn!("Output disabled, frames will be discarded");
        Box::new(NullSink)
    };

    let scheduler = Scheduler::new(clips, clock, dispatch, Box::new(LogStatus::new()));
    manager.register_module(Box::new(PlaybackModule::new(scheduler)));

    if settings.osc_enabled {
        let listen_addr: SocketAddr = format!("{}:{}", settings.osc_address, settings.osc_port)
            .parse()
            .context("Invalid OSC listen address")?;
        manager.register_module(Box::new(OscModule::new(listen_addr)));
    } else {
        log::warn!("OSC input disabled, no cues will arrive");
    }

    let mut messages = manager
        .take_message_receiver()
        .ok_or_else(|| anyhow!("Module message receiver already taken"))?;

    manager
        .initialize()
        .await
        .map_err(|e| anyhow!("Module initialization failed: {}", e))?;
    manager
        .start()
        .await
        .map_err(|e| anyhow!("Module start failed: {}", e))?;

    log::info!("cuelight running, press Ctrl-C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            message = messages.recv() => {
                match message {
                    Some(ModuleMessage::Event(ModuleEvent::Cue(command))) => {
                        if let Err(e) = manager
                            .send_to_module(ModuleId::Playback, ModuleEvent::Cue(command))
                            .await
                        {
                            log::error!("{}", e);
                        }
                    }
                    Some(ModuleMessage::Event(_)) => {}
                    Some(ModuleMessage::Status(status)) => log::info!("{}", status),
                    Some(ModuleMessage::Error(error)) => log::error!("{}", error),
                    None => break,
                }
            }

            result = &mut ctrl_c => {
                if let Err(e) = result {
                    log::error!("Failed to listen for Ctrl-C: {}", e);
                }
                log::info!("Shutting down");
                break;
            }
        }
    }

    manager
        .shutdown()
        .await
        .map_err(|e| anyhow!("Module shutdown failed: {}", e))?;

    // Final module status and any late errors
    while let Ok(message) = messages.try_recv() {
        match message {
            ModuleMessage::Status(status) => log::info!("{}", status),
            ModuleMessage::Error(error) => log::error!("{}", error),
            ModuleMessage::Event(_) => {}
        }
    }

    Ok(())
}
