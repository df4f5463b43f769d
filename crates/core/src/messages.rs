use serde::{Deserialize, Serialize};

/// A cue operation requested by a show-control source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueCommand {
    /// Start or resume instance `id` playing clip `clip`.
    Start { id: String, clip: String },
    Stop { id: String },
    Pause { id: String },
    PauseAll,
    /// Stop every instance, leaving the outputs where they are.
    StopAll,
    /// Stop every instance and black out every channel.
    HardStop,
}

impl std::fmt::Display for CueCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CueCommand::Start { id, clip } => write!(f, "start {} ({})", id, clip),
            CueCommand::Stop { id } => write!(f, "stop {}", id),
            CueCommand::Pause { id } => write!(f, "pause {}", id),
            CueCommand::PauseAll => write!(f, "pause all"),
            CueCommand::StopAll => write!(f, "stop all"),
            CueCommand::HardStop => write!(f, "hard stop"),
        }
    }
}

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Playback settings
    pub clip_directory: String,
    pub target_fps: f64,

    // Output settings (Art-Net)
    pub output_enabled: bool,
    pub brightness: f32,
    pub start_universe: u16,
    pub blackout_channels: usize,
    pub artnet_broadcast: bool,
    pub artnet_source_ip: String,
    pub artnet_dest_ip: String,
    pub artnet_port: u16,
    pub keepalive_interval_ms: u64,

    // Cue input settings (OSC)
    pub osc_enabled: bool,
    pub osc_address: String,
    pub osc_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            clip_directory: ".".to_string(),
            target_fps: 60.0,

            output_enabled: true,
            brightness: 0.25,
            start_universe: 1200,
            blackout_channels: 96 * 3,
            artnet_broadcast: true,
            artnet_source_ip: "0.0.0.0".to_string(),
            artnet_dest_ip: String::new(),
            artnet_port: 6454,
            keepalive_interval_ms: 1000,

            osc_enabled: true,
            osc_address: "127.0.0.1".to_string(),
            osc_port: 53001,
        }
    }
}
