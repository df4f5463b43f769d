pub use artnet::artnet::{encode_output, ArtNet, ArtNetError, ArtNetMode, UNIVERSE_SIZE};
pub use artnet::network_config::NetworkConfig;
pub use clip::clip::Clip;
pub use clip::clip_store::{encode_binary, load_clip_file, ClipError, ClipStore};
pub use clock::clock::{Clock, ClockError, DEFAULT_FPS};
pub use config::{ConfigError, ConfigFile, ConfigManager, ConfigSchema};
pub use cue::cue::{CueError, CueInstance, CuePhase, CueSnapshot};
pub use cue::cue_registry::{CueRegistry, TickStep};
pub use dispatch::artnet_sink::{frame_to_universes, ArtNetSink};
pub use dispatch::sink::{DispatchSink, LogStatus, NullSink, SharedStatus, StatusSink};
pub use frame::frame::Frame;
pub use messages::{CueCommand, Settings};
pub use osc::cue_message::{command_from_message, decode_datagram, QLAB_EVENT_PREFIX};
pub use scheduler::scheduler::Scheduler;
// Async module system exports
pub use modules::{
    AsyncModule, ModuleEvent, ModuleId, ModuleManager, ModuleMessage, OscModule, OutputModule,
    PlaybackModule,
};

mod artnet;
mod clip;
mod clock;
mod config;
mod cue;
mod dispatch;
mod frame;
pub mod messages;
mod modules;
mod osc;
mod scheduler;
