pub mod cue;
pub mod cue_registry;
