pub mod cue_message;
