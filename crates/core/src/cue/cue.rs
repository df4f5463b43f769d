use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Clip;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CuePhase {
    Running,
    Paused,
}

impl std::fmt::Display for CuePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CuePhase::Running => write!(f, "running"),
            CuePhase::Paused => write!(f, "paused"),
        }
    }
}

/// Problems raised by cue operations. None of them are fatal to playback.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CueError {
    #[error("no clip named '{0}'")]
    UnknownClip(String),

    #[error("no active cue '{0}'")]
    UnknownInstance(String),

    #[error("cue '{id}' has no frame {frame} (clip holds {len})")]
    FrameOutOfRange { id: String, frame: usize, len: usize },
}

impl CueError {
    /// Level a cue source should log this error at.
    pub fn level(&self) -> log::Level {
        match self {
            CueError::UnknownClip(_) => log::Level::Error,
            CueError::UnknownInstance(_) | CueError::FrameOutOfRange { .. } => log::Level::Warn,
        }
    }
}

/// One running or paused playback of a clip.
#[derive(Clone, Debug)]
pub struct CueInstance {
    pub id: String,
    pub clip: Arc<Clip>,
    /// Offset such that `local frame = tick - start_frame` on every tick after the start.
    /// A fresh start at tick `t` sets `t + 1`, so tick `t + 1` dispatches frame 0. A resume
    /// sets `t + 1 - next_frame`. Only meaningful while running.
    pub start_frame: i64,
    /// Last dispatched local frame.
    pub current_frame: usize,
    /// Last valid local frame index of the clip.
    pub total_frames: usize,
    /// Whether any frame has been dispatched yet.
    pub dispatched: bool,
    pub phase: CuePhase,
}

impl CueInstance {
    pub fn clip_name(&self) -> &str {
        self.clip.name()
    }

    pub fn snapshot(&self) -> CueSnapshot {
        CueSnapshot {
            id: self.id.clone(),
            clip_name: self.clip.name().to_string(),
            state: self.phase,
            current_frame: self.current_frame,
            total_frames: self.total_frames,
        }
    }
}

/// Observability view of a cue instance, published once per tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueSnapshot {
    pub id: String,
    pub clip_name: String,
    pub state: CuePhase,
    pub current_frame: usize,
    pub total_frames: usize,
}
