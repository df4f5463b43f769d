use std::sync::Arc;

use parking_lot::RwLock;

use crate::{CuePhase, CueSnapshot, Frame};

/// Receives the frames produced by playback.
///
/// Calls are made from the tick loop and must return promptly; implementations own any
/// buffering or retrying of the underlying transport.
pub trait DispatchSink: Send + Sync {
    /// A running instance reached `frame` on this tick.
    fn on_frame(&mut self, id: &str, frame: &Frame);

    /// An instance played past its last frame and was removed.
    fn on_completed(&mut self, id: &str);

    /// Drive every output channel to zero.
    fn blackout(&mut self) {}
}

/// Receives the playback snapshot published after each tick and each cue operation.
pub trait StatusSink: Send + Sync {
    fn on_snapshot(&mut self, cues: &[CueSnapshot]);
}

/// Discards everything. Used when output is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DispatchSink for NullSink {
    fn on_frame(&mut self, _id: &str, _frame: &Frame) {}

    fn on_completed(&mut self, _id: &str) {}
}

impl StatusSink for NullSink {
    fn on_snapshot(&mut self, _cues: &[CueSnapshot]) {}
}

/// Logs cue state whenever the set of cues or their phases change.
///
/// Frame progress alone doesn't trigger a line, so a 60Hz tick doesn't flood the log.
#[derive(Debug, Default)]
pub struct LogStatus {
    last: Vec<(String, CuePhase)>,
}

impl LogStatus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusSink for LogStatus {
    fn on_snapshot(&mut self, cues: &[CueSnapshot]) {
        let current: Vec<(String, CuePhase)> =
            cues.iter().map(|cue| (cue.id.clone(), cue.state)).collect();
        if current == self.last {
            return;
        }

        if cues.is_empty() {
            log::info!("No active cues");
        } else {
            let summary: Vec<String> = cues
                .iter()
                .map(|cue| {
                    format!(
                        "{} [{}] {} {}/{}",
                        cue.id, cue.clip_name, cue.state, cue.current_frame, cue.total_frames
                    )
                })
                .collect();
            log::info!("Active cues: {}", summary.join(", "));
        }

        self.last = current;
    }
}

/// Keeps the latest snapshot where other tasks can read it.
#[derive(Debug, Default, Clone)]
pub struct SharedStatus {
    cues: Arc<RwLock<Vec<CueSnapshot>>>,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> Vec<CueSnapshot> {
        self.cues.read().clone()
    }
}

impl StatusSink for SharedStatus {
    fn on_snapshot(&mut self, cues: &[CueSnapshot]) {
        let mut shared = self.cues.write();
        shared.clear();
        shared.extend_from_slice(cues);
    }
}

/// Fans a snapshot out to several sinks.
impl StatusSink for Vec<Box<dyn StatusSink>> {
    fn on_snapshot(&mut self, cues: &[CueSnapshot]) {
        for sink in self.iter_mut() {
            sink.on_snapshot(cues);
        }
    }
}
