use std::collections::HashMap;
use std::sync::Arc;

use crate::cue::cue::{CueError, CueInstance, CuePhase, CueSnapshot};
use crate::{Clip, Frame};

/// What happened to one running instance during a tick.
#[derive(Debug)]
pub enum TickStep<'a> {
    /// The instance advanced and this frame should be dispatched.
    Frame { id: &'a str, frame: &'a Frame },
    /// The instance advanced but its clip has no frame at that index.
    Missing(CueError),
    /// The instance ran past its last frame and was removed.
    Completed(CueInstance),
}

/// Running and paused cue instances, keyed by caller-supplied id.
///
/// Running instances keep insertion order, which decides the order of per-tick side
/// effects. An id lives in at most one of the two sets.
#[derive(Debug, Default)]
pub struct CueRegistry {
    running: Vec<CueInstance>,
    paused: HashMap<String, CueInstance>,
}

impl CueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.running.iter().any(|cue| cue.id == id)
    }

    pub fn is_paused(&self, id: &str) -> bool {
        self.paused.contains_key(id)
    }

    pub fn has_running(&self) -> bool {
        !self.running.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty() && self.paused.is_empty()
    }

    pub fn running(&self) -> impl Iterator<Item = &CueInstance> {
        self.running.iter()
    }

    pub fn paused(&self) -> impl Iterator<Item = &CueInstance> {
        self.paused.values()
    }

    pub fn get(&self, id: &str) -> Option<&CueInstance> {
        self.running
            .iter()
            .find(|cue| cue.id == id)
            .or_else(|| self.paused.get(id))
    }

    /// Inserts `id` as running at global tick `tick`.
    ///
    /// A paused instance of the same clip resumes after its last dispatched frame, so
    /// pausing never replays a frame. Anything else starts at frame 0 on the next tick.
    /// Returns the frame the next tick will dispatch.
    pub fn start(&mut self, id: &str, clip: Arc<Clip>, tick: u64) -> usize {
        self.remove_running(id);

        let total_frames = clip.last_frame_index();
        let resume = self
            .paused
            .remove(id)
            .filter(|paused| paused.dispatched && paused.clip_name() == clip.name());

        let (current_frame, next_frame) = match resume {
            Some(paused) => {
                let current = paused.current_frame.min(total_frames);
                (current, current + 1)
            }
            None => (0, 0),
        };

        self.running.push(CueInstance {
            id: id.to_string(),
            clip,
            start_frame: tick as i64 + 1 - next_frame as i64,
            current_frame,
            total_frames,
            dispatched: next_frame > 0,
            phase: CuePhase::Running,
        });

        next_frame
    }

    /// Moves a running instance to the paused set, keeping its position.
    ///
    /// Returns the last frame the instance dispatched.
    pub fn pause(&mut self, id: &str) -> Result<usize, CueError> {
        let mut cue = self
            .remove_running(id)
            .ok_or_else(|| CueError::UnknownInstance(id.to_string()))?;

        cue.phase = CuePhase::Paused;
        let current_frame = cue.current_frame;
        self.paused.insert(cue.id.clone(), cue);
        Ok(current_frame)
    }

    /// Pauses every running instance, returning their ids in running order.
    pub fn pause_all(&mut self) -> Vec<String> {
        let mut ids = Vec::with_capacity(self.running.len());
        for mut cue in self.running.drain(..) {
            cue.phase = CuePhase::Paused;
            ids.push(cue.id.clone());
            self.paused.insert(cue.id.clone(), cue);
        }
        ids
    }

    /// Removes `id` from both sets.
    pub fn stop(&mut self, id: &str) -> Result<(), CueError> {
        let was_running = self.remove_running(id).is_some();
        let was_paused = self.paused.remove(id).is_some();

        if was_running || was_paused {
            Ok(())
        } else {
            Err(CueError::UnknownInstance(id.to_string()))
        }
    }

    /// Removes every instance, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.running.len() + self.paused.len();
        self.running.clear();
        self.paused.clear();
        count
    }

    /// Moves every running instance to global tick `tick`.
    ///
    /// Instances whose local frame passes the end of their clip are removed and reported
    /// as completed; no frame is dispatched for them this tick.
    pub fn advance<F>(&mut self, tick: u64, mut visit: F)
    where
        F: FnMut(TickStep<'_>),
    {
        let tick = tick as i64;
        let mut index = 0;

        while index < self.running.len() {
            let local = (tick - self.running[index].start_frame).max(0) as usize;

            if local > self.running[index].total_frames {
                let finished = self.running.remove(index);
                visit(TickStep::Completed(finished));
                continue;
            }

            let cue = &mut self.running[index];
            cue.current_frame = local;
            cue.dispatched = true;
            match cue.clip.frame(local) {
                Some(frame) => visit(TickStep::Frame { id: &cue.id, frame }),
                None => visit(TickStep::Missing(CueError::FrameOutOfRange {
                    id: cue.id.clone(),
                    frame: local,
                    len: cue.clip.len(),
                })),
            }
            index += 1;
        }
    }

    /// Running instances in order, then paused instances sorted by id.
    pub fn snapshot(&self) -> Vec<CueSnapshot> {
        let mut paused: Vec<&CueInstance> = self.paused.values().collect();
        paused.sort_by(|a, b| a.id.cmp(&b.id));

        self.running
            .iter()
            .chain(paused)
            .map(CueInstance::snapshot)
            .collect()
    }

    fn remove_running(&mut self, id: &str) -> Option<CueInstance> {
        let index = self.running.iter().position(|cue| cue.id == id)?;
        Some(self.running.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(name: &str, len: usize) -> Arc<Clip> {
        let frames = (0..len).map(|i| Frame::new(vec![i as u8])).collect();
        Arc::new(Clip::new(name, frames))
    }

    #[test]
    fn test_fresh_start_dispatches_first_frame() {
        let mut registry = CueRegistry::new();
        assert_eq!(registry.start("x", clip("A", 3), 4), 0);

        let mut frames = Vec::new();
        registry.advance(5, |step| {
            if let TickStep::Frame { frame, .. } = step {
                frames.push(frame.values()[0]);
            }
        });
        assert_eq!(frames, vec![0]);
    }

    #[test]
    fn test_missing_frame_skips_only_that_instance() {
        let mut registry = CueRegistry::new();
        registry.start("bad", Arc::new(Clip::new("empty", vec![])), 0);
        registry.start("good", clip("A", 3), 0);

        let mut missing = Vec::new();
        let mut frames = Vec::new();
        registry.advance(1, |step| match step {
            TickStep::Missing(e) => missing.push(e),
            TickStep::Frame { id, frame } => frames.push((id.to_string(), frame.values()[0])),
            TickStep::Completed(cue) => panic!("{} completed early", cue.id),
        });

        assert_eq!(
            missing,
            vec![CueError::FrameOutOfRange {
                id: "bad".to_string(),
                frame: 0,
                len: 0,
            }]
        );
        assert_eq!(frames, vec![("good".to_string(), 0)]);
        // Still running, and it has consumed its only slot
        assert!(registry.is_running("bad"));
        assert!(registry.get("bad").unwrap().dispatched);

        let mut completed = Vec::new();
        registry.advance(2, |step| {
            if let TickStep::Completed(cue) = step {
                completed.push(cue.id);
            }
        });
        assert_eq!(completed, vec!["bad".to_string()]);
        assert!(registry.is_running("good"));
    }

    #[test]
    fn test_pause_keeps_position() {
        let mut registry = CueRegistry::new();
        registry.start("x", clip("A", 5), 0);
        registry.advance(1, |_| {});
        registry.advance(2, |_| {});

        assert_eq!(registry.pause("x").unwrap(), 1);
        assert!(!registry.has_running());
        assert!(registry.is_paused("x"));
        assert_eq!(registry.get("x").unwrap().phase, CuePhase::Paused);
    }

    #[test]
    fn test_resume_offsets_start_frame() {
        let mut registry = CueRegistry::new();
        let a = clip("A", 5);
        registry.start("x", a.clone(), 0);
        registry.advance(1, |_| {});
        registry.advance(2, |_| {});
        registry.pause("x").unwrap();

        assert_eq!(registry.start("x", a, 7), 2);
        let cue = registry.get("x").unwrap();
        assert_eq!(cue.start_frame, 6);
        assert_eq!(cue.current_frame, 1);
        assert!(!registry.is_paused("x"));
    }

    #[test]
    fn test_pause_before_first_frame_restarts() {
        let mut registry = CueRegistry::new();
        let a = clip("A", 5);
        registry.start("x", a.clone(), 0);
        registry.pause("x").unwrap();

        assert_eq!(registry.start("x", a, 0), 0);
    }

    #[test]
    fn test_resume_with_other_clip_restarts() {
        let mut registry = CueRegistry::new();
        registry.start("x", clip("A", 5), 0);
        registry.advance(1, |_| {});
        registry.advance(2, |_| {});
        registry.pause("x").unwrap();

        assert_eq!(registry.start("x", clip("B", 5), 0), 0);
    }

    #[test]
    fn test_unknown_ids() {
        let mut registry = CueRegistry::new();
        assert_eq!(
            registry.pause("ghost").unwrap_err(),
            CueError::UnknownInstance("ghost".to_string())
        );
        assert!(registry.stop("ghost").is_err());
    }

    #[test]
    fn test_stop_discards_paused() {
        let mut registry = CueRegistry::new();
        registry.start("x", clip("A", 5), 0);
        registry.pause("x").unwrap();
        registry.stop("x").unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_order() {
        let mut registry = CueRegistry::new();
        registry.start("b", clip("A", 3), 0);
        registry.start("a", clip("A", 3), 0);
        registry.start("c", clip("A", 3), 0);
        registry.pause("c").unwrap();

        let ids: Vec<_> = registry.snapshot().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }
}
