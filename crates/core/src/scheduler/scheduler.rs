use std::sync::Arc;

use tokio::time::{Duration, Instant};

use crate::cue::cue_registry::{CueRegistry, TickStep};
use crate::{Clip, ClipStore, Clock, CueError, CueSnapshot, DispatchSink, StatusSink};

/// Plays cue instances against one shared clock.
///
/// The scheduler owns every piece of mutable playback state. It does no I/O and no
/// waiting of its own: the owner calls [`Scheduler::tick`] at [`Scheduler::next_deadline`]
/// and serializes cue operations with ticks.
pub struct Scheduler {
    clips: Arc<ClipStore>,
    clock: Clock,
    registry: CueRegistry,
    dispatch: Box<dyn DispatchSink>,
    status: Box<dyn StatusSink>,
}

impl Scheduler {
    pub fn new(
        clips: Arc<ClipStore>,
        clock: Clock,
        dispatch: Box<dyn DispatchSink>,
        status: Box<dyn StatusSink>,
    ) -> Self {
        Self {
            clips,
            clock,
            registry: CueRegistry::new(),
            dispatch,
            status,
        }
    }

    pub fn clips(&self) -> &ClipStore {
        &self.clips
    }

    pub fn registry(&self) -> &CueRegistry {
        &self.registry
    }

    pub fn tick_count(&self) -> u64 {
        self.clock.tick_count()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.clock.next_deadline()
    }

    pub fn snapshot(&self) -> Vec<CueSnapshot> {
        self.registry.snapshot()
    }

    /// Starts (or resumes) instance `id` playing `clip_name`.
    pub fn start(&mut self, id: &str, clip_name: &str) -> Result<usize, CueError> {
        self.start_at(id, clip_name, Instant::now())
    }

    /// Starts (or resumes) instance `id` playing `clip_name`, with `now` as the time the
    /// clock starts from if it was stopped.
    ///
    /// An instance already running under `id` is stopped first. Returns the local frame the
    /// next tick will dispatch.
    pub fn start_at(&mut self, id: &str, clip_name: &str, now: Instant) -> Result<usize, CueError> {
        let clip: Arc<Clip> = self
            .clips
            .get(clip_name)
            .cloned()
            .ok_or_else(|| CueError::UnknownClip(clip_name.to_string()))?;

        if self.registry.is_running(id) {
            log::info!("Restarting cue '{}'", id);
            let _ = self.registry.stop(id);
            self.stop_clock_if_idle();
        }

        if !self.clock.is_running() {
            self.clock.start(now);
        }

        let next_frame = self.registry.start(id, clip, self.clock.tick_count());
        if next_frame > 0 {
            log::info!(
                "Resuming cue '{}' ({}) at frame {}",
                id,
                clip_name,
                next_frame
            );
        } else {
            log::info!("Starting cue '{}' ({})", id, clip_name);
        }

        self.publish();
        Ok(next_frame)
    }

    /// Pauses a running instance. Its position survives clock resets.
    pub fn pause(&mut self, id: &str) -> Result<usize, CueError> {
        let frame = self.registry.pause(id)?;
        log::info!("Pausing cue '{}' at frame {}", id, frame);

        self.stop_clock_if_idle();
        self.publish();
        Ok(frame)
    }

    /// Pauses every running instance.
    pub fn pause_all(&mut self) -> Vec<String> {
        let ids = self.registry.pause_all();
        if !ids.is_empty() {
            log::info!("Pausing all cues: {}", ids.join(", "));
        }

        self.stop_clock_if_idle();
        self.publish();
        ids
    }

    /// Discards an instance whether it is running or paused.
    pub fn stop(&mut self, id: &str) -> Result<(), CueError> {
        self.registry.stop(id)?;
        log::info!("Stopping cue '{}'", id);

        self.stop_clock_if_idle();
        self.publish();
        Ok(())
    }

    /// Removes every instance and stops the clock. Safe to call when already idle.
    pub fn stop_all(&mut self) -> usize {
        let removed = self.registry.clear();
        if removed > 0 {
            log::info!("Stopped {} cues", removed);
        }

        self.clock.stop();
        self.publish();
        removed
    }

    /// [`Scheduler::stop_all`] followed by a blackout on the dispatch sink.
    pub fn hard_stop(&mut self) -> usize {
        log::warn!("HARD STOP");
        let removed = self.stop_all();
        self.dispatch.blackout();
        removed
    }

    /// Runs one tick fired at `now`.
    ///
    /// Returns the delay until the next tick, or `None` once no instance is running and
    /// the clock has stopped.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        if !self.clock.is_running() {
            return None;
        }

        let (tick, delay) = self.clock.advance(now);

        let dispatch = &mut self.dispatch;
        self.registry.advance(tick, |step| match step {
            TickStep::Frame { id, frame } => dispatch.on_frame(id, frame),
            TickStep::Missing(e) => log::warn!("{}", e),
            TickStep::Completed(cue) => {
                log::info!("Cue '{}' ({}) completed", cue.id, cue.clip_name());
                dispatch.on_completed(&cue.id);
            }
        });

        self.stop_clock_if_idle();
        self.publish();

        if self.clock.is_running() {
            Some(delay)
        } else {
            None
        }
    }

    fn stop_clock_if_idle(&mut self) {
        if !self.registry.has_running() && self.clock.is_running() {
            log::debug!("No running cues, stopping clock at tick {}", self.clock.tick_count());
            self.clock.stop();
        }
    }

    fn publish(&mut self) {
        let snapshot = self.registry.snapshot();
        self.status.on_snapshot(&snapshot);
    }
}
