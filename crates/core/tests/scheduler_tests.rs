use std::sync::Arc;

use cuelight_core::{
    Clip, ClipStore, Clock, CueError, CuePhase, DispatchSink, Frame, Scheduler, SharedStatus,
};
use parking_lot::Mutex;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Frame(String, u8),
    Completed(String),
    Blackout,
}

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl DispatchSink for Recorder {
    fn on_frame(&mut self, id: &str, frame: &Frame) {
        // First channel identifies the frame in these clips
        let marker = frame.channel(1).unwrap_or(0);
        self.events.lock().push(Event::Frame(id.to_string(), marker));
    }

    fn on_completed(&mut self, id: &str) {
        self.events.lock().push(Event::Completed(id.to_string()));
    }

    fn blackout(&mut self) {
        self.events.lock().push(Event::Blackout);
    }
}

fn frame(id: &str, marker: u8) -> Event {
    Event::Frame(id.to_string(), marker)
}

fn completed(id: &str) -> Event {
    Event::Completed(id.to_string())
}

/// Clip whose frame `i` carries `i` in channel 1.
fn numbered_clip(name: &str, len: u8) -> Clip {
    Clip::new(name, (0..len).map(|i| Frame::new(vec![i, 0, 0])).collect())
}

struct Harness {
    scheduler: Scheduler,
    recorder: Recorder,
    status: SharedStatus,
    now: Instant,
}

impl Harness {
    fn new() -> Self {
        let mut clips = ClipStore::new();
        clips.insert(numbered_clip("A", 3));
        clips.insert(numbered_clip("B", 5));
        clips.insert(numbered_clip("long", 100));
        clips.insert(Clip::new("empty", vec![]));

        let recorder = Recorder::default();
        let status = SharedStatus::new();
        let scheduler = Scheduler::new(
            Arc::new(clips),
            Clock::from_fps(60.0).unwrap(),
            Box::new(recorder.clone()),
            Box::new(status.clone()),
        );

        Self {
            scheduler,
            recorder,
            status,
            now: Instant::now(),
        }
    }

    fn start(&mut self, id: &str, clip: &str) -> Result<usize, CueError> {
        self.scheduler.start_at(id, clip, self.now)
    }

    /// Fires the pending tick exactly on its deadline.
    fn tick(&mut self) -> Option<Duration> {
        let deadline = self
            .scheduler
            .next_deadline()
            .expect("clock should be running");
        self.now = deadline;
        self.scheduler.tick(deadline)
    }

    fn ticks(&mut self, count: usize) {
        for _ in 0..count {
            self.tick();
        }
    }
}

#[test]
fn test_clip_plays_every_frame_then_completes() {
    let mut h = Harness::new();
    assert_eq!(h.start("cue-1", "A"), Ok(0));

    h.tick();
    h.tick();
    h.tick();
    assert_eq!(h.scheduler.tick_count(), 3);
    assert_eq!(
        h.recorder.take(),
        vec![frame("cue-1", 0), frame("cue-1", 1), frame("cue-1", 2)]
    );
    assert!(h.scheduler.registry().is_running("cue-1"));

    // Tick L+1 only reports completion
    assert_eq!(h.tick(), None);
    assert_eq!(h.recorder.take(), vec![completed("cue-1")]);
    assert!(h.scheduler.registry().is_empty());
    assert!(!h.scheduler.is_running());
    assert_eq!(h.scheduler.tick_count(), 0);
    assert_eq!(h.scheduler.next_deadline(), None);
}

#[test]
fn test_pause_then_resume_continues_after_last_frame() {
    let mut h = Harness::new();
    h.start("x", "A").unwrap();
    h.tick();
    assert_eq!(h.recorder.take(), vec![frame("x", 0)]);

    assert_eq!(h.scheduler.pause("x"), Ok(0));
    // Nothing running, so the clock resets
    assert!(!h.scheduler.is_running());
    assert_eq!(h.scheduler.tick_count(), 0);
    assert!(h.scheduler.registry().is_paused("x"));

    assert_eq!(h.start("x", "A"), Ok(1));
    h.ticks(3);
    assert_eq!(
        h.recorder.take(),
        vec![frame("x", 1), frame("x", 2), completed("x")]
    );
}

#[test]
fn test_resume_while_clock_keeps_running() {
    let mut h = Harness::new();
    h.start("bg", "long").unwrap();
    h.start("x", "B").unwrap();
    h.ticks(3);
    h.recorder.take();

    assert_eq!(h.scheduler.pause("x"), Ok(2));
    h.ticks(4);
    assert!(h
        .recorder
        .take()
        .iter()
        .all(|event| *event != frame("x", 3)));

    assert_eq!(h.start("x", "B"), Ok(3));
    h.tick();
    assert_eq!(h.recorder.take(), vec![frame("bg", 7), frame("x", 3)]);
}

#[test]
fn test_resume_with_other_clip_starts_over() {
    let mut h = Harness::new();
    h.start("x", "B").unwrap();
    h.ticks(2);
    h.scheduler.pause("x").unwrap();
    h.recorder.take();

    assert_eq!(h.start("x", "A"), Ok(0));
    h.tick();
    assert_eq!(h.recorder.take(), vec![frame("x", 0)]);
    assert_eq!(
        h.scheduler.registry().get("x").map(|cue| cue.clip_name().to_string()),
        Some("A".to_string())
    );
}

#[test]
fn test_instances_are_independent() {
    let mut h = Harness::new();
    h.start("one", "B").unwrap();
    h.ticks(2);
    h.start("two", "B").unwrap();
    h.tick();
    assert_eq!(
        h.recorder.take(),
        vec![
            frame("one", 0),
            frame("one", 1),
            frame("one", 2),
            frame("two", 0),
        ]
    );

    h.scheduler.stop("one").unwrap();
    h.ticks(2);
    assert_eq!(h.recorder.take(), vec![frame("two", 1), frame("two", 2)]);
    assert!(h.scheduler.is_running());
}

#[test]
fn test_restarting_running_id_starts_from_zero() {
    let mut h = Harness::new();
    h.start("x", "B").unwrap();
    h.ticks(3);
    h.recorder.take();

    assert_eq!(h.start("x", "B"), Ok(0));
    h.tick();
    assert_eq!(h.recorder.take(), vec![frame("x", 0)]);
    assert_eq!(h.scheduler.registry().running().count(), 1);
}

#[test]
fn test_stop_all_is_idempotent() {
    let mut h = Harness::new();
    h.start("a", "A").unwrap();
    h.start("b", "B").unwrap();
    h.tick();
    h.scheduler.pause("a").unwrap();

    assert_eq!(h.scheduler.stop_all(), 2);
    assert!(h.scheduler.registry().is_empty());
    assert!(!h.scheduler.is_running());
    assert_eq!(h.scheduler.tick_count(), 0);

    assert_eq!(h.scheduler.stop_all(), 0);
    assert!(h.status.cues().is_empty());
}

#[test]
fn test_hard_stop_blacks_out() {
    let mut h = Harness::new();
    h.start("a", "A").unwrap();
    h.tick();
    h.recorder.take();

    assert_eq!(h.scheduler.hard_stop(), 1);
    assert_eq!(h.recorder.take(), vec![Event::Blackout]);
    assert!(!h.scheduler.is_running());
}

#[test]
fn test_unknown_operations_change_nothing() {
    let mut h = Harness::new();

    assert_eq!(
        h.start("x", "nope"),
        Err(CueError::UnknownClip("nope".to_string()))
    );
    assert!(!h.scheduler.is_running());
    assert!(h.scheduler.registry().is_empty());

    assert_eq!(
        h.scheduler.pause("x"),
        Err(CueError::UnknownInstance("x".to_string()))
    );
    assert_eq!(
        h.scheduler.stop("x"),
        Err(CueError::UnknownInstance("x".to_string()))
    );
}

#[test]
fn test_stop_is_idempotent_for_paused_instances() {
    let mut h = Harness::new();
    h.start("x", "A").unwrap();
    h.tick();
    h.scheduler.pause("x").unwrap();

    assert_eq!(h.scheduler.stop("x"), Ok(()));
    assert!(h.scheduler.stop("x").is_err());
    assert!(h.scheduler.registry().is_empty());

    // Position is gone, so the next start begins at 0
    assert_eq!(h.start("x", "A"), Ok(0));
}

#[test]
fn test_tick_counter_resets_whenever_nothing_runs() {
    let mut h = Harness::new();
    h.start("a", "B").unwrap();
    h.ticks(2);
    assert_eq!(h.scheduler.tick_count(), 2);

    h.scheduler.pause_all();
    assert_eq!(h.scheduler.tick_count(), 0);
    assert!(!h.scheduler.is_running());

    h.start("b", "A").unwrap();
    assert_eq!(h.scheduler.tick_count(), 0);
    h.tick();
    assert_eq!(h.scheduler.tick_count(), 1);
}

#[test]
fn test_late_tick_stays_on_grid() {
    let mut h = Harness::new();
    let period = Duration::from_secs_f64(1.0 / 60.0);
    let start = h.now;
    h.start("a", "long").unwrap();

    let first = h.scheduler.next_deadline().unwrap();
    assert_eq!(first, start + period);

    let late = first + Duration::from_millis(5);
    let delay = h.scheduler.tick(late).unwrap();
    assert_eq!(delay, period - Duration::from_millis(5));
    assert_eq!(h.scheduler.next_deadline(), Some(start + period * 2));

    // A tick later than a whole period fires the next one immediately
    let very_late = start + period * 4;
    assert_eq!(h.scheduler.tick(very_late), Some(Duration::ZERO));
}

#[test]
fn test_snapshot_lists_running_then_paused() {
    let mut h = Harness::new();
    h.start("z", "long").unwrap();
    h.start("b", "long").unwrap();
    h.start("a", "long").unwrap();
    h.ticks(2);
    h.scheduler.pause("b").unwrap();
    h.scheduler.pause("a").unwrap();
    h.tick();

    let cues = h.status.cues();
    let order: Vec<(&str, CuePhase)> = cues
        .iter()
        .map(|cue| (cue.id.as_str(), cue.state))
        .collect();
    assert_eq!(
        order,
        vec![
            ("z", CuePhase::Running),
            ("a", CuePhase::Paused),
            ("b", CuePhase::Paused),
        ]
    );
    assert_eq!(cues[0].current_frame, 2);
    assert_eq!(cues[0].total_frames, 99);
    assert_eq!(cues[1].current_frame, 1);
}

#[test]
fn test_missing_frame_does_not_stall_other_cues() {
    let mut h = Harness::new();
    h.start("hole", "empty").unwrap();
    h.start("ok", "A").unwrap();

    h.tick();
    assert_eq!(h.recorder.take(), vec![frame("ok", 0)]);
    assert!(h.scheduler.registry().is_running("hole"));

    h.tick();
    assert_eq!(h.recorder.take(), vec![completed("hole"), frame("ok", 1)]);
    assert_eq!(h.scheduler.registry().running().count(), 1);
}
