use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use super::traits::{AsyncModule, ModuleEvent, ModuleId, ModuleMessage};
use crate::{CueCommand, Scheduler};

/// Owns the scheduler and serializes cue commands with clock ticks.
///
/// Every playback mutation happens on this module's task, so the scheduler needs no locks.
pub struct PlaybackModule {
    scheduler: Scheduler,
    commands_handled: u64,
}

impl PlaybackModule {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            commands_handled: 0,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    fn apply(&mut self, command: CueCommand) {
        log::debug!("Cue command: {}", command);
        self.commands_handled += 1;

        let result = match command {
            CueCommand::Start { id, clip } => self.scheduler.start(&id, &clip).map(|_| ()),
            CueCommand::Stop { id } => self.scheduler.stop(&id),
            CueCommand::Pause { id } => self.scheduler.pause(&id).map(|_| ()),
            CueCommand::PauseAll => {
                self.scheduler.pause_all();
                Ok(())
            }
            CueCommand::StopAll => {
                self.scheduler.stop_all();
                Ok(())
            }
            CueCommand::HardStop => {
                self.scheduler.hard_stop();
                Ok(())
            }
        };

        // Logged once, at the error's own level
        if let Err(e) = result {
            log::log!(e.level(), "{}", e);
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[async_trait]
impl AsyncModule for PlaybackModule {
    fn id(&self) -> ModuleId {
        ModuleId::Playback
    }

    async fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let clips = self.scheduler.clips();
        log::info!("Playback ready with {} clips", clips.len());
        if clips.is_empty() {
            log::warn!("No clips loaded, every start request will fail");
        }

        Ok(())
    }

    async fn run(
        &mut self,
        mut rx: mpsc::Receiver<ModuleEvent>,
        _tx: mpsc::Sender<ModuleMessage>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        loop {
            let deadline = self.scheduler.next_deadline();

            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(ModuleEvent::Cue(command)) => self.apply(command),
                        Some(ModuleEvent::Shutdown) | None => {
                            log::info!("Playback module received shutdown signal");
                            break;
                        }
                        Some(_) => {}
                    }
                }

                _ = wait_for(deadline) => {
                    self.scheduler.tick(Instant::now());
                }
            }
        }

        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let removed = self.scheduler.stop_all();
        if removed > 0 {
            log::info!("Discarded {} cues on shutdown", removed);
        }

        Ok(())
    }

    fn status(&self) -> HashMap<String, String> {
        let registry = self.scheduler.registry();
        HashMap::from([
            ("running".to_string(), registry.running().count().to_string()),
            ("paused".to_string(), registry.paused().count().to_string()),
            ("tick".to_string(), self.scheduler.tick_count().to_string()),
            ("commands".to_string(), self.commands_handled.to_string()),
        ])
    }
}
