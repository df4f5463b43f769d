use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::artnet::artnet::UNIVERSE_SIZE;
use crate::modules::ModuleEvent;
use crate::{DispatchSink, Frame};

/// Splits a frame into consecutive universes after applying `brightness`.
///
/// Channel 1 lands in slot 1 of `start_universe`, channel 513 in slot 1 of the next one.
/// Universes past the 16-bit range are dropped.
pub fn frame_to_universes(frame: &Frame, start_universe: u16, brightness: f32) -> Vec<(u16, Vec<u8>)> {
    let scaled = frame.scaled(brightness);
    let universe_count = scaled.len().div_ceil(UNIVERSE_SIZE);

    (0..universe_count)
        .map_while(|index| {
            let universe = start_universe.checked_add(u16::try_from(index).ok()?)?;
            let first_channel = index * UNIVERSE_SIZE + 1;
            let mut data = vec![0; (scaled.len() - index * UNIVERSE_SIZE).min(UNIVERSE_SIZE)];
            scaled.write_into(&mut data, first_channel);
            Some((universe, data))
        })
        .collect()
}

/// Forwards dispatched frames to the output module without waiting on it.
pub struct ArtNetSink {
    output: mpsc::Sender<ModuleEvent>,
    start_universe: u16,
    brightness: f32,
    blackout_channels: usize,
    dropped: u64,
}

impl ArtNetSink {
    pub fn new(
        output: mpsc::Sender<ModuleEvent>,
        start_universe: u16,
        brightness: f32,
        blackout_channels: usize,
    ) -> Self {
        Self {
            output,
            start_universe,
            brightness: brightness.clamp(0.0, 1.0),
            blackout_channels,
            dropped: 0,
        }
    }

    pub fn from_settings(output: mpsc::Sender<ModuleEvent>, settings: &crate::Settings) -> Self {
        Self::new(
            output,
            settings.start_universe,
            settings.brightness,
            settings.blackout_channels,
        )
    }

    /// Frames dropped because the output module fell behind or went away.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn send(&mut self, frame: &Frame, brightness: f32) {
        for (universe, data) in frame_to_universes(frame, self.start_universe, brightness) {
            match self.output.try_send(ModuleEvent::DmxOutput(universe, data)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped += 1;
                    log::debug!("Output busy, dropped universe {} update", universe);
                }
                Err(TrySendError::Closed(_)) => {
                    if self.dropped == 0 {
                        log::warn!("Output module is gone, frames are being discarded");
                    }
                    self.dropped += 1;
                }
            }
        }
    }
}

impl DispatchSink for ArtNetSink {
    fn on_frame(&mut self, _id: &str, frame: &Frame) {
        self.send(frame, self.brightness);
    }

    fn on_completed(&mut self, id: &str) {
        log::debug!("Cue '{}' released its output", id);
    }

    fn blackout(&mut self) {
        let frame = Frame::blank(self.blackout_channels);
        self.send(&frame, 1.0);
    }
}
