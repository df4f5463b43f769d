use std::fmt::Write;

use cuelight_core::{frame_to_universes, ArtNet, Clip, Frame, NetworkConfig, Settings};

/// Fixtures on the rig, each taking three consecutive channels.
pub const LIGHT_COUNT: usize = 96;

/// RGB of a 0-based light. Channels the frame doesn't cover read as 0.
pub fn light_rgb(frame: &Frame, light: usize) -> (u8, u8, u8) {
    let first = light * 3 + 1;
    let value = |channel: usize| frame.channel(channel).unwrap_or(0);
    (value(first), value(first + 1), value(first + 2))
}

/// A frame with only `light` lit, used to walk the rig one fixture at a time.
pub fn isolate_light(frame: &Frame, light: usize) -> Frame {
    let mut values = vec![0; LIGHT_COUNT * 3];
    let (r, g, b) = light_rgb(frame, light);
    if let Some(slots) = values.get_mut(light * 3..light * 3 + 3) {
        slots.copy_from_slice(&[r, g, b]);
    }
    Frame::new(values)
}

/// Renders per-light RGB values for frames `start..start + count` of `clip`.
pub fn light_table(clip: &Clip, lights: &[usize], start: usize, count: Option<usize>) -> String {
    let end = match count {
        Some(count) => start.saturating_add(count).min(clip.len()),
        None => clip.len(),
    };

    let mut out = String::new();
    let _ = write!(out, "{:<6}", "Frame");
    for light in lights {
        let _ = write!(out, " {:^13}", format!("L{}", light));
    }
    out.push('\n');

    for index in start..end {
        let Some(frame) = clip.frame(index) else {
            break;
        };
        let _ = write!(out, "{:<6}", index);
        for &light in lights {
            let (r, g, b) = light_rgb(frame, light);
            let _ = write!(out, " ({:>3},{:>3},{:>3})", r, g, b);
        }
        out.push('\n');
    }

    out
}

/// Sends one frame straight to the network, bypassing playback.
pub fn send_frame(settings: &Settings, frame: &Frame, brightness: f32) -> anyhow::Result<()> {
    let artnet = ArtNet::new(&NetworkConfig::from_settings(settings))?;
    for (universe, data) in frame_to_universes(frame, settings.start_universe, brightness) {
        artnet.send_data(universe, data)?;
    }
    Ok(())
}
