use rosc::{OscMessage, OscPacket, OscType};

use crate::CueCommand;

/// Prefix of the workspace events QLab broadcasts.
pub const QLAB_EVENT_PREFIX: &str = "/qlab/event/workspace/";

// QLab may append which cue property the first argument carries
const CUE_FEATURES: [&str; 4] = ["number", "name", "uniqueID", "type"];

/// Decodes a UDP datagram into the cue commands it carries. Bundles are flattened.
pub fn decode_datagram(buf: &[u8]) -> Result<Vec<CueCommand>, rosc::OscError> {
    let (_, packet) = rosc::decoder::decode_udp(buf)?;

    let mut commands = Vec::new();
    collect_commands(packet, &mut commands);
    Ok(commands)
}

fn collect_commands(packet: OscPacket, commands: &mut Vec<CueCommand>) {
    match packet {
        OscPacket::Message(message) => {
            if let Some(command) = command_from_message(&message) {
                commands.push(command);
            }
        }
        OscPacket::Bundle(bundle) => {
            for packet in bundle.content {
                collect_commands(packet, commands);
            }
        }
    }
}

/// Maps one OSC message to a cue command.
///
/// Cue-level events take the instance id as their first argument and an optional clip name
/// as the second; without one the id doubles as the clip name.
pub fn command_from_message(message: &OscMessage) -> Option<CueCommand> {
    let Some(event) = message.addr.strip_prefix(QLAB_EVENT_PREFIX) else {
        log::debug!("Ignoring OSC message {}", message.addr);
        return None;
    };

    let event = CUE_FEATURES
        .iter()
        .find_map(|feature| {
            event
                .strip_suffix(feature)
                .and_then(|rest| rest.strip_suffix('/'))
        })
        .unwrap_or(event);

    match event {
        "pauseAll" => return Some(CueCommand::PauseAll),
        "stopAll" => return Some(CueCommand::StopAll),
        "panicAll" | "hardStopAll" => return Some(CueCommand::HardStop),
        "go" | "auditionGo" | "cue/start" | "cue/stop" | "cue/pause" => {}
        _ => {
            log::debug!("Ignoring QLab event {}", message.addr);
            return None;
        }
    }

    let mut args = message.args.iter().filter_map(argument_text);
    let Some(id) = args.next() else {
        log::warn!("QLab event {} carried no cue id", message.addr);
        return None;
    };

    Some(match event {
        "cue/stop" => CueCommand::Stop { id },
        "cue/pause" => CueCommand::Pause { id },
        _ => {
            let clip = args.next().unwrap_or_else(|| id.clone());
            CueCommand::Start { id, clip }
        }
    })
}

fn argument_text(arg: &OscType) -> Option<String> {
    let text = match arg {
        OscType::String(value) => value.trim().to_string(),
        OscType::Int(value) => value.to_string(),
        OscType::Long(value) => value.to_string(),
        OscType::Float(value) => value.to_string(),
        OscType::Double(value) => value.to_string(),
        _ => return None,
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use rosc::{OscBundle, OscTime};

    use super::*;

    fn message(addr: &str, args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: addr.to_string(),
            args,
        }
    }

    fn encode(packet: &OscPacket) -> Vec<u8> {
        rosc::encoder::encode(packet).unwrap()
    }

    #[test]
    fn test_start_with_clip_name() {
        let msg = message(
            "/qlab/event/workspace/cue/start",
            vec![OscType::String("7".into()), OscType::String("sunrise".into())],
        );
        assert_eq!(
            command_from_message(&msg),
            Some(CueCommand::Start {
                id: "7".to_string(),
                clip: "sunrise".to_string()
            })
        );
    }

    #[test]
    fn test_go_defaults_clip_to_id() {
        let msg = message("/qlab/event/workspace/go/number", vec![OscType::Int(12)]);
        assert_eq!(
            command_from_message(&msg),
            Some(CueCommand::Start {
                id: "12".to_string(),
                clip: "12".to_string()
            })
        );
    }

    #[test]
    fn test_stop_pause_and_global_events() {
        let stop = message("/qlab/event/workspace/cue/stop", vec![OscType::String("a".into())]);
        let pause = message("/qlab/event/workspace/cue/pause/name", vec![OscType::String("a".into())]);

        assert_eq!(
            command_from_message(&stop),
            Some(CueCommand::Stop { id: "a".to_string() })
        );
        assert_eq!(
            command_from_message(&pause),
            Some(CueCommand::Pause { id: "a".to_string() })
        );
        assert_eq!(
            command_from_message(&message("/qlab/event/workspace/pauseAll", vec![])),
            Some(CueCommand::PauseAll)
        );
        assert_eq!(
            command_from_message(&message("/qlab/event/workspace/stopAll", vec![])),
            Some(CueCommand::StopAll)
        );
        assert_eq!(
            command_from_message(&message("/qlab/event/workspace/hardStopAll", vec![])),
            Some(CueCommand::HardStop)
        );
        assert_eq!(
            command_from_message(&message("/qlab/event/workspace/panicAll", vec![])),
            Some(CueCommand::HardStop)
        );
    }

    #[test]
    fn test_ignored_messages() {
        assert_eq!(command_from_message(&message("/other", vec![])), None);
        assert_eq!(
            command_from_message(&message(
                "/qlab/event/workspace/playhead",
                vec![OscType::String("3".into())]
            )),
            None
        );
        // Cue event without an id
        assert_eq!(
            command_from_message(&message("/qlab/event/workspace/cue/start", vec![])),
            None
        );
    }

    #[test]
    fn test_decode_bundle() {
        let bundle = OscPacket::Bundle(OscBundle {
            timetag: OscTime::from((0, 1)),
            content: vec![
                OscPacket::Message(message(
                    "/qlab/event/workspace/cue/start",
                    vec![OscType::String("a".into())],
                )),
                OscPacket::Message(message("/qlab/event/workspace/stopAll", vec![])),
            ],
        });

        let commands = decode_datagram(&encode(&bundle)).unwrap();
        assert_eq!(
            commands,
            vec![
                CueCommand::Start {
                    id: "a".to_string(),
                    clip: "a".to_string()
                },
                CueCommand::StopAll,
            ]
        );
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode_datagram(b"not osc").is_err());
    }
}
