use std::collections::HashMap;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use super::traits::{AsyncModule, ModuleEvent, ModuleId, ModuleMessage};
use crate::osc::cue_message::decode_datagram;

// Larger than any QLab event datagram
const MAX_DATAGRAM: usize = 8192;

/// Listens for QLab workspace events over UDP and turns them into cue commands.
pub struct OscModule {
    listen_addr: SocketAddr,
    socket: Option<UdpSocket>,
    received: u64,
}

impl OscModule {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            socket: None,
            received: 0,
        }
    }

    /// Address actually bound, once initialized.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|socket| socket.local_addr().ok())
    }
}

#[async_trait]
impl AsyncModule for OscModule {
    fn id(&self) -> ModuleId {
        ModuleId::CueInput
    }

    async fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let socket = UdpSocket::bind(self.listen_addr).await?;
        let local_addr = socket.local_addr()?;
        log::info!("Listening for OSC cue events on {}", local_addr);

        self.listen_addr = local_addr;
        self.socket = Some(socket);
        Ok(())
    }

    async fn run(
        &mut self,
        mut rx: mpsc::Receiver<ModuleEvent>,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(socket) = self.socket.take() else {
            return Err("OSC module not initialized".into());
        };

        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(ModuleEvent::Shutdown) | None => {
                            log::info!("OSC module received shutdown signal");
                            break;
                        }
                        Some(_) => {}
                    }
                }

                received = socket.recv_from(&mut buf) => {
                    let (len, from) = match received {
                        Ok(received) => received,
                        Err(e) => {
                            log::warn!("OSC receive failed: {}", e);
                            continue;
                        }
                    };
                    self.received += 1;

                    let commands = match decode_datagram(&buf[..len]) {
                        Ok(commands) => commands,
                        Err(e) => {
                            log::warn!("Dropping malformed OSC packet from {}: {:?}", from, e);
                            continue;
                        }
                    };

                    for command in commands {
                        log::debug!("OSC {} -> {}", from, command);
                        if tx.send(ModuleMessage::Event(ModuleEvent::Cue(command))).await.is_err() {
                            log::warn!("Module manager is gone, dropping cue command");
                        }
                    }
                }
            }
        }

        self.socket = Some(socket);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.socket = None;
        log::info!("OSC module shutdown complete");
        Ok(())
    }

    fn status(&self) -> HashMap<String, String> {
        HashMap::from([
            ("listen_addr".to_string(), self.listen_addr.to_string()),
            ("packets_received".to_string(), self.received.to_string()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use rosc::{OscMessage, OscPacket, OscType};

    use super::*;
    use crate::CueCommand;

    #[tokio::test]
    async fn test_forwards_cue_commands() {
        let mut module = OscModule::new("127.0.0.1:0".parse().unwrap());
        module.initialize().await.unwrap();
        let addr = module.local_addr().unwrap();

        let (event_tx, event_rx) = mpsc::channel(8);
        let (message_tx, mut message_rx) = mpsc::channel(8);
        let handle = tokio::spawn(async move { module.run(event_rx, message_tx).await.is_ok() });

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"garbage", addr).await.unwrap();

        let packet = OscPacket::Message(OscMessage {
            addr: "/qlab/event/workspace/cue/stop".to_string(),
            args: vec![OscType::String("4".to_string())],
        });
        let bytes = rosc::encoder::encode(&packet).unwrap();
        sender.send_to(&bytes, addr).await.unwrap();

        match message_rx.recv().await.unwrap() {
            ModuleMessage::Event(ModuleEvent::Cue(command)) => {
                assert_eq!(command, CueCommand::Stop { id: "4".to_string() });
            }
            other => panic!("unexpected message {:?}", other),
        }

        event_tx.send(ModuleEvent::Shutdown).await.unwrap();
        assert!(handle.await.unwrap());
    }
}
