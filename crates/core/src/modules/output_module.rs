use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::traits::{AsyncModule, ModuleEvent, ModuleId, ModuleMessage};
use crate::artnet::artnet::ArtNet;
use crate::artnet::network_config::NetworkConfig;

/// Transmits universes over Art-Net as soon as playback produces them, and re-sends the
/// last data per universe on a keep-alive interval so receivers don't time out.
pub struct OutputModule {
    artnet: Option<ArtNet>,
    network_config: NetworkConfig,
    keepalive: Duration,
    packets_sent: u64,
    send_errors: u64,
    universes: usize,
}

impl OutputModule {
    pub fn new(network_config: NetworkConfig, keepalive: Duration) -> Self {
        Self {
            artnet: None,
            network_config,
            keepalive,
            packets_sent: 0,
            send_errors: 0,
            universes: 0,
        }
    }

    fn transmit(&mut self, universe: u16, data: Vec<u8>) {
        let Some(artnet) = self.artnet.as_ref() else {
            return;
        };

        match artnet.send_data(universe, data) {
            Ok(()) => self.packets_sent += 1,
            Err(e) => {
                // Only the first failure in a run is worth a warning
                if self.send_errors == 0 {
                    log::warn!("Art-Net send to universe {} failed: {}", universe, e);
                }
                self.send_errors += 1;
            }
        }
    }
}

#[async_trait]
impl AsyncModule for OutputModule {
    fn id(&self) -> ModuleId {
        ModuleId::Output
    }

    async fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        log::info!(
            "Initializing output module ({}): {}",
            self.network_config.get_mode_string(),
            self.network_config.get_destination()
        );

        let artnet = ArtNet::new(&self.network_config)?;
        self.artnet = Some(artnet);

        Ok(())
    }

    async fn run(
        &mut self,
        mut rx: mpsc::Receiver<ModuleEvent>,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.artnet.is_none() {
            return Err("Output module not initialized".into());
        }

        let mut keepalive = interval(self.keepalive);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_dmx_data: HashMap<u16, Vec<u8>> = HashMap::new();
        let mut last_reported = 0;

        let _ = tx
            .send(ModuleMessage::Status(format!(
                "Output module sending to {}",
                self.network_config.get_destination()
            )))
            .await;

        loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(ModuleEvent::DmxOutput(universe, data)) => {
                            self.transmit(universe, data.clone());
                            last_dmx_data.insert(universe, data);
                            self.universes = last_dmx_data.len();
                        }
                        Some(ModuleEvent::Shutdown) | None => {
                            log::info!("Output module received shutdown signal");
                            break;
                        }
                        Some(_) => {}
                    }
                }

                _ = keepalive.tick() => {
                    let universes: Vec<(u16, Vec<u8>)> = last_dmx_data
                        .iter()
                        .map(|(universe, data)| (*universe, data.clone()))
                        .collect();
                    for (universe, data) in universes {
                        self.transmit(universe, data);
                    }

                    if self.send_errors != last_reported {
                        let _ = tx.try_send(ModuleMessage::Error(format!(
                            "Art-Net: {} failed sends so far",
                            self.send_errors
                        )));
                        last_reported = self.send_errors;
                    }
                }
            }
        }

        log::info!(
            "Output module shutting down after sending {} packets",
            self.packets_sent
        );
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.artnet = None;
        log::info!("Output module shutdown complete");
        Ok(())
    }

    fn status(&self) -> HashMap<String, String> {
        HashMap::from([
            (
                "mode".to_string(),
                self.network_config.get_mode_string().to_string(),
            ),
            (
                "destination".to_string(),
                self.network_config.get_destination(),
            ),
            ("packets_sent".to_string(), self.packets_sent.to_string()),
            ("send_errors".to_string(), self.send_errors.to_string()),
            ("universes".to_string(), self.universes.to_string()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

    use super::*;
    use crate::artnet::artnet::ArtNetMode;

    #[tokio::test]
    async fn test_forwards_universes_over_udp() {
        let receiver = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        receiver
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        // Sender on an ephemeral port so it doesn't collide with the receiver
        let config = NetworkConfig {
            source_ip: Ipv4Addr::LOCALHOST.into(),
            mode: ArtNetMode::Unicast(
                SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0),
                SocketAddr::new(Ipv4Addr::LOCALHOST.into(), port),
            ),
            port,
        };

        let mut module = OutputModule::new(config, Duration::from_secs(60));
        module.initialize().await.unwrap();

        let (event_tx, event_rx) = mpsc::channel(8);
        let (message_tx, _message_rx) = mpsc::channel(8);
        let handle = tokio::spawn(async move { module.run(event_rx, message_tx).await.is_ok() });

        event_tx
            .send(ModuleEvent::DmxOutput(1200, vec![10, 20, 30, 40]))
            .await
            .unwrap();

        let packet = tokio::task::spawn_blocking(move || {
            let mut buf = [0u8; 1024];
            let (len, _) = receiver.recv_from(&mut buf).unwrap();
            buf[..len].to_vec()
        })
        .await
        .unwrap();

        assert_eq!(&packet[..8], b"Art-Net\0");
        assert_eq!(u16::from_le_bytes([packet[14], packet[15]]), 1200);
        assert_eq!(&packet[18..22], &[10, 20, 30, 40]);

        event_tx.send(ModuleEvent::Shutdown).await.unwrap();
        assert!(handle.await.unwrap());
    }
}
