use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use super::artnet::ArtNetMode;

/// Where Art-Net output goes.
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkConfig {
    pub source_ip: IpAddr,
    pub mode: ArtNetMode,
    pub port: u16,
}

impl NetworkConfig {
    pub fn new(
        source_ip: IpAddr,
        dest_ip: Option<IpAddr>,
        artnet_port: u16,
        broadcast: bool,
    ) -> Self {
        let mode = if broadcast {
            ArtNetMode::Broadcast
        } else {
            match dest_ip {
                Some(ip) => ArtNetMode::Unicast(
                    SocketAddr::new(source_ip, artnet_port),
                    SocketAddr::new(ip, artnet_port),
                ),
                None => ArtNetMode::Broadcast,
            }
        };

        NetworkConfig {
            source_ip,
            mode,
            port: artnet_port,
        }
    }

    /// Builds the output config from persisted settings, falling back to broadcast from any
    /// interface when addresses don't parse.
    pub fn from_settings(settings: &crate::Settings) -> Self {
        let source_ip = settings
            .artnet_source_ip
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let dest_ip = settings.artnet_dest_ip.parse().ok();

        Self::new(
            source_ip,
            dest_ip,
            settings.artnet_port,
            settings.artnet_broadcast,
        )
    }

    pub fn bind_addr(&self) -> SocketAddr {
        match self.mode {
            ArtNetMode::Unicast(source, _) => source,
            ArtNetMode::Broadcast => SocketAddr::new(self.source_ip, self.port),
        }
    }

    pub fn destination_addr(&self) -> SocketAddr {
        match self.mode {
            ArtNetMode::Unicast(_, destination) => destination,
            ArtNetMode::Broadcast => {
                SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), self.port)
            }
        }
    }

    pub fn get_mode_string(&self) -> &str {
        match self.mode {
            ArtNetMode::Unicast(_, _) => "unicast",
            ArtNetMode::Broadcast => "broadcast",
        }
    }

    pub fn get_destination(&self) -> String {
        match self.mode {
            ArtNetMode::Unicast(src, destination) => {
                format!("{}:{} -> {}:{}", src.ip(), self.port, destination.ip(), self.port)
            }
            ArtNetMode::Broadcast => format!("255.255.255.255:{}", self.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;

    #[test]
    fn test_broadcast_flag_wins() {
        let config = NetworkConfig::new(
            "10.0.0.1".parse().unwrap(),
            Some("10.0.0.2".parse().unwrap()),
            6454,
            true,
        );
        assert_eq!(config.mode, ArtNetMode::Broadcast);
        assert_eq!(config.get_mode_string(), "broadcast");
        assert_eq!(config.destination_addr().to_string(), "255.255.255.255:6454");
    }

    #[test]
    fn test_unicast_from_settings() {
        let settings = Settings {
            artnet_broadcast: false,
            artnet_source_ip: "10.0.0.1".to_string(),
            artnet_dest_ip: "10.0.0.2".to_string(),
            ..Settings::default()
        };

        let config = NetworkConfig::from_settings(&settings);
        assert_eq!(config.get_mode_string(), "unicast");
        assert_eq!(config.destination_addr().to_string(), "10.0.0.2:6454");
        assert_eq!(config.get_destination(), "10.0.0.1:6454 -> 10.0.0.2:6454");
    }

    #[test]
    fn test_unicast_without_destination_broadcasts() {
        let settings = Settings {
            artnet_broadcast: false,
            ..Settings::default()
        };
        assert_eq!(
            NetworkConfig::from_settings(&settings).mode,
            ArtNetMode::Broadcast
        );
    }
}
