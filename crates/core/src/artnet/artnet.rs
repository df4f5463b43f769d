use std::net::{SocketAddr, UdpSocket};

use artnet_protocol::{ArtCommand, Output, PortAddress};
use thiserror::Error;

use super::network_config::NetworkConfig;

/// Number of DMX slots in one Art-Net universe.
pub const UNIVERSE_SIZE: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ArtNetMode {
    Broadcast,
    /// Source address, destination address.
    Unicast(SocketAddr, SocketAddr),
}

#[derive(Debug, Error)]
pub enum ArtNetError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("universe {0} is outside the 15-bit Art-Net port address range")]
    InvalidUniverse(u16),

    #[error("failed to encode Art-Net packet: {0}")]
    Encode(String),
}

/// Sends ArtDmx packets over UDP.
#[derive(Debug)]
pub struct ArtNet {
    socket: UdpSocket,
    destination: SocketAddr,
}

impl ArtNet {
    pub fn new(config: &NetworkConfig) -> Result<Self, ArtNetError> {
        let bind_addr = config.bind_addr();
        let socket = match UdpSocket::bind(bind_addr) {
            Ok(socket) => socket,
            Err(e) => {
                log::warn!(
                    "Could not bind Art-Net socket to {} ({}), using an ephemeral port",
                    bind_addr,
                    e
                );
                UdpSocket::bind(SocketAddr::new(bind_addr.ip(), 0))?
            }
        };

        if config.mode == ArtNetMode::Broadcast {
            socket.set_broadcast(true)?;
        }

        Ok(Self {
            socket,
            destination: config.destination_addr(),
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Sends one universe of DMX data (at most 512 slots).
    pub fn send_data(&self, universe: u16, data: Vec<u8>) -> Result<(), ArtNetError> {
        let bytes = encode_output(universe, data)?;
        self.socket.send_to(&bytes, self.destination)?;
        Ok(())
    }
}

/// Builds an ArtDmx packet for `universe`.
pub fn encode_output(universe: u16, mut data: Vec<u8>) -> Result<Vec<u8>, ArtNetError> {
    let port_address =
        PortAddress::try_from(universe).map_err(|_| ArtNetError::InvalidUniverse(universe))?;
    data.truncate(UNIVERSE_SIZE);

    let command = ArtCommand::Output(Output {
        port_address,
        data: data.into(),
        ..Output::default()
    });

    command
        .write_to_buffer()
        .map_err(|e| ArtNetError::Encode(format!("{:?}", e)))
}
