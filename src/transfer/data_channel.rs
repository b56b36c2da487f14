//! Module `data_channel`
//!
//! Negotiates and drives the secondary connection used by RETR, STOR,
//! and LIST. A `DataChannel` describes exactly one forthcoming
//! transfer: passive mode holds a bound listener the client will dial,
//! active mode holds the address the server will dial. `send` and
//! `receive` take the channel by value, so a descriptor never outlives
//! its single transfer attempt.

use log::{debug, info};
use std::net::{IpAddr, SocketAddr};
use std::ops::Range;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::TransferError;

pub enum DataChannel {
    /// Server listens; the client connects to the advertised port.
    Passive { listener: TcpListener },
    /// Server dials the client's advertised port at its control address.
    Active { target: SocketAddr },
}

/// Binds a data listener on the first free port in `range`.
///
/// Returns the bound port for the 227/229 reply along with the channel.
pub async fn open_passive(
    host: IpAddr,
    range: Range<u16>,
) -> Result<(u16, DataChannel), TransferError> {
    for port in range {
        match TcpListener::bind(SocketAddr::new(host, port)).await {
            Ok(listener) => {
                debug!("Data listener bound on {}:{}", host, port);
                return Ok((port, DataChannel::Passive { listener }));
            }
            Err(_) => continue,
        }
    }
    Err(TransferError::NoAvailablePort)
}

/// Records the dial target for active mode. No connection is made until
/// the transfer itself.
pub fn open_active(target: SocketAddr) -> DataChannel {
    DataChannel::Active { target }
}

impl DataChannel {
    /// Establishes the actual connection: accept for passive mode,
    /// connect for active mode.
    async fn resolve(self) -> Result<TcpStream, TransferError> {
        match self {
            DataChannel::Passive { listener } => {
                let (stream, peer) = listener.accept().await.map_err(TransferError::Accept)?;
                info!("Data connection accepted from {}", peer);
                Ok(stream)
            }
            DataChannel::Active { target } => {
                let stream = TcpStream::connect(target)
                    .await
                    .map_err(TransferError::Connect)?;
                info!("Data connection established to {}", target);
                Ok(stream)
            }
        }
    }

    /// Sends `payload` followed by a terminating CRLF, then closes.
    pub async fn send(self, payload: &[u8]) -> Result<(), TransferError> {
        let mut stream = self.resolve().await?;
        stream.write_all(payload).await?;
        stream.write_all(b"\r\n").await?;
        stream.shutdown().await?;
        Ok(())
    }

    /// Reads until the peer closes, returning everything it sent.
    pub async fn receive(self) -> Result<Vec<u8>, TransferError> {
        let mut stream = self.resolve().await?;
        let mut payload = Vec::new();
        stream.read_to_end(&mut payload).await?;
        Ok(payload)
    }
}
