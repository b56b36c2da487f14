//! Per-connection worker for the Rivet FTP server.
//!
//! Each accepted control connection gets one worker task that owns the
//! session state, reads CRLF-terminated command lines, and writes the
//! replies produced by the dispatcher.

use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::auth::CredentialTable;
use crate::config::ServerConfig;
use crate::protocol::responses::{self, Reply};
use crate::protocol::{dispatch, parse_line};
use crate::session::Session;

/// Runs the command loop for one control connection until the client
/// quits, disconnects, or a control-channel I/O error occurs.
pub async fn handle_session(
    stream: TcpStream,
    credentials: Arc<CredentialTable>,
    config: Arc<ServerConfig>,
) -> std::io::Result<()> {
    let peer_addr = stream.peer_addr()?;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    let mut session = Session::new(peer_addr, cwd);

    let greeting = Reply::new(responses::READY, "Welcome to Rivet FTP Server");
    writer.write_all(greeting.line().as_bytes()).await?;
    writer.flush().await?;

    let mut line = String::new();
    loop {
        line.clear();
        let bytes = match reader.read_line(&mut line).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read from client {}: {}", peer_addr, e);
                return Err(e);
            }
        };
        if bytes == 0 {
            info!("Connection closed by client {}", peer_addr);
            break;
        }

        if line.len() > config.max_command_length {
            warn!("Client {} sent an oversized command line", peer_addr);
            let reply = Reply::new(responses::COMMAND_UNRECOGNIZED, "Command line too long.");
            writer.write_all(reply.line().as_bytes()).await?;
            writer.flush().await?;
            continue;
        }

        let command = parse_line(&line);
        if command.verb == "PASS" {
            info!("Client {} sent PASS", peer_addr);
        } else {
            info!("Client {} sent {}", peer_addr, line.trim_end());
        }

        let reply = dispatch(&mut session, &command, &mut writer, &credentials, &config).await;
        info!("Replying to {}: {} {}", peer_addr, reply.code, reply.text);

        writer.write_all(reply.line().as_bytes()).await?;
        writer.flush().await?;

        if reply.code == responses::CLOSING {
            break;
        }
    }

    if session.has_data_channel() {
        info!("Dropping unused data channel for {}", peer_addr);
    }
    Ok(())
}
