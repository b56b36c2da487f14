//! Core server loop for the Rivet FTP server.
//!
//! Binds the control listener and spawns one worker task per accepted
//! connection. The credential table and configuration are shared
//! read-only across workers.

use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::auth::CredentialTable;
use crate::config::ServerConfig;
use crate::session::handle_session;

pub struct Server {
    listener: TcpListener,
    credentials: Arc<CredentialTable>,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Binds the control listener at the configured address.
    pub async fn bind(config: ServerConfig, credentials: CredentialTable) -> std::io::Result<Self> {
        let socket = config.control_socket();
        let listener = TcpListener::bind(&socket).await?;
        info!("Server bound to {}", socket);

        Ok(Self {
            listener,
            credentials: Arc::new(credentials),
            config: Arc::new(config),
        })
    }

    /// Address the control listener is bound to. With port 0 in the
    /// configuration this reports the kernel-assigned port.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until the process exits.
    pub async fn run(self) -> std::io::Result<()> {
        info!(
            "Starting Rivet FTP server on {} ({} users)",
            self.listener.local_addr()?,
            self.credentials.len()
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New client connected: {}", addr);
                    let credentials = Arc::clone(&self.credentials);
                    let config = Arc::clone(&self.config);

                    // Spawn a task for each client so the accept loop doesn't block
                    tokio::spawn(async move {
                        if let Err(e) = handle_session(stream, credentials, config).await {
                            warn!("Session with {} ended with error: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}
