//! Module `session::state`
//!
//! Per-connection session state: authentication progress, working
//! directory, and the pending data channel. A session is owned by its
//! worker task and never shared.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use log::info;

use crate::transfer::DataChannel;

/// Authentication progress for one control connection.
///
/// `Authenticated` is reached only through a PASS that matched the
/// pending username against the credential table.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginState {
    Unauthenticated,
    AwaitingPassword { username: String },
    Authenticated { username: String },
}

/// Represents the state of a connected FTP client.
pub struct Session {
    peer_addr: SocketAddr,
    login: LoginState,
    cwd: PathBuf,
    data_channel: Option<DataChannel>,
}

impl Session {
    pub fn new(peer_addr: SocketAddr, cwd: PathBuf) -> Self {
        Self {
            peer_addr,
            login: LoginState::Unauthenticated,
            cwd,
            data_channel: None,
        }
    }

    /// Returns the control connection's peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Returns whether the client has completed USER and PASS.
    pub fn is_authenticated(&self) -> bool {
        matches!(self.login, LoginState::Authenticated { .. })
    }

    /// Records the USER argument; PASS decides the rest.
    pub fn set_pending_username(&mut self, username: String) {
        self.login = LoginState::AwaitingPassword { username };
    }

    /// The username waiting for its password, if USER was seen.
    pub fn pending_username(&self) -> Option<&str> {
        match &self.login {
            LoginState::AwaitingPassword { username } => Some(username),
            _ => None,
        }
    }

    /// Promotes the pending username after a successful password check.
    pub fn complete_login(&mut self) {
        if let LoginState::AwaitingPassword { username } = &self.login {
            info!("Client {} logged in as {}", self.peer_addr, username);
            self.login = LoginState::Authenticated {
                username: username.clone(),
            };
        }
    }

    /// Returns the session's current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn set_cwd(&mut self, path: PathBuf) {
        self.cwd = path;
    }

    /// Resolves a client-supplied path against the working directory.
    /// Absolute paths are used as given.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        self.cwd.join(path)
    }

    /// Returns whether a data channel is waiting for a transfer.
    pub fn has_data_channel(&self) -> bool {
        self.data_channel.is_some()
    }

    /// Installs a freshly negotiated data channel, dropping any channel
    /// left over from an earlier PORT or PASV.
    pub fn install_data_channel(&mut self, channel: DataChannel) {
        if self.data_channel.is_some() {
            info!("Client {} discarded an unused data channel", self.peer_addr);
        }
        self.data_channel = Some(channel);
    }

    /// Takes the data channel for a transfer. Each negotiated channel
    /// serves at most one transfer attempt.
    pub fn take_data_channel(&mut self) -> Option<DataChannel> {
        self.data_channel.take()
    }
}
