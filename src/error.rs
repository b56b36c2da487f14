//! Error types
//!
//! Domain-specific error types for authentication and data transfers.
//! Handlers turn these into reply codes at the dispatch boundary.

use std::fmt;
use std::io;

/// Authentication errors, answered with 530 on the control channel.
#[derive(Debug)]
pub enum AuthError {
    UserNotFound(String),
    InvalidPassword(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::UserNotFound(u) => write!(f, "User not found: {}", u),
            AuthError::InvalidPassword(u) => write!(f, "Invalid password for user: {}", u),
        }
    }
}

impl std::error::Error for AuthError {}

/// Data-channel errors. Setup failures map to 425, failures during a
/// transfer to 426.
#[derive(Debug)]
pub enum TransferError {
    NoAvailablePort,
    Accept(io::Error),
    Connect(io::Error),
    Io(io::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::NoAvailablePort => {
                write!(f, "No available port for data connection")
            }
            TransferError::Accept(e) => {
                write!(f, "Failed to accept data connection: {}", e)
            }
            TransferError::Connect(e) => {
                write!(f, "Failed to reach client data port: {}", e)
            }
            TransferError::Io(e) => write!(f, "Data transfer failed: {}", e),
        }
    }
}

impl std::error::Error for TransferError {}

impl From<io::Error> for TransferError {
    fn from(error: io::Error) -> Self {
        TransferError::Io(error)
    }
}
