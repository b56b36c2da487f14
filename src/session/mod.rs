//! Session management module for the Rivet FTP server.
//!
//! Holds the per-connection state machine and the worker task that
//! drives it.

pub mod state;
pub mod worker;

pub use state::{LoginState, Session};
pub use worker::handle_session;
