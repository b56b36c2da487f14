//! Server core functionality
//!
//! This module contains the accept loop and the shared state handed to
//! each connection worker.

pub mod core;

pub use core::Server;
