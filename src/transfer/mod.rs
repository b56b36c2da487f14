//! Transfer module for the FTP server
//!
//! Data-channel negotiation and single-shot payload transfers.

pub mod data_channel;

pub use data_channel::{DataChannel, open_active, open_passive};
