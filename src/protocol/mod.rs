//! FTP Protocol implementation
//!
//! Handles command parsing, address encoding, dispatch, and reply
//! generation.

pub mod codec;
pub mod handlers;
pub mod parser;
pub mod responses;

pub use handlers::dispatch;
pub use parser::{parse_line, ParsedCommand};
pub use responses::Reply;
