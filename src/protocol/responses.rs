//! FTP reply codes and formatting
//!
//! Every dispatched command produces exactly one `Reply`; the session
//! worker writes it as `<code> <text>\r\n`. Transfer commands send an
//! additional preliminary 150 before touching the data channel.

/// Standard FTP reply codes
pub const FILE_STATUS_OK: u16 = 150;
pub const OK: u16 = 200;
pub const READY: u16 = 220;
pub const CLOSING: u16 = 221;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const ENTERING_PASSIVE: u16 = 227;
pub const ENTERING_EXTENDED_PASSIVE: u16 = 229;
pub const LOGIN_SUCCESS: u16 = 230;
pub const FILE_ACTION_OK: u16 = 250;
pub const PATH_INFO: u16 = 257;
pub const PASSWORD_REQUIRED: u16 = 331;
pub const CANT_OPEN_DATA_CHANNEL: u16 = 425;
pub const TRANSFER_ABORTED: u16 = 426;
pub const COMMAND_UNRECOGNIZED: u16 = 500;
pub const SYNTAX_ERROR: u16 = 501;
pub const NOT_LOGGED_IN: u16 = 530;
pub const ACTION_NOT_TAKEN: u16 = 550;

/// A single control-channel reply line.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

impl Reply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// Wire form of the reply, terminator included.
    pub fn line(&self) -> String {
        format!("{} {}\r\n", self.code, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_line_is_crlf_terminated() {
        let reply = Reply::new(CLOSING, "Goodbye");
        assert_eq!(reply.line(), "221 Goodbye\r\n");
    }
}
