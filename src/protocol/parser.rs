//! FTP command line parsing
//!
//! Splits a raw command line into an uppercased verb and its argument
//! tokens. Argument case is preserved; paths and passwords are
//! case-sensitive.

/// A tokenized command line.
///
/// `args` holds the whitespace-separated tokens for argument counting and
/// fixed-field arguments such as the PORT host string. The text after the
/// verb is also kept unsplit so paths containing runs of spaces survive
/// parsing byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub verb: String,
    pub args: Vec<String>,
    rest: String,
}

impl ParsedCommand {
    /// Returns everything after the verb and its separating space, with
    /// inner whitespace intact. Empty when the command carried no argument.
    pub fn path_argument(&self) -> &str {
        &self.rest
    }
}

/// Parse a raw command line into verb and arguments.
///
/// The verb ends at the first space; the remainder is kept verbatim and
/// additionally split into tokens. Empty and whitespace-only lines yield
/// an empty verb, which dispatch answers as an unknown command.
pub fn parse_line(line: &str) -> ParsedCommand {
    let body = line.trim();
    let (verb, rest) = match body.split_once(' ') {
        Some((verb, rest)) => (verb, rest),
        None => (body, ""),
    };
    ParsedCommand {
        verb: verb.to_ascii_uppercase(),
        args: rest.split_whitespace().map(str::to_string).collect(),
        rest: rest.to_string(),
    }
}
