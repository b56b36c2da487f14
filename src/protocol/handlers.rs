//! Command handlers module for the Rivet FTP server.
//!
//! `dispatch` checks the guard conditions for the received verb in a
//! fixed order (login first, then data channel), then runs the matching
//! handler. Every path yields exactly one final `Reply`; RETR, STOR,
//! and LIST additionally write a preliminary 150 on the control
//! connection once their local resource checks pass.

use log::{debug, error, info, warn};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::auth::CredentialTable;
use crate::config::ServerConfig;
use crate::protocol::codec;
use crate::protocol::parser::ParsedCommand;
use crate::protocol::responses::{self, Reply};
use crate::session::Session;
use crate::transfer;

/// Verbs usable only after USER and PASS have completed.
fn requires_login(verb: &str) -> bool {
    matches!(
        verb,
        "CWD" | "PWD" | "CDUP" | "PASV" | "EPSV" | "PORT" | "EPRT" | "RETR" | "STOR" | "LIST"
    )
}

/// Verbs that consume a previously negotiated data channel.
fn requires_data_channel(verb: &str) -> bool {
    matches!(verb, "RETR" | "STOR" | "LIST")
}

/// Dispatches a parsed command against the session state.
///
/// `writer` is the control connection, used for the preliminary 150
/// replies of the transfer commands. Unknown verbs are answered with
/// 500 without consulting the guards.
pub async fn dispatch<W>(
    session: &mut Session,
    command: &ParsedCommand,
    writer: &mut W,
    credentials: &CredentialTable,
    config: &ServerConfig,
) -> Reply
where
    W: AsyncWrite + Unpin,
{
    let verb = command.verb.as_str();

    // 1. Guard checks, login always first
    if requires_login(verb) && !session.is_authenticated() {
        return Reply::new(responses::NOT_LOGGED_IN, "Please login with USER and PASS.");
    }
    if requires_data_channel(verb) && !session.has_data_channel() {
        return Reply::new(responses::CANT_OPEN_DATA_CHANNEL, "Use PORT or PASV first.");
    }

    // 2. Handler dispatch
    match verb {
        "USER" => handle_user(session, command),
        "PASS" => handle_pass(session, command, credentials),
        "CWD" => handle_cwd(session, command).await,
        "PWD" => handle_pwd(session, command),
        "CDUP" => handle_cdup(session, command).await,
        "PASV" => handle_pasv(session, command, config).await,
        "EPSV" => handle_epsv(session, command, config).await,
        "PORT" => handle_port(session, command),
        "EPRT" => handle_eprt(session, command),
        "RETR" => handle_retr(session, command, writer).await,
        "STOR" => handle_stor(session, command, writer).await,
        "LIST" => handle_list(session, command, writer).await,
        "QUIT" => handle_quit(session, command),
        _ => Reply::new(responses::COMMAND_UNRECOGNIZED, "Command unknown."),
    }
}

/// Handles the USER command: records the username and asks for PASS.
fn handle_user(session: &mut Session, command: &ParsedCommand) -> Reply {
    let [username] = command.args.as_slice() else {
        return Reply::new(responses::SYNTAX_ERROR, "Invalid args.");
    };

    if session.is_authenticated() {
        return Reply::new(responses::PASSWORD_REQUIRED, "Can't change to another user.");
    }

    info!("Client {} offered username {}", session.peer_addr(), username);
    session.set_pending_username(username.clone());
    Reply::new(responses::PASSWORD_REQUIRED, "Specify the password.")
}

/// Handles the PASS command: checks the password for the pending
/// username against the credential table.
fn handle_pass(
    session: &mut Session,
    command: &ParsedCommand,
    credentials: &CredentialTable,
) -> Reply {
    let [password] = command.args.as_slice() else {
        return Reply::new(responses::SYNTAX_ERROR, "Invalid args.");
    };

    if session.is_authenticated() {
        return Reply::new(responses::LOGIN_SUCCESS, "Already logged in.");
    }

    let Some(username) = session.pending_username() else {
        return Reply::new(responses::NOT_LOGGED_IN, "Login incorrect.");
    };

    match credentials.verify(username, password) {
        Ok(()) => {
            session.complete_login();
            Reply::new(responses::LOGIN_SUCCESS, "Login successful.")
        }
        Err(e) => {
            warn!("Client {} login failed: {}", session.peer_addr(), e);
            Reply::new(responses::NOT_LOGGED_IN, "Login incorrect.")
        }
    }
}

/// Handles the CWD command: moves the session's working directory.
async fn handle_cwd(session: &mut Session, command: &ParsedCommand) -> Reply {
    let path = command.path_argument();
    if path.is_empty() {
        return Reply::new(responses::ACTION_NOT_TAKEN, "Failed to change dir.");
    }

    let target = session.resolve_path(path);
    let resolved = match fs::canonicalize(&target).await {
        Ok(resolved) => resolved,
        Err(_) => return Reply::new(responses::ACTION_NOT_TAKEN, "Failed to change dir."),
    };

    match fs::metadata(&resolved).await {
        Ok(meta) if meta.is_dir() => {
            info!(
                "Client {} changed dir to {}",
                session.peer_addr(),
                resolved.display()
            );
            session.set_cwd(resolved);
            Reply::new(responses::FILE_ACTION_OK, "Dir changed.")
        }
        _ => Reply::new(responses::ACTION_NOT_TAKEN, "Failed to change dir."),
    }
}

/// Handles the PWD command: reports the session's working directory.
fn handle_pwd(session: &Session, command: &ParsedCommand) -> Reply {
    if !command.args.is_empty() {
        return Reply::new(responses::SYNTAX_ERROR, "Invalid args.");
    }

    let text = format!("'{}' is the current dir.", session.cwd().display());
    Reply::new(responses::PATH_INFO, text)
}

/// Handles the CDUP command: moves one directory up. At the filesystem
/// root the directory is left unchanged.
async fn handle_cdup(session: &mut Session, command: &ParsedCommand) -> Reply {
    if !command.args.is_empty() {
        return Reply::new(responses::SYNTAX_ERROR, "Invalid args.");
    }

    let Some(parent) = session.cwd().parent().map(Path::to_path_buf) else {
        return Reply::new(responses::OK, "OK");
    };

    match fs::metadata(&parent).await {
        Ok(meta) if meta.is_dir() => {
            session.set_cwd(parent);
            Reply::new(responses::OK, "OK")
        }
        _ => Reply::new(responses::ACTION_NOT_TAKEN, "Failed to change dir."),
    }
}

/// Handles the PASV command: binds a data listener and advertises it in
/// the six-field address form.
async fn handle_pasv(
    session: &mut Session,
    command: &ParsedCommand,
    config: &ServerConfig,
) -> Reply {
    if !command.args.is_empty() {
        return Reply::new(responses::SYNTAX_ERROR, "Invalid args.");
    }

    let host = config.advertised_host();
    match transfer::open_passive(IpAddr::V4(host), config.data_port_range()).await {
        Ok((port, channel)) => {
            session.install_data_channel(channel);
            info!(
                "Client {} entered passive mode on port {}",
                session.peer_addr(),
                port
            );
            let text = format!(
                "Entering PASV mode ({}).",
                codec::encode_pasv_fields(host, port)
            );
            Reply::new(responses::ENTERING_PASSIVE, text)
        }
        Err(e) => {
            error!("Client {} PASV setup failed: {}", session.peer_addr(), e);
            Reply::new(responses::CANT_OPEN_DATA_CHANNEL, "Can't open data connection.")
        }
    }
}

/// Handles the EPSV command: like PASV, advertised in the delimited form.
async fn handle_epsv(
    session: &mut Session,
    command: &ParsedCommand,
    config: &ServerConfig,
) -> Reply {
    if !command.args.is_empty() {
        return Reply::new(responses::SYNTAX_ERROR, "Invalid args.");
    }

    let host = config.advertised_host();
    match transfer::open_passive(IpAddr::V4(host), config.data_port_range()).await {
        Ok((port, channel)) => {
            session.install_data_channel(channel);
            info!(
                "Client {} entered extended passive mode on port {}",
                session.peer_addr(),
                port
            );
            let text = format!("Entering EPSV mode ({})", codec::encode_epsv_fields(port));
            Reply::new(responses::ENTERING_EXTENDED_PASSIVE, text)
        }
        Err(e) => {
            error!("Client {} EPSV setup failed: {}", session.peer_addr(), e);
            Reply::new(responses::CANT_OPEN_DATA_CHANNEL, "Can't open data connection.")
        }
    }
}

/// Handles the PORT command: records the client's advertised port for
/// active mode. Only the port is honored; the server dials the control
/// connection's peer address.
fn handle_port(session: &mut Session, command: &ParsedCommand) -> Reply {
    let [arg] = command.args.as_slice() else {
        return Reply::new(responses::SYNTAX_ERROR, "Invalid args.");
    };

    let Some((advertised, port)) = codec::decode_port_argument(arg) else {
        return Reply::new(responses::SYNTAX_ERROR, "Invalid args.");
    };

    debug!(
        "Client {} advertised {} for active mode",
        session.peer_addr(),
        advertised
    );
    let target = SocketAddr::new(session.peer_addr().ip(), port);
    session.install_data_channel(transfer::open_active(target));
    Reply::new(responses::OK, "PORT command successful.")
}

/// Handles the EPRT command: the delimited-form counterpart of PORT.
fn handle_eprt(session: &mut Session, command: &ParsedCommand) -> Reply {
    let [arg] = command.args.as_slice() else {
        return Reply::new(responses::SYNTAX_ERROR, "Invalid args.");
    };

    let Some(port) = codec::decode_extended_argument(arg) else {
        return Reply::new(responses::SYNTAX_ERROR, "Invalid args.");
    };

    let target = SocketAddr::new(session.peer_addr().ip(), port);
    session.install_data_channel(transfer::open_active(target));
    Reply::new(responses::OK, "EPRT command successful.")
}

/// Handles the RETR command: sends a file over the data channel.
async fn handle_retr<W>(session: &mut Session, command: &ParsedCommand, writer: &mut W) -> Reply
where
    W: AsyncWrite + Unpin,
{
    let path = command.path_argument();
    if path.is_empty() {
        return Reply::new(responses::SYNTAX_ERROR, "Invalid args.");
    }

    // 1. Read the file before the data channel is consumed, so a bad
    //    path leaves the channel available for the next attempt
    let file_path = session.resolve_path(path);
    let contents = match fs::read(&file_path).await {
        Ok(contents) => contents,
        Err(e) => {
            warn!(
                "Client {} RETR {} failed: {}",
                session.peer_addr(),
                file_path.display(),
                e
            );
            return Reply::new(responses::ACTION_NOT_TAKEN, "Failed to open file.");
        }
    };

    // 2. Consume the channel and announce the transfer
    let Some(channel) = session.take_data_channel() else {
        return Reply::new(responses::CANT_OPEN_DATA_CHANNEL, "Use PORT or PASV first.");
    };
    announce(writer, Reply::new(responses::FILE_STATUS_OK, "Sending file.")).await;

    // 3. Send the payload
    match channel.send(&contents).await {
        Ok(()) => {
            info!(
                "Client {} retrieved {} ({} bytes)",
                session.peer_addr(),
                file_path.display(),
                contents.len()
            );
            Reply::new(responses::TRANSFER_COMPLETE, "Transfer complete.")
        }
        Err(e) => {
            error!("Client {} RETR transfer failed: {}", session.peer_addr(), e);
            Reply::new(responses::TRANSFER_ABORTED, "Data transfer failed.")
        }
    }
}

/// Handles the STOR command: receives a file over the data channel.
async fn handle_stor<W>(session: &mut Session, command: &ParsedCommand, writer: &mut W) -> Reply
where
    W: AsyncWrite + Unpin,
{
    let path = command.path_argument();
    if path.is_empty() {
        return Reply::new(responses::SYNTAX_ERROR, "Invalid args.");
    }

    // 1. Create the file before the data channel is consumed
    let file_path = session.resolve_path(path);
    let mut file = match fs::File::create(&file_path).await {
        Ok(file) => file,
        Err(e) => {
            warn!(
                "Client {} STOR {} failed: {}",
                session.peer_addr(),
                file_path.display(),
                e
            );
            return Reply::new(responses::ACTION_NOT_TAKEN, "Failed to create file.");
        }
    };

    // 2. Consume the channel and announce the transfer
    let Some(channel) = session.take_data_channel() else {
        return Reply::new(responses::CANT_OPEN_DATA_CHANNEL, "Use PORT or PASV first.");
    };
    announce(writer, Reply::new(responses::FILE_STATUS_OK, "OK to send data.")).await;

    // 3. Receive the payload. A clean close with zero bytes is a valid
    //    empty upload
    let payload = match channel.receive().await {
        Ok(payload) => payload,
        Err(e) => {
            error!("Client {} STOR transfer failed: {}", session.peer_addr(), e);
            return Reply::new(responses::TRANSFER_ABORTED, "Data transfer failed.");
        }
    };

    // 4. Write it out
    if let Err(e) = file.write_all(&payload).await {
        warn!(
            "Client {} STOR write to {} failed: {}",
            session.peer_addr(),
            file_path.display(),
            e
        );
        return Reply::new(responses::ACTION_NOT_TAKEN, "Failed to create file.");
    }
    if let Err(e) = file.flush().await {
        warn!(
            "Client {} STOR flush of {} failed: {}",
            session.peer_addr(),
            file_path.display(),
            e
        );
        return Reply::new(responses::ACTION_NOT_TAKEN, "Failed to create file.");
    }

    info!(
        "Client {} stored {} ({} bytes)",
        session.peer_addr(),
        file_path.display(),
        payload.len()
    );
    Reply::new(responses::TRANSFER_COMPLETE, "Transfer complete.")
}

/// Handles the LIST command: sends the directory listing over the data
/// channel, one name per line.
async fn handle_list<W>(session: &mut Session, command: &ParsedCommand, writer: &mut W) -> Reply
where
    W: AsyncWrite + Unpin,
{
    // 1. Optional path argument; unreadable directories list as empty
    let path = command.path_argument();
    let dir = if path.is_empty() {
        session.cwd().to_path_buf()
    } else {
        session.resolve_path(path)
    };
    let listing = read_listing(&dir).await;

    // 2. Consume the channel and announce the transfer
    let Some(channel) = session.take_data_channel() else {
        return Reply::new(responses::CANT_OPEN_DATA_CHANNEL, "Use PORT or PASV first.");
    };
    announce(writer, Reply::new(responses::FILE_STATUS_OK, "Sending dir listing.")).await;

    // 3. Send the listing
    match channel.send(listing.as_bytes()).await {
        Ok(()) => {
            info!(
                "Client {} listed {} ({} bytes)",
                session.peer_addr(),
                dir.display(),
                listing.len()
            );
            Reply::new(responses::TRANSFER_COMPLETE, "Transfer complete.")
        }
        Err(e) => {
            error!("Client {} LIST transfer failed: {}", session.peer_addr(), e);
            Reply::new(responses::TRANSFER_ABORTED, "Data transfer failed.")
        }
    }
}

/// Handles the QUIT command: the worker closes the connection after the
/// 221 reply is written.
fn handle_quit(session: &Session, command: &ParsedCommand) -> Reply {
    if !command.args.is_empty() {
        return Reply::new(responses::SYNTAX_ERROR, "Invalid args.");
    }

    info!("Client {} quit", session.peer_addr());
    Reply::new(responses::CLOSING, "Goodbye")
}

/// Writes a preliminary reply on the control connection. A failure here
/// surfaces on the worker's next write, so it is only logged.
async fn announce<W>(writer: &mut W, reply: Reply)
where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = writer.write_all(reply.line().as_bytes()).await {
        warn!("Failed to send preliminary reply: {}", e);
    }
}

/// Names in `dir` joined with newlines. Enumeration errors degrade to
/// an empty listing rather than failing the transfer.
async fn read_listing(dir: &Path) -> String {
    let mut names = Vec::new();
    match fs::read_dir(dir).await {
        Ok(mut entries) => {
            while let Ok(Some(entry)) = entries.next_entry().await {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Err(e) => warn!("Failed to list {}: {}", dir.display(), e),
    }
    names.join("\n")
}
