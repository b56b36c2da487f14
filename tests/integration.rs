//! End-to-end tests exercising the server over real TCP connections.
//!
//! Each test starts its own server on an ephemeral control port.
//! Passive-mode tests get a dedicated data port range so that a port
//! freed by one test is never rebound by another running in parallel.
//!
//! Control and data reads have no timeout, so a silent peer holds its
//! worker indefinitely; every exchange below is driven to completion.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::ops::Range;
use std::path::PathBuf;
use std::thread;

use tokio::runtime::Runtime;

use rivet_ftp_server::Server;
use rivet_ftp_server::auth::CredentialTable;
use rivet_ftp_server::config::ServerConfig;

fn test_credentials() -> CredentialTable {
    let mut users = HashMap::new();
    users.insert("bob".to_string(), "secret".to_string());
    CredentialTable::from_users(users)
}

/// Starts a server on an ephemeral control port and returns its address.
/// The runtime thread is detached and dies with the test process.
fn start_server(data_ports: Range<u16>) -> SocketAddr {
    start_server_with(test_credentials(), data_ports)
}

fn start_server_with(credentials: CredentialTable, data_ports: Range<u16>) -> SocketAddr {
    let config = ServerConfig {
        control_port: 0,
        data_port_min: data_ports.start,
        data_port_max: data_ports.end,
        ..ServerConfig::default()
    };

    let runtime = Runtime::new().unwrap();
    let server = runtime.block_on(Server::bind(config, credentials)).unwrap();
    let addr = server.local_addr().unwrap();

    thread::spawn(move || {
        let _ = runtime.block_on(server.run());
    });

    addr
}

/// Fresh scratch directory under the system temp dir.
fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rivet-ftp-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Control-connection client. Reads the greeting on connect.
struct Ftp {
    reader: BufReader<TcpStream>,
}

impl Ftp {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        let mut client = Self {
            reader: BufReader::new(stream),
        };
        assert_eq!(client.read_reply(), "220 Welcome to Rivet FTP Server");
        client
    }

    fn read_reply(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).unwrap();
        line.trim_end().to_string()
    }

    fn raw_send(&mut self, command: &str) {
        let stream = self.reader.get_mut();
        stream
            .write_all(format!("{}\r\n", command).as_bytes())
            .unwrap();
        stream.flush().unwrap();
    }

    fn send(&mut self, command: &str) -> String {
        self.raw_send(command);
        self.read_reply()
    }

    fn login(&mut self) {
        assert_eq!(self.send("USER bob"), "331 Specify the password.");
        assert_eq!(self.send("PASS secret"), "230 Login successful.");
    }

    fn pasv_data_port(&mut self) -> u16 {
        let reply = self.send("PASV");
        assert!(reply.starts_with("227 "), "unexpected PASV reply: {}", reply);
        parse_pasv_port(&reply)
    }
}

fn parse_pasv_port(reply: &str) -> u16 {
    let start = reply.find('(').unwrap() + 1;
    let end = reply.rfind(')').unwrap();
    let fields: Vec<u16> = reply[start..end]
        .split(',')
        .map(|f| f.parse().unwrap())
        .collect();
    fields[4] * 256 + fields[5]
}

fn parse_epsv_port(reply: &str) -> u16 {
    let start = reply.find("(|||").unwrap() + 4;
    let end = reply.rfind("|)").unwrap();
    reply[start..end].parse().unwrap()
}

fn read_data(stream: &mut TcpStream) -> Vec<u8> {
    let mut payload = Vec::new();
    stream.read_to_end(&mut payload).unwrap();
    payload
}

#[test]
fn test_greeting_and_unknown_command() {
    let addr = start_server(6000..6500);
    let mut client = Ftp::connect(addr);

    // Unknown verbs get 500 whether logged in or not
    assert_eq!(client.send("FOOBAR"), "500 Command unknown.");
    client.login();
    assert_eq!(client.send("FOOBAR with args"), "500 Command unknown.");
}

#[test]
fn test_commands_require_login() {
    let addr = start_server(6000..6500);
    let mut client = Ftp::connect(addr);

    let commands = [
        "CWD dir",
        "PWD",
        "CDUP",
        "PASV",
        "PORT 127,0,0,1,7,208",
        "RETR f.txt",
        "STOR f.txt",
        "LIST",
    ];
    for command in commands {
        assert_eq!(
            client.send(command),
            "530 Please login with USER and PASS.",
            "command: {}",
            command
        );
    }

    assert_eq!(client.send("USER bob"), "331 Specify the password.");
    assert_eq!(client.send("PASS wrong"), "530 Login incorrect.");
    assert_eq!(client.send("LIST"), "530 Please login with USER and PASS.");
}

#[test]
fn test_login_flow() {
    let addr = start_server(6000..6500);

    let mut client = Ftp::connect(addr);
    client.login();
    assert_eq!(client.send("PASS secret"), "230 Already logged in.");
    assert_eq!(client.send("USER alice"), "331 Can't change to another user.");

    // A fresh connection starts unauthenticated
    let mut other = Ftp::connect(addr);
    assert_eq!(other.send("PASS secret"), "530 Login incorrect.");
    assert_eq!(other.send("USER mallory"), "331 Specify the password.");
    assert_eq!(other.send("PASS secret"), "530 Login incorrect.");
}

#[test]
fn test_transfers_require_data_channel() {
    let addr = start_server(6000..6500);
    let mut client = Ftp::connect(addr);
    client.login();

    for command in ["LIST", "RETR f.txt", "STOR f.txt"] {
        assert_eq!(
            client.send(command),
            "425 Use PORT or PASV first.",
            "command: {}",
            command
        );
    }
}

#[test]
fn test_pasv_twice_discards_first_listener() {
    let addr = start_server(5400..5440);
    let mut client = Ftp::connect(addr);
    client.login();

    let first = client.pasv_data_port();
    let second = client.pasv_data_port();
    assert_ne!(first, second);

    // Only the most recent listener is alive
    assert!(TcpStream::connect(("127.0.0.1", first)).is_err());
    let mut data = TcpStream::connect(("127.0.0.1", second)).unwrap();

    client.raw_send("LIST");
    assert_eq!(client.read_reply(), "150 Sending dir listing.");
    let listing = read_data(&mut data);
    assert!(listing.ends_with(b"\r\n"));
    assert_eq!(client.read_reply(), "226 Transfer complete.");
}

#[test]
fn test_passive_store_and_retrieve() {
    let dir = temp_dir("stor-retr");
    let addr = start_server(5440..5480);
    let mut client = Ftp::connect(addr);
    client.login();
    assert_eq!(
        client.send(&format!("CWD {}", dir.display())),
        "250 Dir changed."
    );

    // Upload
    let port = client.pasv_data_port();
    client.raw_send("STOR upload.txt");
    assert_eq!(client.read_reply(), "150 OK to send data.");
    let mut data = TcpStream::connect(("127.0.0.1", port)).unwrap();
    data.write_all(b"hello").unwrap();
    drop(data);
    assert_eq!(client.read_reply(), "226 Transfer complete.");
    assert_eq!(fs::read(dir.join("upload.txt")).unwrap(), b"hello");

    // Download the same file; the payload gains the trailing CRLF
    let port = client.pasv_data_port();
    client.raw_send("RETR upload.txt");
    assert_eq!(client.read_reply(), "150 Sending file.");
    let mut data = TcpStream::connect(("127.0.0.1", port)).unwrap();
    assert_eq!(read_data(&mut data), b"hello\r\n");
    assert_eq!(client.read_reply(), "226 Transfer complete.");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_retr_missing_file_keeps_data_channel() {
    let dir = temp_dir("retr-missing");
    let addr = start_server(5480..5520);
    let mut client = Ftp::connect(addr);
    client.login();
    assert_eq!(
        client.send(&format!("CWD {}", dir.display())),
        "250 Dir changed."
    );

    let port = client.pasv_data_port();
    assert_eq!(client.send("RETR no-such.txt"), "550 Failed to open file.");

    // The listener survives the failed attempt and still serves LIST
    let mut data = TcpStream::connect(("127.0.0.1", port)).unwrap();
    client.raw_send("LIST");
    assert_eq!(client.read_reply(), "150 Sending dir listing.");
    assert_eq!(read_data(&mut data), b"\r\n");
    assert_eq!(client.read_reply(), "226 Transfer complete.");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_list_missing_directory_sends_empty_listing() {
    let addr = start_server(5560..5600);
    let mut client = Ftp::connect(addr);
    client.login();

    // A directory that cannot be read lists as empty instead of failing
    let port = client.pasv_data_port();
    client.raw_send("LIST /no/such/dir-anywhere");
    assert_eq!(client.read_reply(), "150 Sending dir listing.");
    let mut data = TcpStream::connect(("127.0.0.1", port)).unwrap();
    assert_eq!(read_data(&mut data), b"\r\n");
    assert_eq!(client.read_reply(), "226 Transfer complete.");
}

#[test]
fn test_active_mode_transfers() {
    let dir = temp_dir("active");
    fs::write(dir.join("data.txt"), b"hi").unwrap();

    let addr = start_server(5520..5560);
    let mut client = Ftp::connect(addr);
    client.login();
    assert_eq!(
        client.send(&format!("CWD {}", dir.display())),
        "250 Dir changed."
    );

    // RETR with PORT: the server dials our listener
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let command = format!("PORT 127,0,0,1,{},{}", port / 256, port % 256);
    assert_eq!(client.send(&command), "200 PORT command successful.");

    client.raw_send("RETR data.txt");
    assert_eq!(client.read_reply(), "150 Sending file.");
    let (mut data, _) = listener.accept().unwrap();
    assert_eq!(read_data(&mut data), b"hi\r\n");
    assert_eq!(client.read_reply(), "226 Transfer complete.");

    // STOR with EPRT
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let command = format!("EPRT |1|127.0.0.1|{}|", port);
    assert_eq!(client.send(&command), "200 EPRT command successful.");

    client.raw_send("STOR copy.txt");
    assert_eq!(client.read_reply(), "150 OK to send data.");
    let (mut data, _) = listener.accept().unwrap();
    data.write_all(b"bye").unwrap();
    drop(data);
    assert_eq!(client.read_reply(), "226 Transfer complete.");
    assert_eq!(fs::read(dir.join("copy.txt")).unwrap(), b"bye");

    // LIST with EPSV
    let reply = client.send("EPSV");
    assert!(reply.starts_with("229 Entering EPSV mode (|||"), "{}", reply);
    let port = parse_epsv_port(&reply);

    client.raw_send("LIST");
    assert_eq!(client.read_reply(), "150 Sending dir listing.");
    let mut data = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let listing = String::from_utf8(read_data(&mut data)).unwrap();
    assert!(listing.contains("data.txt"), "{}", listing);
    assert!(listing.contains("copy.txt"), "{}", listing);
    assert_eq!(client.read_reply(), "226 Transfer complete.");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_quit_closes_connection() {
    let addr = start_server(6000..6500);
    let mut client = Ftp::connect(addr);

    assert_eq!(client.send("QUIT"), "221 Goodbye");

    let mut line = String::new();
    assert_eq!(client.reader.read_line(&mut line).unwrap(), 0);
}

#[test]
fn test_cwd_pwd_cdup() {
    let dir = temp_dir("nav");
    let inner = dir.join("inner");
    fs::create_dir_all(&inner).unwrap();
    let canon = dir.canonicalize().unwrap();
    let canon_inner = inner.canonicalize().unwrap();

    let addr = start_server(6000..6500);
    let mut client = Ftp::connect(addr);
    client.login();

    assert_eq!(
        client.send(&format!("CWD {}", dir.display())),
        "250 Dir changed."
    );
    assert_eq!(
        client.send("PWD"),
        format!("257 '{}' is the current dir.", canon.display())
    );

    assert_eq!(client.send("CWD inner"), "250 Dir changed.");
    assert_eq!(
        client.send("PWD"),
        format!("257 '{}' is the current dir.", canon_inner.display())
    );

    assert_eq!(client.send("CDUP"), "200 OK");
    assert_eq!(
        client.send("PWD"),
        format!("257 '{}' is the current dir.", canon.display())
    );

    assert_eq!(client.send("CWD missing"), "550 Failed to change dir.");
    assert_eq!(client.send("CWD"), "550 Failed to change dir.");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_oversized_command_line() {
    let addr = start_server(6000..6500);
    let mut client = Ftp::connect(addr);

    let long_line = "A".repeat(600);
    assert_eq!(client.send(&long_line), "500 Command line too long.");

    // The session keeps working afterwards
    assert_eq!(client.send("USER bob"), "331 Specify the password.");
}

#[test]
fn test_credentials_loaded_from_file() {
    let dir = temp_dir("creds");
    let path = dir.join("credentials.json");
    fs::write(&path, br#"{"bob": "secret", "carol": "hunter2"}"#).unwrap();

    let credentials = CredentialTable::load(path.to_str().unwrap()).unwrap();
    assert_eq!(credentials.len(), 2);

    let addr = start_server_with(credentials, 6000..6500);
    let mut client = Ftp::connect(addr);
    assert_eq!(client.send("USER carol"), "331 Specify the password.");
    assert_eq!(client.send("PASS hunter2"), "230 Login successful.");

    let _ = fs::remove_dir_all(&dir);
}
