//! Rivet FTP Server - Entry Point
//!
//! A minimal Rust-based FTP server implementing core features of RFC 959.

use env_logger::{Builder, Env, Target};
use log::{error, info, warn};
use std::fs::File;
use std::io::Write;
use std::process;

use rivet_ftp_server::Server;
use rivet_ftp_server::auth::CredentialTable;
use rivet_ftp_server::config::ServerConfig;

/// Routes log records to the given file. Falls back to stderr when the
/// file cannot be created.
fn init_logging(path: &str) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        let timestamp = buf.timestamp();
        writeln!(buf, "[{}] [{}] {}", timestamp, record.level(), record.args())
    });

    match File::create(path) {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            eprintln!("Could not open log file {}: {}, logging to stderr", path, e);
        }
    }
    builder.init();
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <logfile> <port>", args[0]);
        process::exit(1);
    }

    let port: u16 = match args[2].parse() {
        Ok(port) => port,
        Err(_) => {
            eprintln!("Invalid port: {}", args[2]);
            process::exit(1);
        }
    };

    init_logging(&args[1]);
    info!("Launching FTP server...");

    let config = match ServerConfig::load(port) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let credentials = match CredentialTable::load(&config.credentials_file) {
        Ok(credentials) => credentials,
        Err(e) => {
            error!(
                "Failed to load credentials from {}: {}",
                config.credentials_file, e
            );
            process::exit(1);
        }
    };
    if credentials.is_empty() {
        warn!(
            "Credential file {} contains no users; every login will fail",
            config.credentials_file
        );
    }

    let server = match Server::bind(config, credentials).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!("Server terminated: {}", e);
        process::exit(1);
    }
}
