//! Configuration management for Rivet FTP Server
//!
//! Values come from built-in defaults, an optional `config.{toml,json}`
//! file, `RIVET_FTP_*` environment overrides, and finally the port given
//! on the command line.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::Range;

/// Server configuration, loaded once at startup and shared read-only.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address to bind the control listener
    pub bind_address: String,

    /// Port for the control connection; the CLI argument wins
    pub control_port: u16,

    /// Port range scanned for PASV/EPSV data listeners
    pub data_port_min: u16,
    pub data_port_max: u16,

    /// Path to the JSON credential file
    pub credentials_file: String,

    /// Maximum accepted command line length in bytes
    pub max_command_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            control_port: 2121,
            data_port_min: 1024,
            data_port_max: 65000,
            credentials_file: "credentials.json".to_string(),
            max_command_length: 512,
        }
    }
}

impl ServerConfig {
    /// Load configuration with the control port taken from the CLI.
    pub fn load(control_port: u16) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        let settings = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("control_port", defaults.control_port as i64)?
            .set_default("data_port_min", defaults.data_port_min as i64)?
            .set_default("data_port_max", defaults.data_port_max as i64)?
            .set_default("credentials_file", defaults.credentials_file)?
            .set_default("max_command_length", defaults.max_command_length as i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("RIVET_FTP"))
            .set_override("control_port", control_port as i64)?
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.control_port == 0 {
            return Err(ConfigError::Message("control_port cannot be 0".into()));
        }

        if self.bind_address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::Message(format!(
                "bind_address is not an IP address: {}",
                self.bind_address
            )));
        }

        if self.data_port_min >= self.data_port_max {
            return Err(ConfigError::Message(
                "data_port_min must be less than data_port_max".into(),
            ));
        }

        if self.max_command_length == 0 {
            return Err(ConfigError::Message(
                "max_command_length must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and control port as socket address
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.control_port)
    }

    /// Get data port range for PASV/EPSV mode
    pub fn data_port_range(&self) -> Range<u16> {
        self.data_port_min..self.data_port_max
    }

    /// IPv4 address advertised in 227 replies. Non-IPv4 bind addresses
    /// fall back to the loopback address.
    pub fn advertised_host(&self) -> Ipv4Addr {
        self.bind_address.parse().unwrap_or(Ipv4Addr::LOCALHOST)
    }
}
