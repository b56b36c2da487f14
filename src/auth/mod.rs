//! Authentication system
//!
//! Credential loading and login checks.

pub mod credentials;

pub use credentials::CredentialTable;
