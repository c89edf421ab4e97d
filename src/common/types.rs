//! Shared types used across the application.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::error::{RegistryError, RegistryResult};

/// A registered game server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl ServerEntry {
    /// Build an entry, enforcing the non-empty name/host and 1-65535 port rules.
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u32) -> RegistryResult<Self> {
        let name = name.into();
        let host = host.into();

        if name.trim().is_empty() {
            return Err(RegistryError::Validation("Server name must not be empty".to_string()));
        }
        if host.trim().is_empty() {
            return Err(RegistryError::Validation("Host must not be empty".to_string()));
        }
        let port = match u16::try_from(port) {
            Ok(port) if port != 0 => port,
            _ => {
                return Err(RegistryError::Validation(format!(
                    "Port {} is out of range (1-65535)",
                    port
                )))
            }
        };

        Ok(Self { name, host, port })
    }

    /// `host:port` form, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        format_address(&self.host, self.port)
    }
}

impl fmt::Display for ServerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.name, self.address())
    }
}

/// The persisted `{host, port}` record stored under each name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAddress {
    pub host: String,
    pub port: u32,
}

/// Parse a user supplied `host:port` address.
///
/// Splits on the last colon so that bracketed IPv6 literals (`[::1]:28015`)
/// work; the brackets are stripped from the returned host.
pub fn parse_address(address: &str) -> RegistryResult<(String, u16)> {
    let address = address.trim();
    let (host, port) = address.rsplit_once(':').ok_or_else(|| {
        RegistryError::Validation(format!(
            "Invalid address `{}`: expected host:port",
            address
        ))
    })?;

    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return Err(RegistryError::Validation(format!(
            "Invalid address `{}`: host is empty",
            address
        )));
    }
    if host.contains(':') && !address.starts_with('[') {
        return Err(RegistryError::Validation(format!(
            "Invalid address `{}`: wrap IPv6 addresses in brackets, e.g. [::1]:28015",
            address
        )));
    }

    let port: u32 = port.parse().map_err(|_| {
        RegistryError::Validation(format!("Invalid port `{}`: not a number", port))
    })?;
    if port == 0 || port > u16::MAX as u32 {
        return Err(RegistryError::Validation(format!(
            "Port {} is out of range (1-65535)",
            port
        )));
    }

    Ok((host.to_string(), port as u16))
}

/// Render `host:port`, bracketing IPv6 literals.
pub fn format_address(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
