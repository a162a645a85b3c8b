//! Device endpoint model
//!
//! An endpoint selects which physical (or mock) target a transport binds to.
//! Endpoints are immutable after construction.

use std::fmt;

/// Whether an endpoint points at real observatory hardware or at a local
/// mock server used for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointMode {
    Production,
    Simulated,
}

/// Login material for a device link.
///
/// The secret must never reach the log output; `Debug` redacts it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A device address: host, port, optional credentials, production/simulated.
#[derive(Debug, Clone)]
pub struct DeviceEndpoint {
    host: String,
    port: u16,
    credentials: Option<Credentials>,
    mode: EndpointMode,
}

impl DeviceEndpoint {
    pub fn new(host: impl Into<String>, port: u16, mode: EndpointMode) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: None,
            mode,
        }
    }

    /// Attach login material (consumed at construction, not settable later).
    pub fn with_credentials(mut self, user: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            user: user.into(),
            secret: secret.into(),
        });
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn mode(&self) -> EndpointMode {
        self.mode
    }

    pub fn is_simulated(&self) -> bool {
        self.mode == EndpointMode::Simulated
    }

    /// `host:port` form used for socket connects and error messages.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let endpoint = DeviceEndpoint::new("192.168.132.11", 2003, EndpointMode::Production)
            .with_credentials("dk154", "1178");
        let rendered = format!("{:?}", endpoint);
        assert!(!rendered.contains("1178"), "secret leaked: {}", rendered);
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("dk154"));
    }

    #[test]
    fn test_addr_format() {
        let endpoint = DeviceEndpoint::new("127.0.0.1", 8883, EndpointMode::Simulated);
        assert_eq!(endpoint.addr(), "127.0.0.1:8883");
        assert!(endpoint.is_simulated());
        assert!(endpoint.credentials().is_none());
    }
}
