//! Transport error types

use thiserror::Error;

/// Errors raised by the wire-level transports.
///
/// A transport error is distinct from a protocol-level `ERR` reply, which the
/// device clients detect themselves: this type only covers the link itself.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The link dropped mid-command and the single reconnect-and-retry
    /// attempt also failed.
    #[error("connection to {addr} lost while sending '{command}': {source}")]
    ConnectionLost {
        addr: String,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("peer {addr} closed the connection")]
    PeerClosed { addr: String },

    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("response from {url} is not valid JSON: {source}")]
    Json {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}
