//! Shared plumbing for the dk154 device clients.
//!
//! This crate holds the three wire-level transports (persistent TCP line
//! socket, telnet session, stateless authenticated HTTP GET), the
//! wait-for-result polling engine used by every "confirm the hardware got
//! there" operation, and the cancellation token threaded through long waits.

mod cancel;
mod endpoint;
mod error;
mod transport;
mod waitfor;

pub use cancel::CancelToken;
pub use endpoint::{Credentials, DeviceEndpoint, EndpointMode};
pub use error::TransportError;
pub use transport::{HttpTransport, TcpLineTransport, TelnetTransport};
pub use waitfor::{wait_for_result, WaitError, WaitSpec};
