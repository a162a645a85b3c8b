//! Wire-level transports
//!
//! Three interchangeable I/O primitives sit under the device clients:
//!
//! - [`TcpLineTransport`]: persistent socket speaking newline-terminated
//!   ASCII (the TCS/ASCOL link).
//! - [`TelnetTransport`]: the same line discipline over a telnet session
//!   (the DFOSC wheel controller behind a MOXA serial bridge), with IAC
//!   negotiation bytes stripped from inbound data.
//! - [`HttpTransport`]: stateless authenticated GET returning JSON (the
//!   CCD3 camera daemon).
//!
//! The socket transports recover from an I/O error with exactly one
//! reconnect-and-retry of the failing command; a second failure surfaces as
//! [`TransportError::ConnectionLost`]. The HTTP transport has no persistent
//! state to recover.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::endpoint::DeviceEndpoint;
use crate::error::TransportError;

/// Line terminator for the socket protocols.
const LINE_TERMINATOR: u8 = b'\n';

/// One live line-oriented session. Telnet mode additionally filters IAC
/// sequences out of inbound bytes.
#[derive(Debug)]
struct LineSession {
    endpoint: DeviceEndpoint,
    stream: BufStream<TcpStream>,
    telnet: bool,
}

impl LineSession {
    async fn connect(endpoint: DeviceEndpoint, telnet: bool) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(endpoint.addr())
            .await
            .map_err(|source| TransportError::ConnectFailed {
                addr: endpoint.addr(),
                source,
            })?;
        debug!(addr = %endpoint.addr(), "transport connected");
        Ok(Self {
            endpoint,
            stream: BufStream::new(stream),
            telnet,
        })
    }

    async fn reconnect(&mut self) -> Result<(), TransportError> {
        let stream = TcpStream::connect(self.endpoint.addr()).await.map_err(|source| {
            TransportError::ConnectFailed {
                addr: self.endpoint.addr(),
                source,
            }
        })?;
        debug!(addr = %self.endpoint.addr(), "transport reconnected");
        self.stream = BufStream::new(stream);
        Ok(())
    }

    /// One write-then-read round trip. I/O failures come back as raw
    /// `io::Error` so the caller can decide whether to retry.
    async fn exchange(&mut self, command: &str) -> io::Result<Vec<String>> {
        self.stream.write_all(command.as_bytes()).await?;
        self.stream.write_all(&[LINE_TERMINATOR]).await?;
        self.stream.flush().await?;

        let mut raw = Vec::new();
        let n = self.stream.read_until(LINE_TERMINATOR, &mut raw).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed the connection",
            ));
        }

        let payload = if self.telnet { strip_iac(&raw) } else { raw };
        let line = String::from_utf8_lossy(&payload);
        Ok(line.split_whitespace().map(str::to_string).collect())
    }

    /// Send a command, logging `display` in place of the real command text
    /// (so login secrets stay out of the log). Retries once through a fresh
    /// connection on I/O failure.
    async fn send_redacted(
        &mut self,
        command: &str,
        redacted: &str,
    ) -> Result<Vec<String>, TransportError> {
        debug!(addr = %self.endpoint.addr(), command = %redacted, "send");
        let tokens = match self.exchange(command).await {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(
                    addr = %self.endpoint.addr(),
                    command = %redacted,
                    error = %err,
                    "transport error, reconnecting once"
                );
                self.reconnect().await?;
                self.exchange(command)
                    .await
                    .map_err(|source| TransportError::ConnectionLost {
                        addr: self.endpoint.addr(),
                        command: redacted.to_string(),
                        source,
                    })?
            }
        };
        debug!(addr = %self.endpoint.addr(), ?tokens, "recv");
        Ok(tokens)
    }
}

/// Remove telnet IAC negotiation sequences from a raw read.
///
/// The MOXA bridge does not negotiate in practice, but a stray WILL/WONT
/// burst on session start must not corrupt the first response line.
fn strip_iac(raw: &[u8]) -> Vec<u8> {
    const IAC: u8 = 0xFF;
    const SB: u8 = 250;
    const SE: u8 = 240;

    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let byte = raw[i];
        if byte != IAC {
            out.push(byte);
            i += 1;
            continue;
        }
        match raw.get(i + 1) {
            // Escaped 0xFF data byte.
            Some(&IAC) => {
                out.push(IAC);
                i += 2;
            }
            // Subnegotiation: skip through IAC SE.
            Some(&SB) => {
                i += 2;
                while i < raw.len() && !(raw[i] == IAC && raw.get(i + 1) == Some(&SE)) {
                    i += 1;
                }
                i += 2;
            }
            // WILL/WONT/DO/DONT carry one option byte.
            Some(251..=254) => i += 3,
            // Bare two-byte command.
            Some(_) => i += 2,
            None => i += 1,
        }
    }
    out
}

/// Persistent TCP line transport (mount/TCS link).
#[derive(Debug)]
pub struct TcpLineTransport {
    inner: LineSession,
}

impl TcpLineTransport {
    pub async fn connect(endpoint: DeviceEndpoint) -> Result<Self, TransportError> {
        Ok(Self {
            inner: LineSession::connect(endpoint, false).await?,
        })
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.inner.endpoint
    }

    /// Send one command and read the whitespace-split response tokens.
    pub async fn send(&mut self, command: &str) -> Result<Vec<String>, TransportError> {
        self.inner.send_redacted(command, command).await
    }

    /// As [`send`](Self::send), but logs `display` instead of the command.
    pub async fn send_redacted(
        &mut self,
        command: &str,
        display: &str,
    ) -> Result<Vec<String>, TransportError> {
        self.inner.send_redacted(command, display).await
    }
}

/// Persistent telnet transport (spectrograph wheel link).
pub struct TelnetTransport {
    inner: LineSession,
}

impl TelnetTransport {
    pub async fn connect(endpoint: DeviceEndpoint) -> Result<Self, TransportError> {
        Ok(Self {
            inner: LineSession::connect(endpoint, true).await?,
        })
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.inner.endpoint
    }

    pub async fn send(&mut self, command: &str) -> Result<Vec<String>, TransportError> {
        self.inner.send_redacted(command, command).await
    }
}

/// Stateless authenticated HTTP GET transport (camera daemon).
///
/// Every call is its own request/response; there is no connection to
/// recover, so there is no retry here either.
pub struct HttpTransport {
    base_url: String,
    user: String,
    password: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport for `endpoint`. Credentials are required: the
    /// camera daemon rejects unauthenticated requests.
    pub fn new(endpoint: &DeviceEndpoint) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| TransportError::Http {
                url: endpoint.addr(),
                source,
            })?;
        let (user, password) = match endpoint.credentials() {
            Some(c) => (c.user.clone(), c.secret.clone()),
            None => (String::new(), String::new()),
        };
        Ok(Self {
            base_url: format!("http://{}:{}/", endpoint.host(), endpoint.port()),
            user,
            password,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One authenticated GET; the JSON body is the response.
    pub async fn get(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, ?params, "http get");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.user, Some(&self.password))
            .query(params)
            .send()
            .await
            .map_err(|source| TransportError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|source| TransportError::Json {
                    url: url.clone(),
                    source,
                })?;
        debug!(url = %url, "http response decoded");
        Ok(body)
    }
}
