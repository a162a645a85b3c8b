//! CCD3 camera client.
//!
//! The camera daemon is driven over authenticated HTTP GET with JSON
//! replies - there is no event push, only polling. Exposure parameters are
//! staged with `api/mset`, an exposure is started with `api/expose`
//! (carrying the target filename), state is read with `api/get`, and a
//! running exposure script is killed with `api/killscript`. Every reply
//! carries at least a `state` integer, decoded by [`CcdState`].

mod params;
mod status;

pub use params::{ExposureParameters, EXPECTED_PARAMETERS};
pub use status::*;

use std::time::{Duration, Instant};

use dk154_core::{CancelToken, DeviceEndpoint, HttpTransport, TransportError};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum Ccd3Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("camera response missing or malformed field '{field}'")]
    BadField { field: &'static str },

    /// The exposure wait was cancelled; one stop attempt was already made.
    #[error("exposure wait cancelled")]
    Cancelled,
}

/// Pause after every daemon request; the control scripts misbehave without
/// a beat between calls.
const REQUEST_SETTLE: Duration = Duration::from_millis(500);

/// Default cadence of the observability state polls during an exposure
/// wait.
const STATE_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Default read-out allowance added to the exposure time.
pub const DEFAULT_READ_TIME: f64 = 45.0;

/// CCD3 camera client.
pub struct Ccd3 {
    http: HttpTransport,
    staged: Option<ExposureParameters>,
    settle: Duration,
    poll_interval: Duration,
}

impl Ccd3 {
    pub fn new(endpoint: &DeviceEndpoint) -> Result<Self, Ccd3Error> {
        info!(addr = %endpoint.addr(), "initialising CCD3 client");
        Ok(Self {
            http: HttpTransport::new(endpoint)?,
            staged: None,
            settle: REQUEST_SETTLE,
            poll_interval: STATE_POLL_INTERVAL,
        })
    }

    /// Override the post-request settle delay (tests).
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Override the observability poll cadence (tests, chatty logs).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Whether parameters have been staged since the last exposure start.
    pub fn has_staged_parameters(&self) -> bool {
        self.staged.is_some()
    }

    async fn request(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, Ccd3Error> {
        let body = self.http.get(path, query).await?;
        tokio::time::sleep(self.settle).await;
        Ok(body)
    }

    fn state_of(body: &serde_json::Value) -> Result<CcdState, Ccd3Error> {
        body.get("state")
            .and_then(serde_json::Value::as_i64)
            .map(CcdState)
            .ok_or(Ccd3Error::BadField { field: "state" })
    }

    /// Full `api/get` status document.
    pub async fn status(&self) -> Result<serde_json::Value, Ccd3Error> {
        self.request("api/get", &[("e", "1".to_string()), ("d", "CCD3".to_string())])
            .await
    }

    /// Current CCD status word.
    pub async fn state(&self) -> Result<CcdState, Ccd3Error> {
        let body = self.status().await?;
        let state = Self::state_of(&body)?;
        debug!(state = %state, "CCD3 state");
        Ok(state)
    }

    /// Stage exposure parameters via `api/mset`.
    ///
    /// An `async` flag is merged in unless the caller provided one.
    /// Unrecognised keys are staged anyway - newer firmware may know them -
    /// but logged, so a typo does not fail silently.
    pub async fn set_exposure_parameters(
        &mut self,
        mut params: ExposureParameters,
    ) -> Result<CcdState, Ccd3Error> {
        params.insert_default_async();
        let unknown = params.unknown_keys();
        if !unknown.is_empty() {
            warn!(?unknown, "unknown exposure parameters");
        }

        let query: Vec<(&str, String)> = params
            .iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        let body = self.request("api/mset", &query).await?;
        let state = Self::state_of(&body)?;
        debug!(state = %state, "parameters staged");
        self.staged = Some(params);
        Ok(state)
    }

    /// Start an exposure saving to `filename` on the camera host.
    ///
    /// Warns when nothing was staged since the last exposure - the daemon
    /// then silently repeats the previous configuration - and proceeds.
    /// Staged parameters are consumed by this call.
    pub async fn start_exposure(&mut self, filename: &str) -> Result<CcdState, Ccd3Error> {
        if self.staged.is_none() {
            warn!(
                filename,
                "no exposure parameters staged since the last exposure - the previous \
                 configuration will be repeated"
            );
        }
        info!(filename, "starting exposure");
        let body = self
            .request(
                "api/expose",
                &[("ccd", "CCD3".to_string()), ("fe", filename.to_string())],
            )
            .await?;
        let state = Self::state_of(&body)?;
        info!(state = %state, "exposure started");
        self.staged = None;
        Ok(state)
    }

    /// Kill the running exposure script. Asynchronous on the daemon side:
    /// this does not wait for the camera to settle, callers poll
    /// [`state`](Self::state) separately.
    pub async fn stop_exposure(&self) -> Result<(), Ccd3Error> {
        info!("stopping exposure");
        self.request("api/killscript", &[("d", "CCD3".to_string())])
            .await?;
        Ok(())
    }

    /// Read the exposure time back from the daemon's status document.
    /// The `exposure` entry is `[<code>, <exp_time>, 0, 0, <comment>]`.
    async fn read_back_exposure_time(&self) -> Result<f64, Ccd3Error> {
        let body = self.status().await?;
        body.get("d")
            .and_then(|d| d.get("exposure"))
            .and_then(|e| e.get(1))
            .and_then(serde_json::Value::as_f64)
            .ok_or(Ccd3Error::BadField {
                field: "d.exposure",
            })
    }

    /// Block for `exp_time + read_time` seconds, polling the status word at
    /// a fixed interval purely for observability. The read-out is not a
    /// discrete event in this protocol, so the poll never shortens or
    /// extends the wait. When `exp_time` is `None` it is read back from the
    /// daemon. Cancellation is checked each interval and triggers one
    /// best-effort stop before returning [`Ccd3Error::Cancelled`].
    pub async fn wait_for_exposure(
        &mut self,
        exp_time: Option<f64>,
        read_time: f64,
        cancel: &CancelToken,
    ) -> Result<(), Ccd3Error> {
        let exp_time = match exp_time {
            Some(t) => t,
            None => {
                let t = self.read_back_exposure_time().await?;
                info!(exp_time = t, "read exposure time back from camera");
                t
            }
        };

        let total = Duration::from_secs_f64((exp_time + read_time).max(0.0));
        info!(exp_time, read_time, "waiting for exposure and read-out");
        let started = Instant::now();

        loop {
            let elapsed = started.elapsed();
            if elapsed >= total {
                break;
            }
            tokio::time::sleep((total - elapsed).min(self.poll_interval)).await;

            if cancel.is_cancelled() {
                warn!("exposure wait cancelled - sending best-effort stop");
                if let Err(err) = self.stop_exposure().await {
                    warn!(error = %err, "stop attempt failed");
                }
                return Err(Ccd3Error::Cancelled);
            }

            match self.state().await {
                Ok(state) => info!(state = %state, elapsed = ?started.elapsed(), "ccd state"),
                Err(err) => warn!(error = %err, "state poll failed during exposure wait"),
            }
        }

        info!(elapsed = ?started.elapsed(), "exposure wait complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dk154_core::EndpointMode;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP/1.1 mock of the camera daemon. Records request targets
    /// (path + query) and answers canned JSON per endpoint.
    async fn spawn_mock_daemon(log: Arc<Mutex<Vec<String>>>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let log = log.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&buf);
                    let target = request
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or("/")
                        .to_string();
                    log.lock().unwrap().push(target.clone());

                    let body = if target.starts_with("/api/get") {
                        r#"{"state": 1, "d": {"exposure": [7, 0.05, 0, 0, "exposure time"]}}"#
                    } else if target.starts_with("/api/mset") {
                        r#"{"state": 0}"#
                    } else if target.starts_with("/api/expose") {
                        r#"{"state": 67108865}"#
                    } else if target.starts_with("/api/killscript") {
                        r#"{"state": 65536}"#
                    } else {
                        r#"{"state": -1}"#
                    };
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });
        addr
    }

    async fn mock_camera(log: Arc<Mutex<Vec<String>>>) -> Ccd3 {
        let addr = spawn_mock_daemon(log).await;
        let endpoint =
            DeviceEndpoint::new(addr.ip().to_string(), addr.port(), EndpointMode::Simulated)
                .with_credentials("dk154", "dk154");
        Ccd3::new(&endpoint)
            .unwrap()
            .with_settle(Duration::ZERO)
            .with_poll_interval(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_state_decodes_status_word() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let camera = mock_camera(log).await;
        let state = camera.state().await.unwrap();
        assert!(state.is_exposing());
        assert_eq!(state.raw(), 1);
    }

    #[tokio::test]
    async fn test_staging_lifecycle_and_stale_start() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut camera = mock_camera(log.clone()).await;

        let params = ExposureParameters::new().exposure(1.0).shutter_closed(true);
        camera.set_exposure_parameters(params).await.unwrap();
        assert!(camera.has_staged_parameters());

        camera.start_exposure("/ucph/test_000.fits").await.unwrap();
        assert!(!camera.has_staged_parameters());

        // Second start with nothing restaged: warns but still exposes.
        camera.start_exposure("/ucph/test_001.fits").await.unwrap();

        let seen = log.lock().unwrap().clone();
        let exposes = seen
            .iter()
            .filter(|t| t.starts_with("/api/expose"))
            .count();
        assert_eq!(exposes, 2);
        assert!(seen.iter().any(|t| t.starts_with("/api/mset")
            && t.contains("CCD3.SHUTTER=1")
            && t.contains("async=0")));
    }

    #[tokio::test]
    async fn test_wait_for_exposure_blocks_full_duration_and_polls() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut camera = mock_camera(log.clone()).await;
        let cancel = CancelToken::new();

        let started = Instant::now();
        camera
            .wait_for_exposure(Some(0.05), 0.05, &cancel)
            .await
            .unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100), "elapsed {elapsed:?}");

        let polls = log
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.starts_with("/api/get"))
            .count();
        assert!(polls >= 1, "no observability poll happened");
    }

    #[tokio::test]
    async fn test_wait_reads_exposure_time_back_when_not_given() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut camera = mock_camera(log).await;
        let cancel = CancelToken::new();
        // Daemon reports 0.05 s; total wait 0.05 + 0.02.
        camera
            .wait_for_exposure(None, 0.02, &cancel)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_during_wait_attempts_stop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut camera = mock_camera(log.clone()).await;
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = camera
            .wait_for_exposure(Some(5.0), 5.0, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Ccd3Error::Cancelled));
        let seen = log.lock().unwrap().clone();
        assert!(
            seen.iter().any(|t| t.starts_with("/api/killscript")),
            "no stop attempt in {:?}",
            seen
        );
    }

    #[tokio::test]
    async fn test_poll_failure_does_not_abort_wait() {
        // Point at a dead port: every observability poll fails, the wait
        // still completes.
        let endpoint = DeviceEndpoint::new("127.0.0.1", 1, EndpointMode::Simulated)
            .with_credentials("dk154", "dk154");
        let mut camera = Ccd3::new(&endpoint)
            .unwrap()
            .with_settle(Duration::ZERO)
            .with_poll_interval(Duration::from_millis(20));
        let cancel = CancelToken::new();
        camera
            .wait_for_exposure(Some(0.03), 0.02, &cancel)
            .await
            .unwrap();
    }
}
