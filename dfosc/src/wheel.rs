//! DFOSC wheel client
//!
//! Command grammar (per wheel, prefix letter `G`/`A`/`F`):
//! `<P>I` initialize to the hall switch, `<P>G<nnnnnn>` absolute goto,
//! `<P>M<+/-nnnnnn>` relative move, `<P>P` read step position, `<P>Q` quit
//! the current move, `<P><n>` goto preset n, and the lowercase prefix alone
//! probes driver readiness (`y`/`n`).

use std::time::Duration;

use dk154_core::{
    wait_for_result, CancelToken, DeviceEndpoint, TelnetTransport, WaitError, WaitSpec,
};
use futures::FutureExt;
use tracing::{debug, info};

use crate::error::DfoscError;
use crate::setup::{WheelPositionTable, WHEEL_CIRCUMFERENCE};

/// Single-token reply that signals a command-level failure.
const ERR_SENTINEL: &str = "ERR";

/// The three independently addressable wheels on the DFOSC link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelKind {
    Grism,
    Aperture,
    Filter,
}

impl WheelKind {
    /// Uppercase command prefix.
    pub fn prefix(&self) -> char {
        match self {
            WheelKind::Grism => 'G',
            WheelKind::Aperture => 'A',
            WheelKind::Filter => 'F',
        }
    }

    /// Lowercase ready-probe command.
    pub fn ready_probe(&self) -> char {
        self.prefix().to_ascii_lowercase()
    }

    pub fn label(&self) -> &'static str {
        match self {
            WheelKind::Grism => "grism",
            WheelKind::Aperture => "aperture",
            WheelKind::Filter => "filter",
        }
    }
}

impl std::fmt::Display for WheelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Client for the shared DFOSC wheel link.
pub struct Dfosc {
    transport: TelnetTransport,
    ready_wait: WaitSpec,
}

impl Dfosc {
    /// Default ready-wait cadence: the wheels need up to two minutes to
    /// settle after an init.
    pub fn default_ready_wait() -> WaitSpec {
        // Both values satisfy the WaitSpec invariants; construction cannot
        // fail for them.
        WaitSpec::new(Duration::from_secs(5), Duration::from_secs(120))
            .unwrap_or_else(|_| unreachable!("constants satisfy the WaitSpec bounds"))
    }

    pub async fn connect(endpoint: DeviceEndpoint) -> Result<Self, DfoscError> {
        info!(addr = %endpoint.addr(), "connecting to DFOSC wheel controller");
        let transport = TelnetTransport::connect(endpoint).await?;
        Ok(Self {
            transport,
            ready_wait: Self::default_ready_wait(),
        })
    }

    /// Override the ready-wait cadence (tests, slow hardware).
    pub fn with_ready_wait(mut self, spec: WaitSpec) -> Self {
        self.ready_wait = spec;
        self
    }

    async fn command(&mut self, command: &str) -> Result<Vec<String>, DfoscError> {
        let tokens = self.transport.send(command).await?;
        if tokens.len() == 1 && tokens[0] == ERR_SENTINEL {
            return Err(DfoscError::CommandRejected {
                command: command.to_string(),
            });
        }
        Ok(tokens)
    }

    /// First reply token; trailing tokens are positioning noise the
    /// controller appends on some firmware revisions.
    async fn command_first(&mut self, command: &str) -> Result<String, DfoscError> {
        let tokens = self.command(command).await?;
        tokens
            .into_iter()
            .next()
            .ok_or_else(|| DfoscError::EmptyReply {
                command: command.to_string(),
            })
    }

    /// Initialize the wheel to its hall switch. Required after a power
    /// cycle or manual wheel movement.
    pub async fn init(&mut self, kind: WheelKind) -> Result<(), DfoscError> {
        info!(wheel = %kind, "initializing wheel");
        self.command_first(&format!("{}I", kind.prefix())).await?;
        Ok(())
    }

    /// Absolute goto. The step is validated against the circumference
    /// before anything is sent.
    pub async fn goto_step(&mut self, kind: WheelKind, step: u32) -> Result<(), DfoscError> {
        if step >= WHEEL_CIRCUMFERENCE {
            return Err(DfoscError::StepOutOfRange {
                step,
                limit: WHEEL_CIRCUMFERENCE,
            });
        }
        self.command_first(&format!("{}G{:06}", kind.prefix(), step))
            .await?;
        Ok(())
    }

    /// Relative move by a signed step count.
    pub async fn move_relative(&mut self, kind: WheelKind, delta: i32) -> Result<(), DfoscError> {
        self.command_first(&format!("{}M{:+}", kind.prefix(), delta))
            .await?;
        Ok(())
    }

    /// Goto one of the eight preset detents (n * 40000 steps).
    pub async fn goto_preset(&mut self, kind: WheelKind, preset: u8) -> Result<(), DfoscError> {
        if preset > 7 {
            return Err(DfoscError::PresetOutOfRange { preset });
        }
        self.command_first(&format!("{}{}", kind.prefix(), preset))
            .await?;
        Ok(())
    }

    /// Read the current step position.
    pub async fn position(&mut self, kind: WheelKind) -> Result<u32, DfoscError> {
        let command = format!("{}P", kind.prefix());
        let token = self.command_first(&command).await?;
        token
            .parse::<u32>()
            .map_err(|err| DfoscError::MalformedPosition {
                command,
                token,
                reason: err.to_string(),
            })
    }

    /// Probe driver readiness: `y` means the wheel is settled and will
    /// accept a move.
    pub async fn is_ready(&mut self, kind: WheelKind) -> Result<bool, DfoscError> {
        let command = kind.ready_probe().to_string();
        let token = self.command_first(&command).await?;
        match token.as_str() {
            "y" => Ok(true),
            "n" => Ok(false),
            _ => Err(DfoscError::UnexpectedReply { command, token }),
        }
    }

    /// Quit the current move. Only meaningful shortly after a goto.
    pub async fn quit(&mut self, kind: WheelKind) -> Result<(), DfoscError> {
        self.command_first(&format!("{}Q", kind.prefix())).await?;
        Ok(())
    }

    /// Block until the wheel reports ready, or fail with the dedicated
    /// not-ready error after the wait budget.
    pub async fn wait_until_ready(
        &mut self,
        kind: WheelKind,
        cancel: &CancelToken,
    ) -> Result<(), DfoscError> {
        let operation = format!("{} wheel ready", kind.label());
        let spec = self.ready_wait;
        let result = wait_for_result(
            &operation,
            self,
            |dfosc| {
                async move {
                    dfosc
                        .is_ready(kind)
                        .await
                        .map(|ready| if ready { "ready" } else { "busy" })
                }
                .boxed()
            },
            &["ready"],
            spec,
            cancel,
        )
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(WaitError::Timeout { elapsed, .. }) => Err(DfoscError::WheelNotReady {
                wheel: kind.label(),
                elapsed,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Two-phase confirmed move: wait ready, goto, wait ready again.
    ///
    /// The leading wait is mandatory - issuing a move to a not-ready wheel
    /// is undefined hardware behavior and is never attempted.
    pub async fn goto_step_confirmed(
        &mut self,
        kind: WheelKind,
        step: u32,
        cancel: &CancelToken,
    ) -> Result<(), DfoscError> {
        self.wait_until_ready(kind, cancel).await?;
        info!(wheel = %kind, step, "wheel ready, moving");
        self.goto_step(kind, step).await?;
        self.wait_until_ready(kind, cancel).await?;
        debug!(wheel = %kind, step, "move confirmed");
        Ok(())
    }

    /// Named confirmed move through a position table. Unknown names are
    /// rejected before any command is sent.
    pub async fn goto_position_confirmed(
        &mut self,
        kind: WheelKind,
        table: &WheelPositionTable,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<(), DfoscError> {
        let step = table
            .step_of(name)
            .ok_or_else(|| DfoscError::UnknownPosition {
                wheel: kind.label().to_string(),
                name: name.to_string(),
                known: table.names().map(str::to_string).collect(),
            })?;
        self.goto_step_confirmed(kind, step, cancel).await
    }

    /// Initialize and wait for the wheel to settle on the hall switch.
    pub async fn init_confirmed(
        &mut self,
        kind: WheelKind,
        cancel: &CancelToken,
    ) -> Result<(), DfoscError> {
        self.init(kind).await?;
        self.wait_until_ready(kind, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::WheelPositionTable;
    use dk154_core::EndpointMode;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// Mock MOXA bridge: wheels report busy for the first
    /// `busy_polls` ready probes after every move, then ready.
    async fn spawn_mock_moxa(
        log: Arc<Mutex<Vec<String>>>,
        busy_polls: u32,
    ) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let busy_left = AtomicU32::new(0);
            let (socket, _) = match listener.accept().await {
                Ok(x) => x,
                Err(_) => return,
            };
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                log.lock().unwrap().push(line.clone());
                let reply: String = match line.as_str() {
                    "g" | "a" | "f" => {
                        if busy_left.load(Ordering::SeqCst) > 0 {
                            busy_left.fetch_sub(1, Ordering::SeqCst);
                            "n".to_string()
                        } else {
                            "y".to_string()
                        }
                    }
                    "GP" | "AP" | "FP" => "040000".to_string(),
                    line if line.len() >= 2 && line.as_bytes()[1] == b'G' => {
                        busy_left.store(busy_polls, Ordering::SeqCst);
                        "1".to_string()
                    }
                    line if line.ends_with('I') => {
                        busy_left.store(busy_polls, Ordering::SeqCst);
                        "1".to_string()
                    }
                    _ => "ERR".to_string(),
                };
                if write
                    .write_all(format!("{}\n", reply).as_bytes())
                    .await
                    .is_err()
                {
                    return;
                }
            }
        });
        addr
    }

    async fn connect_mock(log: Arc<Mutex<Vec<String>>>, busy_polls: u32) -> Dfosc {
        let addr = spawn_mock_moxa(log, busy_polls).await;
        let endpoint =
            DeviceEndpoint::new(addr.ip().to_string(), addr.port(), EndpointMode::Simulated);
        Dfosc::connect(endpoint)
            .await
            .unwrap()
            .with_ready_wait(
                WaitSpec::new(Duration::from_millis(5), Duration::from_millis(200)).unwrap(),
            )
    }

    #[tokio::test]
    async fn test_confirmed_goto_is_two_phase() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dfosc = connect_mock(log.clone(), 2).await;
        let cancel = CancelToken::new();

        dfosc
            .goto_step_confirmed(WheelKind::Grism, 40_000, &cancel)
            .await
            .unwrap();

        let seen = log.lock().unwrap().clone();
        let goto_index = seen.iter().position(|l| l == "GG040000").unwrap();
        // At least one ready probe before the move and at least one after.
        assert!(seen[..goto_index].iter().any(|l| l == "g"));
        assert!(seen[goto_index + 1..].iter().any(|l| l == "g"));
    }

    #[tokio::test]
    async fn test_not_ready_raises_dedicated_error_without_moving() {
        let log = Arc::new(Mutex::new(Vec::new()));
        // More busy polls than the wait budget allows.
        let mut dfosc = connect_mock(log.clone(), 10_000).await;
        let cancel = CancelToken::new();
        // Poison the ready state via an init so every probe reports busy.
        dfosc.init(WheelKind::Filter).await.unwrap();

        let err = dfosc
            .goto_step_confirmed(WheelKind::Filter, 80_000, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DfoscError::WheelNotReady { wheel: "filter", .. }
        ));
        let seen = log.lock().unwrap().clone();
        assert!(
            !seen.iter().any(|l| l.starts_with("FG")),
            "move was issued to a not-ready wheel: {:?}",
            seen
        );
    }

    #[tokio::test]
    async fn test_position_parses_step() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dfosc = connect_mock(log, 0).await;
        assert_eq!(dfosc.position(WheelKind::Aperture).await.unwrap(), 40_000);
    }

    #[tokio::test]
    async fn test_step_out_of_range_rejected_before_send() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dfosc = connect_mock(log.clone(), 0).await;
        let err = dfosc
            .goto_step(WheelKind::Grism, WHEEL_CIRCUMFERENCE)
            .await
            .unwrap_err();
        assert!(matches!(err, DfoscError::StepOutOfRange { .. }));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_position_name_rejected_before_send() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dfosc = connect_mock(log.clone(), 0).await;
        let cancel = CancelToken::new();
        let table = WheelPositionTable::new(
            "filter",
            [("empty".to_string(), 0), ("V".to_string(), 40_000)],
        )
        .unwrap();

        let err = dfosc
            .goto_position_confirmed(WheelKind::Filter, &table, "R", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DfoscError::UnknownPosition { .. }));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_ready_token_is_loud() {
        // Ready probe answered with something that is neither y nor n.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();
            if let Ok(Some(_)) = lines.next_line().await {
                write.write_all(b"maybe\n").await.unwrap();
            }
        });
        let endpoint =
            DeviceEndpoint::new(addr.ip().to_string(), addr.port(), EndpointMode::Simulated);
        let mut dfosc = Dfosc::connect(endpoint).await.unwrap();
        let err = dfosc.is_ready(WheelKind::Grism).await.unwrap_err();
        assert!(matches!(err, DfoscError::UnexpectedReply { .. }));
    }
}
