//! ASCOL protocol client
//!
//! One method per protocol operation, in the ASCOL document's order. Set
//! and go commands issue a login first - the TCS session is ephemeral and
//! privileged writes are only honored on an authenticated session, so the
//! login is repeated per write rather than once per connection. Read
//! commands never login.

use dk154_core::{DeviceEndpoint, TcpLineTransport};
use tracing::{debug, info};

use crate::codes;
use crate::error::AscolError;

/// Single-token reply that signals a command-level failure.
pub const ERR_SENTINEL: &str = "ERR";

/// The two FASU auxiliary filter wheels reached through the mount protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FasuWheel {
    A,
    B,
}

impl FasuWheel {
    /// Position table for this wheel.
    pub fn position_table(&self) -> &'static codes::CodeTable {
        match self {
            FasuWheel::A => &codes::WARP,
            FasuWheel::B => &codes::WBRP,
        }
    }

    /// State table for this wheel.
    pub fn state_table(&self) -> &'static codes::CodeTable {
        match self {
            FasuWheel::A => &codes::WARS,
            FasuWheel::B => &codes::WBRS,
        }
    }

    /// Highest settable position code; the code above it is the transient
    /// "rotating" state.
    fn max_settable(&self) -> u8 {
        match self {
            FasuWheel::A => 7,
            FasuWheel::B => 6,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FasuWheel::A => "wheel A",
            FasuWheel::B => "wheel B",
        }
    }
}

/// Pier side argument for TSRA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PierSide {
    East,
    West,
}

impl PierSide {
    fn code(&self) -> &'static str {
        match self {
            PierSide::East => "0",
            PierSide::West => "1",
        }
    }

    /// Accepts the protocol codes and the spelled-out names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "east" => Some(PierSide::East),
            "1" | "west" => Some(PierSide::West),
            _ => None,
        }
    }
}

/// ASCOL client over one scoped TCP connection.
#[derive(Debug)]
pub struct Ascol {
    transport: TcpLineTransport,
    password: String,
}

impl Ascol {
    /// Connect to the TCS. The endpoint must carry the global password;
    /// read-only use still needs it configured so that a later privileged
    /// call cannot fail halfway through an operation.
    pub async fn connect(endpoint: DeviceEndpoint) -> Result<Self, AscolError> {
        let password = endpoint
            .credentials()
            .map(|c| c.secret.clone())
            .ok_or_else(|| AscolError::MissingCredentials(endpoint.addr()))?;
        info!(addr = %endpoint.addr(), "connecting to TCS");
        let transport = TcpLineTransport::connect(endpoint).await?;
        Ok(Self {
            transport,
            password,
        })
    }

    async fn command(&mut self, command: &str) -> Result<Vec<String>, AscolError> {
        self.command_redacted(command, command).await
    }

    async fn command_redacted(
        &mut self,
        command: &str,
        display: &str,
    ) -> Result<Vec<String>, AscolError> {
        let tokens = self.transport.send_redacted(command, display).await?;
        if tokens.len() == 1 && tokens[0] == ERR_SENTINEL {
            let code = display.split_whitespace().next().unwrap_or(display);
            return Err(AscolError::CommandRejected {
                command: code.to_string(),
            });
        }
        Ok(tokens)
    }

    fn single(command: &'static str, tokens: Vec<String>) -> Result<String, AscolError> {
        let mut iter = tokens.into_iter();
        match (iter.next(), iter.next()) {
            (Some(token), None) => Ok(token),
            (first, second) => Err(AscolError::UnexpectedResponse {
                command,
                expected: 1,
                got: first.into_iter().chain(second).collect(),
            }),
        }
    }

    /// First token of a reply that carries a trailing dummy value.
    fn first_of(command: &'static str, tokens: Vec<String>) -> Result<String, AscolError> {
        tokens
            .first()
            .cloned()
            .ok_or(AscolError::UnexpectedResponse {
                command,
                expected: 1,
                got: Vec::new(),
            })
    }

    fn pair(command: &'static str, tokens: Vec<String>) -> Result<(String, String), AscolError> {
        if tokens.len() == 2 {
            Ok((tokens[0].clone(), tokens[1].clone()))
        } else {
            Err(AscolError::UnexpectedResponse {
                command,
                expected: 2,
                got: tokens,
            })
        }
    }

    fn parse_f64(command: &'static str, token: &str) -> Result<f64, AscolError> {
        token.parse::<f64>().map_err(|err| AscolError::Malformed {
            command,
            token: token.to_string(),
            reason: err.to_string(),
        })
    }

    /// GLobal LoGin. Idempotent; issued automatically before every
    /// privileged write. The password never reaches the log.
    pub async fn login(&mut self) -> Result<(), AscolError> {
        let command = format!("GLLG {}", self.password);
        let tokens = self.command_redacted(&command, "GLLG <pwd>").await?;
        let code = Self::single("GLLG", tokens)?;
        match codes::GLLG.decode(&code)? {
            "correct password" => Ok(()),
            _ => Err(AscolError::LoginRejected),
        }
    }

    // --- global reads ---

    /// GLobal read REmote state.
    pub async fn remote_state(&mut self) -> Result<&'static str, AscolError> {
        let tokens = self.command("GLRE").await?;
        Ok(codes::GLRE.decode(&Self::single("GLRE", tokens)?)?)
    }

    /// GLobal read Safety Relay state.
    pub async fn safety_relay_state(&mut self) -> Result<&'static str, AscolError> {
        let tokens = self.command("GLSR").await?;
        Ok(codes::GLSR.decode(&Self::single("GLSR", tokens)?)?)
    }

    /// GLobal read Latitude and Longitude.
    pub async fn latitude_longitude(&mut self) -> Result<(String, String), AscolError> {
        let tokens = self.command("GLLL").await?;
        Self::pair("GLLL", tokens)
    }

    /// GLobal read UTc: modified Julian date and time-of-day.
    pub async fn utc(&mut self) -> Result<(String, String), AscolError> {
        let tokens = self.command("GLUT").await?;
        Self::pair("GLUT", tokens)
    }

    /// GLobal read SiDereal time.
    pub async fn sidereal_time(&mut self) -> Result<String, AscolError> {
        let tokens = self.command("GLSD").await?;
        Self::single("GLSD", tokens)
    }

    // --- telescope ---

    /// TElescope ON/off. Privileged.
    pub async fn telescope_on(&mut self, on: bool) -> Result<(), AscolError> {
        self.login().await?;
        let command = format!("TEON {}", if on { "1" } else { "0" });
        let tokens = self.command(&command).await?;
        Self::single("TEON", tokens).map(|_| ())
    }

    /// Telescope Set Right ascension and declination. Privileged.
    ///
    /// `ra` is `hhmmss.s`, `dec` is signed `ddmmss.s`; both are forwarded
    /// verbatim after a shape check.
    pub async fn set_ra_dec(
        &mut self,
        ra: &str,
        dec: &str,
        side: PierSide,
    ) -> Result<(), AscolError> {
        for (name, value) in [("ra", ra), ("dec", dec)] {
            if value.is_empty() || value.contains(char::is_whitespace) {
                return Err(AscolError::InvalidInput {
                    command: "TSRA",
                    reason: format!("{name} '{value}' is not a coordinate token"),
                });
            }
        }
        self.login().await?;
        let command = format!("TSRA {} {} {}", ra, dec, side.code());
        let tokens = self.command(&command).await?;
        Self::single("TSRA", tokens).map(|_| ())
    }

    /// Telescope Go Right Ascension and declination. Privileged.
    pub async fn go_ra_dec(&mut self) -> Result<(), AscolError> {
        self.login().await?;
        let tokens = self.command("TGRA").await?;
        Self::first_of("TGRA", tokens).map(|_| ())
    }

    /// Telescope Read Right ascension and Declination: RA, Dec and the
    /// decoded pier side.
    pub async fn read_ra_dec(&mut self) -> Result<(String, String, &'static str), AscolError> {
        let tokens = self.command("TRRD").await?;
        if tokens.len() != 3 {
            return Err(AscolError::UnexpectedResponse {
                command: "TRRD",
                expected: 3,
                got: tokens,
            });
        }
        let side = codes::TRRD_SIDE.decode(&tokens[2])?;
        Ok((tokens[0].clone(), tokens[1].clone(), side))
    }

    /// TElescope Read State.
    pub async fn telescope_state(&mut self) -> Result<&'static str, AscolError> {
        let tokens = self.command("TERS").await?;
        Ok(codes::TERS.decode(&Self::first_of("TERS", tokens)?)?)
    }

    // --- dome ---

    /// DOme Read State.
    pub async fn dome_state(&mut self) -> Result<&'static str, AscolError> {
        let tokens = self.command("DORS").await?;
        Ok(codes::DORS.decode(&Self::first_of("DORS", tokens)?)?)
    }

    /// DOme Automatic Mode: dome follows the telescope. Privileged.
    pub async fn dome_auto(&mut self) -> Result<(), AscolError> {
        self.login().await?;
        let tokens = self.command("DOAM").await?;
        Self::first_of("DOAM", tokens).map(|_| ())
    }

    /// DOme STop. Privileged.
    pub async fn dome_stop(&mut self) -> Result<(), AscolError> {
        self.login().await?;
        let tokens = self.command("DOST").await?;
        Self::first_of("DOST", tokens).map(|_| ())
    }

    /// DOme Slit Open/close. Privileged.
    pub async fn dome_slit(&mut self, open: bool) -> Result<(), AscolError> {
        self.login().await?;
        let command = format!("DOSO {}", if open { "1" } else { "0" });
        let tokens = self.command(&command).await?;
        Self::first_of("DOSO", tokens).map(|_| ())
    }

    /// DOme read Slit State.
    pub async fn dome_slit_state(&mut self) -> Result<&'static str, AscolError> {
        let tokens = self.command("DOSS").await?;
        Ok(codes::DOSS.decode(&Self::first_of("DOSS", tokens)?)?)
    }

    // --- flaps ---

    /// Flap Cassegrain OPen/close. Privileged.
    pub async fn cassegrain_flap(&mut self, open: bool) -> Result<(), AscolError> {
        self.login().await?;
        let command = format!("FCOP {}", if open { "1" } else { "0" });
        let tokens = self.command(&command).await?;
        Self::single("FCOP", tokens).map(|_| ())
    }

    /// Flap Cassegrain Read State.
    pub async fn cassegrain_flap_state(&mut self) -> Result<&'static str, AscolError> {
        let tokens = self.command("FCRS").await?;
        Ok(codes::FCRS.decode(&Self::single("FCRS", tokens)?)?)
    }

    /// Flap Mirror OPen/close. Privileged.
    pub async fn mirror_flap(&mut self, open: bool) -> Result<(), AscolError> {
        self.login().await?;
        let command = format!("FMOP {}", if open { "1" } else { "0" });
        let tokens = self.command(&command).await?;
        Self::single("FMOP", tokens).map(|_| ())
    }

    /// Flap Mirror Read State.
    pub async fn mirror_flap_state(&mut self) -> Result<&'static str, AscolError> {
        let tokens = self.command("FMRS").await?;
        Ok(codes::FMRS.decode(&Self::single("FMRS", tokens)?)?)
    }

    // --- shutter ---

    /// SHutter OPen/close. Privileged.
    pub async fn shutter(&mut self, open: bool) -> Result<(), AscolError> {
        self.login().await?;
        let command = format!("SHOP {}", if open { "1" } else { "0" });
        let tokens = self.command(&command).await?;
        Self::first_of("SHOP", tokens).map(|_| ())
    }

    /// SHutter Read Position.
    pub async fn shutter_position(&mut self) -> Result<&'static str, AscolError> {
        let tokens = self.command("SHRP").await?;
        Ok(codes::SHRP.decode(&Self::single("SHRP", tokens)?)?)
    }

    // --- FASU wheels ---

    /// Wheel Set Position (WASP/WBSP). Privileged. The code must be one of
    /// the wheel's settable positions; the transient "rotating" code is
    /// rejected before anything is sent.
    pub async fn fasu_set_position(
        &mut self,
        wheel: FasuWheel,
        position_code: &str,
    ) -> Result<(), AscolError> {
        let command_name: &'static str = match wheel {
            FasuWheel::A => "WASP",
            FasuWheel::B => "WBSP",
        };
        let valid = position_code
            .parse::<u8>()
            .ok()
            .is_some_and(|p| p <= wheel.max_settable());
        if !valid {
            return Err(AscolError::InvalidInput {
                command: command_name,
                reason: format!(
                    "{} has settable positions 0-{}; provided: {}",
                    wheel.label(),
                    wheel.max_settable(),
                    position_code
                ),
            });
        }
        self.login().await?;
        let command = format!("{} {}", command_name, position_code);
        let tokens = self.command(&command).await?;
        Self::single(command_name, tokens).map(|_| ())
    }

    /// Wheel Go Position (WAGP/WBGP). Privileged.
    pub async fn fasu_go(&mut self, wheel: FasuWheel) -> Result<(), AscolError> {
        let command: &'static str = match wheel {
            FasuWheel::A => "WAGP",
            FasuWheel::B => "WBGP",
        };
        self.login().await?;
        let tokens = self.command(command).await?;
        Self::single(command, tokens).map(|_| ())
    }

    /// Wheel Read Position (WARP/WBRP), decoded to the filter name.
    pub async fn fasu_position(&mut self, wheel: FasuWheel) -> Result<&'static str, AscolError> {
        let command: &'static str = match wheel {
            FasuWheel::A => "WARP",
            FasuWheel::B => "WBRP",
        };
        let tokens = self.command(command).await?;
        Ok(wheel.position_table().decode(&Self::single(command, tokens)?)?)
    }

    /// Wheel Read State (WARS/WBRS), decoded.
    pub async fn fasu_state(&mut self, wheel: FasuWheel) -> Result<&'static str, AscolError> {
        let command: &'static str = match wheel {
            FasuWheel::A => "WARS",
            FasuWheel::B => "WBRS",
        };
        let tokens = self.command(command).await?;
        Ok(wheel.state_table().decode(&Self::single(command, tokens)?)?)
    }

    // --- focus ---

    /// FOcus Read State.
    pub async fn focus_state(&mut self) -> Result<&'static str, AscolError> {
        let tokens = self.command("FORS").await?;
        Ok(codes::FORS.decode(&Self::first_of("FORS", tokens)?)?)
    }

    /// FOcus Read Absolute position.
    pub async fn focus_position(&mut self) -> Result<f64, AscolError> {
        let tokens = self.command("FORA").await?;
        let token = Self::single("FORA", tokens)?;
        Self::parse_f64("FORA", &token)
    }

    /// FOcus Set Absolute position. Privileged.
    pub async fn focus_set_absolute(&mut self, position: f64) -> Result<(), AscolError> {
        if !position.is_finite() || position < 0.0 {
            return Err(AscolError::InvalidInput {
                command: "FOSA",
                reason: format!("focus position {position} must be finite and non-negative"),
            });
        }
        self.login().await?;
        let command = format!("FOSA {:.2}", position);
        let tokens = self.command(&command).await?;
        Self::single("FOSA", tokens).map(|_| ())
    }

    /// FOcus Go Absolute. Privileged.
    pub async fn focus_go_absolute(&mut self) -> Result<(), AscolError> {
        self.login().await?;
        let tokens = self.command("FOGA").await?;
        Self::single("FOGA", tokens).map(|_| ())
    }

    // --- meteo ---

    /// A meteo value with its decoded validity flag.
    async fn meteo_value(
        &mut self,
        command: &'static str,
    ) -> Result<(f64, &'static str), AscolError> {
        let tokens = self.command(command).await?;
        let (value, validity) = Self::pair(command, tokens)?;
        Ok((
            Self::parse_f64(command, &value)?,
            codes::VALIDITY.decode(&validity)?,
        ))
    }

    /// MEteo TWilight [Lux].
    pub async fn twilight(&mut self) -> Result<(f64, &'static str), AscolError> {
        self.meteo_value("METW").await
    }

    /// MEteo HUmidity [percent].
    pub async fn humidity(&mut self) -> Result<(f64, &'static str), AscolError> {
        self.meteo_value("MEHU").await
    }

    /// MEteo TEmperature [Celsius].
    pub async fn temperature(&mut self) -> Result<(f64, &'static str), AscolError> {
        self.meteo_value("METE").await
    }

    /// MEteo Wind Speed [m/s].
    pub async fn wind_speed(&mut self) -> Result<(f64, &'static str), AscolError> {
        self.meteo_value("MEWS").await
    }

    /// MEteo Atmospheric Pressure [mbar].
    pub async fn pressure(&mut self) -> Result<(f64, &'static str), AscolError> {
        self.meteo_value("MEAP").await
    }

    /// MEteo PYrgeometer irradiance [W/m2].
    pub async fn irradiance(&mut self) -> Result<(f64, &'static str), AscolError> {
        self.meteo_value("MEPY").await
    }

    /// MEteo Brightness East [kLux].
    pub async fn brightness_east(&mut self) -> Result<(f64, &'static str), AscolError> {
        self.meteo_value("MEBE").await
    }

    /// MEteo Brightness North [kLux].
    pub async fn brightness_north(&mut self) -> Result<(f64, &'static str), AscolError> {
        self.meteo_value("MEBN").await
    }

    /// MEteo Brightness West [kLux].
    pub async fn brightness_west(&mut self) -> Result<(f64, &'static str), AscolError> {
        self.meteo_value("MEBW").await
    }

    /// MEteo PRecipitation: decoded yes/no plus validity.
    pub async fn precipitation(&mut self) -> Result<(&'static str, &'static str), AscolError> {
        let tokens = self.command("MEPR").await?;
        let (code, validity) = Self::pair("MEPR", tokens)?;
        Ok((
            codes::MEPR.decode(&code)?,
            codes::VALIDITY.decode(&validity)?,
        ))
    }

    /// Raw command escape hatch for operations not wrapped above. The ERR
    /// sentinel is still detected.
    pub async fn raw_command(&mut self, command: &str) -> Result<Vec<String>, AscolError> {
        debug!(command, "raw ASCOL command");
        self.command(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dk154_core::EndpointMode;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    const TEST_PASSWORD: &str = "1178";

    fn mock_reply(line: &str) -> String {
        let mut parts = line.split_whitespace();
        let reply = match parts.next().unwrap_or("") {
            "GLLG" => {
                if parts.next() == Some(TEST_PASSWORD) {
                    "1"
                } else {
                    "0"
                }
            }
            "GLRE" => "1",
            "GLSR" => "1",
            "TERS" => "05 0",
            "DORS" => "03 0",
            "TRRD" => "123456.7 -102312.4 0",
            "TSRA" | "TGRA" | "WASP" | "WAGP" | "WBSP" | "WBGP" | "SHOP" | "DOAM" => "1",
            "WARS" => "04",
            "WARP" => "5",
            "SHRP" => "0",
            "METW" => "1.23 1",
            "MEPR" => "0 1",
            _ => "ERR",
        };
        format!("{}\n", reply)
    }

    /// Mock TCS that answers the command subset used in tests and records
    /// every received line.
    async fn spawn_mock_tcs(log: Arc<Mutex<Vec<String>>>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let log = log.clone();
                tokio::spawn(async move {
                    let (read, mut write) = socket.into_split();
                    let mut lines = BufReader::new(read).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        log.lock().unwrap().push(line.clone());
                        if write.write_all(mock_reply(&line).as_bytes()).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });
        addr
    }

    async fn connect_mock(log: Arc<Mutex<Vec<String>>>) -> Ascol {
        let addr = spawn_mock_tcs(log).await;
        let endpoint = DeviceEndpoint::new(addr.ip().to_string(), addr.port(), EndpointMode::Simulated)
            .with_credentials("dk154", TEST_PASSWORD);
        Ascol::connect(endpoint).await.unwrap()
    }

    #[tokio::test]
    async fn test_reads_decode_and_never_login() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ascol = connect_mock(log.clone()).await;

        assert_eq!(ascol.telescope_state().await.unwrap(), "sky track");
        assert_eq!(ascol.dome_state().await.unwrap(), "auto");
        assert_eq!(ascol.fasu_position(FasuWheel::A).await.unwrap(), "OII");
        assert_eq!(ascol.shutter_position().await.unwrap(), "closed");

        let seen = log.lock().unwrap().clone();
        assert!(seen.iter().all(|line| !line.starts_with("GLLG")));
    }

    #[tokio::test]
    async fn test_privileged_command_preceded_by_login() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ascol = connect_mock(log.clone()).await;

        ascol.fasu_set_position(FasuWheel::A, "0").await.unwrap();
        ascol.fasu_go(FasuWheel::A).await.unwrap();
        ascol
            .set_ra_dec("123456.7", "-102312.4", PierSide::East)
            .await
            .unwrap();

        let seen = log.lock().unwrap().clone();
        for (i, line) in seen.iter().enumerate() {
            let code = line.split_whitespace().next().unwrap_or("");
            if matches!(code, "WASP" | "WAGP" | "TSRA") {
                assert!(
                    i > 0 && seen[i - 1].starts_with("GLLG"),
                    "privileged '{}' not preceded by login in {:?}",
                    line,
                    seen
                );
            }
        }
        // Password must appear on the wire but is redacted from logs by the
        // transport; here we just confirm it was actually sent.
        assert!(seen.iter().any(|l| l == &format!("GLLG {}", TEST_PASSWORD)));
    }

    #[tokio::test]
    async fn test_err_sentinel_maps_to_command_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ascol = connect_mock(log).await;

        let err = ascol.raw_command("QQQQ 1").await.unwrap_err();
        match err {
            AscolError::CommandRejected { command } => assert_eq!(command, "QQQQ"),
            other => panic!("expected CommandRejected, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_trrd_decodes_side() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ascol = connect_mock(log).await;

        let (ra, dec, side) = ascol.read_ra_dec().await.unwrap();
        assert_eq!(ra, "123456.7");
        assert_eq!(dec, "-102312.4");
        assert_eq!(side, "east");
    }

    #[tokio::test]
    async fn test_meteo_pair_decodes_validity() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ascol = connect_mock(log).await;

        let (twilight, validity) = ascol.twilight().await.unwrap();
        assert!((twilight - 1.23).abs() < 1e-9);
        assert_eq!(validity, "valid");

        let (precip, validity) = ascol.precipitation().await.unwrap();
        assert_eq!(precip, "no");
        assert_eq!(validity, "valid");
    }

    #[tokio::test]
    async fn test_invalid_wheel_position_rejected_before_send() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ascol = connect_mock(log.clone()).await;

        let err = ascol.fasu_set_position(FasuWheel::B, "7").await.unwrap_err();
        assert!(matches!(err, AscolError::InvalidInput { command: "WBSP", .. }));
        // Nothing reached the wire, not even a login.
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_state_code_is_fatal() {
        // One-shot server answering TERS with a code outside the table.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();
            if let Ok(Some(_)) = lines.next_line().await {
                write.write_all(b"99 0\n").await.unwrap();
            }
        });

        let endpoint = DeviceEndpoint::new(addr.ip().to_string(), addr.port(), EndpointMode::Simulated)
            .with_credentials("dk154", TEST_PASSWORD);
        let mut ascol = Ascol::connect(endpoint).await.unwrap();
        let err = ascol.telescope_state().await.unwrap_err();
        assert!(matches!(
            err,
            AscolError::Code(crate::codes::CodeError::UnknownCode { table: "TERS", .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_credentials_rejected() {
        let endpoint = DeviceEndpoint::new("127.0.0.1", 1, EndpointMode::Simulated);
        let err = Ascol::connect(endpoint).await.unwrap_err();
        assert!(matches!(err, AscolError::MissingCredentials(_)));
    }
}
