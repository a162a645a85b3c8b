//! Observatory configuration
//!
//! Explicit, constructed configuration passed into the façade - no
//! import-time globals. Device endpoints are compile-time constants with a
//! parallel simulated set binding localhost, so tests and mock servers
//! never touch production hardware.

use std::time::Duration;

use dk154_core::{DeviceEndpoint, EndpointMode, WaitSpec};
use dk154_dfosc::DfoscSetup;

/// TCS (ASCOL) production endpoint.
const TCS_HOST: &str = "192.168.132.11";
const TCS_PORT: u16 = 2003;
const TCS_USER: &str = "dk154";
const TCS_PASSWORD: &str = "1178";

/// DFOSC MOXA bridge production endpoint.
const DFOSC_HOST: &str = "192.168.132.58";
const DFOSC_PORT: u16 = 4001;

/// CCD3 camera daemon production endpoint.
const CCD3_HOST: &str = "192.168.132.52";
const CCD3_PORT: u16 = 8889;
const CCD3_USER: &str = "dk154";
const CCD3_PASSWORD: &str = "dk154";

/// Lamp PDU production endpoint.
const PDU_HOST: &str = "192.168.132.59";
const PDU_PORT: u16 = 161;

/// Simulated endpoints bind the mock servers' localhost ports.
const LOCAL_HOST: &str = "127.0.0.1";
const LOCAL_TCS_PORT: u16 = 8883;
const LOCAL_DFOSC_PORT: u16 = 8885;
const LOCAL_CCD3_PORT: u16 = 8884;
const LOCAL_PDU_PORT: u16 = 8886;

/// Everything the façade needs to reach and pace the hardware.
#[derive(Debug, Clone)]
pub struct ObservatoryConfig {
    pub tcs: DeviceEndpoint,
    pub dfosc: DeviceEndpoint,
    pub ccd3: DeviceEndpoint,
    pub pdu: DeviceEndpoint,

    /// Wheel position tables, loaded once at startup.
    pub dfosc_setup: DfoscSetup,

    /// Terminal states accepted as "FASU wheel arrived". Firmware
    /// revisions disagree on whether a settled wheel reports "locked" or
    /// "stopped"; this is configuration, not a hard-coded string.
    pub fasu_accepted_states: Vec<String>,

    /// Cadence for FASU wheel lock confirmation.
    pub wheel_wait: WaitSpec,
    /// Cadence for slew-to-tracking confirmation.
    pub slew_wait: WaitSpec,
    /// Cadence for dome and shutter confirmation.
    pub dome_wait: WaitSpec,

    /// Pause between a go command and the first state poll; the TCS takes
    /// a beat before the state word leaves its previous value.
    pub post_go_settle: Duration,

    /// Read-out allowance added to every exposure wait.
    pub read_time: f64,
}

impl ObservatoryConfig {
    fn waits() -> (WaitSpec, WaitSpec, WaitSpec) {
        // All constants satisfy the WaitSpec invariants.
        let wheel = WaitSpec::new(Duration::from_secs(5), Duration::from_secs(120));
        let slew = WaitSpec::new(Duration::from_secs(2), Duration::from_secs(300));
        let dome = WaitSpec::new(Duration::from_secs(2), Duration::from_secs(300));
        match (wheel, slew, dome) {
            (Ok(w), Ok(s), Ok(d)) => (w, s, d),
            _ => unreachable!("default wait constants satisfy the WaitSpec bounds"),
        }
    }

    /// Endpoints of the real observatory hardware.
    pub fn production(dfosc_setup: DfoscSetup) -> Self {
        let (wheel_wait, slew_wait, dome_wait) = Self::waits();
        Self {
            tcs: DeviceEndpoint::new(TCS_HOST, TCS_PORT, EndpointMode::Production)
                .with_credentials(TCS_USER, TCS_PASSWORD),
            dfosc: DeviceEndpoint::new(DFOSC_HOST, DFOSC_PORT, EndpointMode::Production),
            ccd3: DeviceEndpoint::new(CCD3_HOST, CCD3_PORT, EndpointMode::Production)
                .with_credentials(CCD3_USER, CCD3_PASSWORD),
            pdu: DeviceEndpoint::new(PDU_HOST, PDU_PORT, EndpointMode::Production),
            dfosc_setup,
            fasu_accepted_states: vec!["locked".to_string()],
            wheel_wait,
            slew_wait,
            dome_wait,
            post_go_settle: Duration::from_secs(1),
            read_time: dk154_ccd3::DEFAULT_READ_TIME,
        }
    }

    /// Localhost endpoints for the mock servers.
    pub fn simulated(dfosc_setup: DfoscSetup) -> Self {
        let (wheel_wait, slew_wait, dome_wait) = Self::waits();
        Self {
            tcs: DeviceEndpoint::new(LOCAL_HOST, LOCAL_TCS_PORT, EndpointMode::Simulated)
                .with_credentials(TCS_USER, TCS_PASSWORD),
            dfosc: DeviceEndpoint::new(LOCAL_HOST, LOCAL_DFOSC_PORT, EndpointMode::Simulated),
            ccd3: DeviceEndpoint::new(LOCAL_HOST, LOCAL_CCD3_PORT, EndpointMode::Simulated)
                .with_credentials(CCD3_USER, CCD3_PASSWORD),
            pdu: DeviceEndpoint::new(LOCAL_HOST, LOCAL_PDU_PORT, EndpointMode::Simulated),
            dfosc_setup,
            fasu_accepted_states: vec!["locked".to_string()],
            wheel_wait,
            slew_wait,
            dome_wait,
            post_go_settle: Duration::from_millis(10),
            read_time: dk154_ccd3::DEFAULT_READ_TIME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> DfoscSetup {
        DfoscSetup::from_yaml_str(
            "grism:\n  empty: 0\naperture:\n  empty: 0\nfilter:\n  empty: 0\n",
            "inline",
        )
        .unwrap()
    }

    #[test]
    fn test_production_and_simulated_differ_only_in_targets() {
        let prod = ObservatoryConfig::production(setup());
        let sim = ObservatoryConfig::simulated(setup());
        assert!(!prod.tcs.is_simulated());
        assert!(sim.tcs.is_simulated());
        assert_eq!(prod.fasu_accepted_states, sim.fasu_accepted_states);
        assert_eq!(sim.tcs.host(), LOCAL_HOST);
    }

    #[test]
    fn test_default_fasu_terminal_state_is_locked() {
        let config = ObservatoryConfig::production(setup());
        assert_eq!(config.fasu_accepted_states, vec!["locked".to_string()]);
    }
}
