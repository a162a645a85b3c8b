//! Calibration lamp control.
//!
//! The arc/flat lamps hang off a managed power strip addressed over SNMP:
//! one integer command code per outlet, written to the outlet-control OID
//! plus the outlet index. The wavelength calibration lamps live on outlets
//! 5 and 6 by default.

use std::net::SocketAddr;

use csnmp::{ObjectIdentifier, ObjectValue, Snmp2cClient};
use dk154_core::DeviceEndpoint;
use thiserror::Error;
use tracing::{debug, info};

/// PDU outlet-control OID base; the outlet index is appended.
pub const OUTLET_CONTROL_OID: &str = "1.3.6.1.4.1.3808.1.1.3.3.3.1.1.4";

/// Outlets present on the strip.
pub const AVAILABLE_OUTLETS: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

/// Outlets feeding the wavelength calibration lamps.
pub const DEFAULT_LAMP_OUTLETS: [u8; 2] = [5, 6];

#[derive(Debug, Error)]
pub enum LampError {
    #[error("outlet {0} is not one of the available outlets 1-8")]
    UnknownOutlet(u8),

    /// The PDU reported a command code outside the documented set.
    #[error("unknown outlet command code {0} from PDU")]
    UnknownCommandCode(i32),

    #[error("PDU {addr} returned a non-integer value for outlet {outlet}")]
    UnexpectedValue { addr: String, outlet: u8 },

    #[error("SNMP request to {addr} failed: {message}")]
    Snmp { addr: String, message: String },

    #[error("'{0}' is not a usable PDU address")]
    Address(String),
}

/// Outlet command codes of the PDU, decoded bidirectionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutletCommand {
    ImmediateOn,
    ImmediateOff,
    ImmediateReboot,
    DelayedOn,
    DelayedOff,
    DelayedReboot,
    CancelPendingCommand,
    OutletIdentify,
}

impl OutletCommand {
    pub fn code(self) -> i32 {
        match self {
            OutletCommand::ImmediateOn => 1,
            OutletCommand::ImmediateOff => 2,
            OutletCommand::ImmediateReboot => 3,
            OutletCommand::DelayedOn => 4,
            OutletCommand::DelayedOff => 5,
            OutletCommand::DelayedReboot => 6,
            OutletCommand::CancelPendingCommand => 7,
            OutletCommand::OutletIdentify => 8,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, LampError> {
        match code {
            1 => Ok(OutletCommand::ImmediateOn),
            2 => Ok(OutletCommand::ImmediateOff),
            3 => Ok(OutletCommand::ImmediateReboot),
            4 => Ok(OutletCommand::DelayedOn),
            5 => Ok(OutletCommand::DelayedOff),
            6 => Ok(OutletCommand::DelayedReboot),
            7 => Ok(OutletCommand::CancelPendingCommand),
            8 => Ok(OutletCommand::OutletIdentify),
            other => Err(LampError::UnknownCommandCode(other)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutletCommand::ImmediateOn => "immediateOn",
            OutletCommand::ImmediateOff => "immediateOff",
            OutletCommand::ImmediateReboot => "immediateReboot",
            OutletCommand::DelayedOn => "delayedOn",
            OutletCommand::DelayedOff => "delayedOff",
            OutletCommand::DelayedReboot => "delayedReboot",
            OutletCommand::CancelPendingCommand => "cancelPendingCommand",
            OutletCommand::OutletIdentify => "outletIdentify",
        }
    }
}

impl std::fmt::Display for OutletCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client for the calibration-lamp power strip.
pub struct WaveLamps {
    endpoint: DeviceEndpoint,
    community: String,
    outlets: Vec<u8>,
}

impl WaveLamps {
    pub fn new(endpoint: DeviceEndpoint) -> Self {
        Self {
            endpoint,
            community: "private".to_string(),
            outlets: DEFAULT_LAMP_OUTLETS.to_vec(),
        }
    }

    /// Use a different outlet set than the default lamp pair.
    pub fn with_outlets(mut self, outlets: impl Into<Vec<u8>>) -> Self {
        self.outlets = outlets.into();
        self
    }

    pub fn outlets(&self) -> &[u8] {
        &self.outlets
    }

    fn target(&self) -> Result<SocketAddr, LampError> {
        self.endpoint
            .addr()
            .parse()
            .map_err(|_| LampError::Address(self.endpoint.addr()))
    }

    async fn client(&self) -> Result<Snmp2cClient, LampError> {
        let addr = self.target()?;
        Snmp2cClient::new(addr, self.community.clone().into_bytes(), None, None)
            .await
            .map_err(|err| LampError::Snmp {
                addr: self.endpoint.addr(),
                message: err.to_string(),
            })
    }

    fn outlet_oid(&self, outlet: u8) -> Result<ObjectIdentifier, LampError> {
        if !AVAILABLE_OUTLETS.contains(&outlet) {
            return Err(LampError::UnknownOutlet(outlet));
        }
        format!("{}.{}", OUTLET_CONTROL_OID, outlet)
            .parse()
            .map_err(|_| LampError::Address(format!("{}.{}", OUTLET_CONTROL_OID, outlet)))
    }

    /// Write one command code to one outlet.
    pub async fn set_outlet(&self, outlet: u8, command: OutletCommand) -> Result<(), LampError> {
        let oid = self.outlet_oid(outlet)?;
        info!(outlet, command = %command, "switching PDU outlet");
        let client = self.client().await?;
        client
            .set(oid, ObjectValue::Integer(command.code()))
            .await
            .map_err(|err| LampError::Snmp {
                addr: self.endpoint.addr(),
                message: err.to_string(),
            })?;
        Ok(())
    }

    /// Read back the last command code latched on an outlet.
    pub async fn outlet_command_state(&self, outlet: u8) -> Result<OutletCommand, LampError> {
        let oid = self.outlet_oid(outlet)?;
        let client = self.client().await?;
        let value = client.get(oid).await.map_err(|err| LampError::Snmp {
            addr: self.endpoint.addr(),
            message: err.to_string(),
        })?;
        match value {
            ObjectValue::Integer(code) => {
                let command = OutletCommand::from_code(code)?;
                debug!(outlet, command = %command, "outlet command state");
                Ok(command)
            }
            _ => Err(LampError::UnexpectedValue {
                addr: self.endpoint.addr(),
                outlet,
            }),
        }
    }

    /// Switch the configured lamp outlets on.
    pub async fn all_lamps_on(&self) -> Result<(), LampError> {
        for &outlet in &self.outlets {
            self.set_outlet(outlet, OutletCommand::ImmediateOn).await?;
        }
        Ok(())
    }

    /// Switch the configured lamp outlets off.
    pub async fn all_lamps_off(&self) -> Result<(), LampError> {
        for &outlet in &self.outlets {
            self.set_outlet(outlet, OutletCommand::ImmediateOff).await?;
        }
        Ok(())
    }

    /// Switch every outlet on the strip off.
    pub async fn all_outlets_off(&self) -> Result<(), LampError> {
        for &outlet in &AVAILABLE_OUTLETS {
            self.set_outlet(outlet, OutletCommand::ImmediateOff).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dk154_core::EndpointMode;

    #[test]
    fn test_command_codes_round_trip() {
        for code in 1..=8 {
            let command = OutletCommand::from_code(code).unwrap();
            assert_eq!(command.code(), code);
        }
    }

    #[test]
    fn test_unknown_command_code_is_loud() {
        assert!(matches!(
            OutletCommand::from_code(9),
            Err(LampError::UnknownCommandCode(9))
        ));
        assert!(matches!(
            OutletCommand::from_code(0),
            Err(LampError::UnknownCommandCode(0))
        ));
    }

    #[tokio::test]
    async fn test_invalid_outlet_rejected_before_any_request() {
        let endpoint = DeviceEndpoint::new("192.168.132.59", 161, EndpointMode::Production);
        let lamps = WaveLamps::new(endpoint);
        let err = lamps
            .set_outlet(9, OutletCommand::ImmediateOn)
            .await
            .unwrap_err();
        assert!(matches!(err, LampError::UnknownOutlet(9)));
    }

    #[test]
    fn test_default_outlets_are_the_lamp_pair() {
        let endpoint = DeviceEndpoint::new("192.168.132.59", 161, EndpointMode::Production);
        let lamps = WaveLamps::new(endpoint);
        assert_eq!(lamps.outlets(), &[5, 6]);
    }
}
