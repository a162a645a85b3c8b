//! DFOSC error types

use std::time::Duration;

use dk154_core::{TransportError, WaitError};
use thiserror::Error;

use crate::setup::SetupError;

#[derive(Debug, Error)]
pub enum DfoscError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{command} rejected by wheel controller (ERR)")]
    CommandRejected { command: String },

    /// The wheel never reported ready inside the wait budget. Raised before
    /// a move is attempted as well as after one: a goto is never issued to
    /// a not-ready wheel.
    #[error("{wheel} wheel not ready after {elapsed:?}")]
    WheelNotReady {
        wheel: &'static str,
        elapsed: Duration,
    },

    #[error("{command}: unexpected reply token '{token}'")]
    UnexpectedReply { command: String, token: String },

    #[error("{command}: empty reply")]
    EmptyReply { command: String },

    #[error("{command}: malformed position '{token}': {reason}")]
    MalformedPosition {
        command: String,
        token: String,
        reason: String,
    },

    /// Caller input rejected before any command was sent.
    #[error("step {step} out of range: wheel circumference is {limit}")]
    StepOutOfRange { step: u32, limit: u32 },

    #[error("preset {preset} out of range 0-7")]
    PresetOutOfRange { preset: u8 },

    #[error("unknown {wheel} position '{name}' (known: {known:?})")]
    UnknownPosition {
        wheel: String,
        name: String,
        known: Vec<String>,
    },

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Setup(#[from] SetupError),
}
