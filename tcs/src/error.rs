//! ASCOL error types

use dk154_core::TransportError;
use thiserror::Error;

use crate::codes::CodeError;

#[derive(Debug, Error)]
pub enum AscolError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The TCS answered with the `ERR` sentinel. Most often the command was
    /// privileged and the login was missing or rejected.
    #[error("{command} rejected by TCS (ERR) - is it a set command issued without GLLG?")]
    CommandRejected { command: String },

    #[error("GLLG rejected: wrong TCS password")]
    LoginRejected,

    #[error(transparent)]
    Code(#[from] CodeError),

    #[error("{command}: expected {expected} token(s), got {got:?}")]
    UnexpectedResponse {
        command: &'static str,
        expected: usize,
        got: Vec<String>,
    },

    #[error("{command}: malformed token '{token}': {reason}")]
    Malformed {
        command: &'static str,
        token: String,
        reason: String,
    },

    /// Caller input rejected before anything was sent to the hardware.
    #[error("invalid input for {command}: {reason}")]
    InvalidInput {
        command: &'static str,
        reason: String,
    },

    #[error("no TCS credentials configured for {0}")]
    MissingCredentials(String),
}
