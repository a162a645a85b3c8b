//! Façade error rollup

use dk154_ccd3::Ccd3Error;
use dk154_core::WaitError;
use dk154_dfosc::DfoscError;
use dk154_lamps::LampError;
use dk154_tcs::{AscolError, CodeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObservatoryError {
    #[error(transparent)]
    Mount(#[from] AscolError),

    #[error(transparent)]
    Wheels(#[from] DfoscError),

    #[error(transparent)]
    Camera(#[from] Ccd3Error),

    #[error(transparent)]
    Lamps(#[from] LampError),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Code(#[from] CodeError),

    #[error("operation '{0}' cancelled")]
    Cancelled(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
