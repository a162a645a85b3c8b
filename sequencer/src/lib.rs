//! Observatory orchestration façade.
//!
//! Composes the four device clients (TCS, DFOSC wheels, CCD3 camera,
//! calibration lamps) into the multi-step, ordered operations observing
//! scripts consume: "move wheel and confirm lock", "slew and confirm
//! tracking", "take N exposures with shared parameters". The façade owns
//! the cross-device ordering invariants - lamps out before science frames,
//! shutter closed before darks, both FASU wheels to empty before a
//! comparison-lamp exposure. Those orderings are safety and data-integrity
//! rules, not incidental script structure.
//!
//! Every operation scopes its own connection: open, use, closed on every
//! exit path when the client drops. Connections are never shared across
//! concurrent callers; the mount and wheel protocols are stateful
//! single-session links.

mod config;
mod error;
mod logging;
mod observatory;
mod plan;

pub use config::ObservatoryConfig;
pub use error::ObservatoryError;
pub use logging::init_logging;
pub use observatory::Observatory;
pub use plan::{ExposurePlan, FrameSink};

// Re-exported so script callers need only this crate.
pub use dk154_ccd3::ExposureParameters;
pub use dk154_core::{CancelToken, WaitSpec};
pub use dk154_dfosc::WheelKind;
pub use dk154_tcs::{FasuWheel, PierSide};
