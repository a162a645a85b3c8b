//! DFOSC spectrograph wheel client.
//!
//! Three wheels (grism, aperture/slit, filter) share one telnet link
//! through a MOXA serial bridge. Each wheel answers to a one-letter command
//! prefix; the command grammar is otherwise identical, so a single client
//! parameterized by [`WheelKind`] drives all three.
//!
//! Moving a wheel that is not ready is undefined hardware behavior, so
//! every move is a two-phase operation: confirm ready, move, confirm ready
//! again.

mod error;
mod setup;
mod status;
mod wheel;

pub use error::DfoscError;
pub use setup::{DfoscSetup, SetupError, WheelPositionTable, WHEEL_CIRCUMFERENCE};
pub use status::{DfoscStatus, WheelStatus};
pub use wheel::{Dfosc, WheelKind};
