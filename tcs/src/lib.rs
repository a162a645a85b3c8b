//! ASCOL client for the DK154 telescope control system.
//!
//! The TCS speaks a newline-terminated, space-separated ASCII protocol over
//! a raw TCP socket. Commands are four-letter opcodes; privileged writes
//! require a fresh login (`GLLG`) immediately before each one, because the
//! hardware session is assumed to expire at any time. Replies are decoded
//! through static code tables - an unrecognised code is a hard error, never
//! passed through raw.

pub mod codes;

mod client;
mod error;
mod status;

pub use client::{Ascol, FasuWheel, PierSide, ERR_SENTINEL};
pub use codes::{CodeError, CodeTable};
pub use error::AscolError;
pub use status::{MeteoReading, MeteoStatus, TelescopeStatus};
