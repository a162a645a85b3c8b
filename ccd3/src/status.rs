//! CCD status word decoding
//!
//! The camera daemon reports one aggregate status integer per query. The
//! low bits carry the exposure cycle, the 0x00FF0000 band carries device
//! errors, and the 0x3F000000 band carries blocking-operation flags.

use std::fmt;

pub const CAMERA_READY: i64 = 0x0000_0000;
pub const CAMERA_EXPOSING: i64 = 0x0000_0001;
pub const CAMERA_READING: i64 = 0x0000_0002;
pub const CAMERA_HAS_IMAGE: i64 = 0x0000_0008;

/// Mask over the device-error band.
pub const DEVICE_ERROR_MASK: i64 = 0x00FF_0000;
/// Status produced by a kill command.
pub const DEVICE_ERROR_KILL: i64 = 0x0001_0000;
/// Unspecified hardware error.
pub const DEVICE_ERROR_HW: i64 = 0x0002_0000;
pub const DEVICE_NOT_READY: i64 = 0x0004_0000;

pub const DEVICE_STARTUP: i64 = 0x0000_4000;
pub const DEVICE_SHUTDOWN: i64 = 0x0000_8000;

/// Blocking-operation band.
pub const BOP_MASK: i64 = 0x3F00_0000;
pub const BOP_EXPOSURE: i64 = 0x0100_0000;
pub const BOP_READOUT: i64 = 0x0200_0000;
pub const BOP_TEL_MOVE: i64 = 0x0400_0000;
pub const BOP_WILL_EXPOSE: i64 = 0x0800_0000;
pub const BOP_TRIG_EXPOSE: i64 = 0x1000_0000;

/// Exposing with the shutter open, as reported mid-exposure.
pub const CAMERA_EXPOSING_SHUTTER_OPEN: i64 = 0x0400_0001;

/// Decoded view over the raw CCD status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcdState(pub i64);

impl CcdState {
    pub fn raw(&self) -> i64 {
        self.0
    }

    pub fn is_ready(&self) -> bool {
        self.0 == CAMERA_READY
    }

    pub fn is_exposing(&self) -> bool {
        self.0 & CAMERA_EXPOSING != 0
    }

    pub fn is_reading(&self) -> bool {
        self.0 & CAMERA_READING != 0
    }

    pub fn has_image(&self) -> bool {
        self.0 & CAMERA_HAS_IMAGE != 0
    }

    pub fn error_bits(&self) -> i64 {
        self.0 & DEVICE_ERROR_MASK
    }

    pub fn is_killed(&self) -> bool {
        self.0 & DEVICE_ERROR_KILL != 0
    }

    pub fn has_error(&self) -> bool {
        self.error_bits() != 0
    }
}

impl fmt::Display for CcdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ready() {
            return write!(f, "ready (0)");
        }
        let mut flags = Vec::new();
        if self.is_exposing() {
            flags.push("exposing");
        }
        if self.is_reading() {
            flags.push("reading");
        }
        if self.has_image() {
            flags.push("has-image");
        }
        if self.is_killed() {
            flags.push("killed");
        }
        if self.0 & DEVICE_ERROR_HW != 0 {
            flags.push("hw-error");
        }
        if self.0 & DEVICE_NOT_READY != 0 {
            flags.push("not-ready");
        }
        if self.0 & BOP_TEL_MOVE != 0 {
            flags.push("blocks-tel-move");
        }
        if flags.is_empty() {
            flags.push("other");
        }
        write!(f, "{} ({})", flags.join("+"), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_state() {
        let state = CcdState(CAMERA_READY);
        assert!(state.is_ready());
        assert!(!state.is_exposing());
        assert!(!state.has_error());
        assert_eq!(state.to_string(), "ready (0)");
    }

    #[test]
    fn test_exposing_shutter_open_word() {
        // 67108865: exposing plus the telescope-move block bit.
        let state = CcdState(CAMERA_EXPOSING_SHUTTER_OPEN);
        assert_eq!(state.raw(), 67_108_865);
        assert!(state.is_exposing());
        assert!(!state.is_reading());
        assert!(!state.has_error());
        let rendered = state.to_string();
        assert!(rendered.contains("exposing"));
        assert!(rendered.contains("blocks-tel-move"));
    }

    #[test]
    fn test_kill_bit_decodes_as_error() {
        let state = CcdState(DEVICE_ERROR_KILL);
        assert!(state.is_killed());
        assert!(state.has_error());
        assert_eq!(state.error_bits(), DEVICE_ERROR_KILL);
    }

    #[test]
    fn test_reading_and_image_bits() {
        let state = CcdState(CAMERA_READING | CAMERA_HAS_IMAGE);
        assert!(state.is_reading());
        assert!(state.has_image());
        assert!(!state.is_exposing());
    }
}
