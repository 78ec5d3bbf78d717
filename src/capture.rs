//! Mouse capture state

use std::fmt;

/// Whether the pointer is grabbed
///
/// While grabbed the cursor is hidden and constrained, and motion is reported
/// as relative Q31.32 deltas instead of absolute positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Released,
    Grabbed,
}

impl CaptureState {
    pub fn is_grabbed(self) -> bool {
        self == CaptureState::Grabbed
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureState::Released => f.write_str("released"),
            CaptureState::Grabbed => f.write_str("grabbed"),
        }
    }
}
