//! Event-info record

use smol_str::SmolStr;

use super::{EventCode, EventState};
use crate::error::{Error, ErrorKind, Result};
use crate::fixed::Fixed;

/// One normalized input event
///
/// `mouse_x`/`mouse_y` are meaningful only for absolute motion, `delta_x`/
/// `delta_y` only for relative motion while the mouse is captured. `text`
/// is set only for character-producing key presses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventInfo {
    pub code: EventCode,
    pub state: EventState,
    pub text: Option<SmolStr>,
    pub wheel_steps: u32,
    pub mouse_x: i16,
    pub mouse_y: i16,
    pub delta_x: Fixed,
    pub delta_y: Fixed,
}

impl EventInfo {
    /// The empty record (code none, state none, no text, no motion)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Key or button transition
    pub fn switch(code: EventCode, state: EventState) -> Self {
        Self {
            code,
            state,
            ..Self::default()
        }
    }

    pub fn wheel(code: EventCode, steps: u32) -> Self {
        Self {
            code,
            wheel_steps: steps,
            ..Self::default()
        }
    }

    pub fn motion_absolute(x: i16, y: i16) -> Self {
        Self {
            code: EventCode::MouseMotion,
            mouse_x: x,
            mouse_y: y,
            ..Self::default()
        }
    }

    pub fn motion_relative(dx: Fixed, dy: Fixed) -> Self {
        Self {
            code: EventCode::MouseMotion,
            delta_x: dx,
            delta_y: dy,
            ..Self::default()
        }
    }

    /// Text-only record (no key code), as produced by character messages
    pub fn text_only(text: SmolStr) -> Self {
        Self {
            text: Some(text),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: Option<SmolStr>) -> Self {
        self.text = text;
        self
    }

    /// Byte length of the UTF-8 text, 0 when absent
    pub fn text_len(&self) -> usize {
        self.text.as_ref().map_or(0, |t| t.len())
    }

    /// Reset to the empty record
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Check code/state consistency
    ///
    /// Stateless codes (wheel, motion, none) must carry `EventState::None`;
    /// keys and buttons must carry press or release. Wheel steps are only
    /// allowed on wheel codes.
    pub fn validate(&self) -> Result<()> {
        if self.code.index() >= EventCode::COUNT {
            return Err(Error::throw(ErrorKind::EventCodeInvalid));
        }

        let state_ok = if self.code.is_switch() {
            self.state != EventState::None
        } else {
            self.state == EventState::None
        };
        if !state_ok {
            return Err(Error::throw(ErrorKind::EventStateInvalid));
        }

        if self.wheel_steps != 0 && !self.code.is_wheel() {
            return Err(Error::throw(ErrorKind::EventCodeInvalid));
        }

        Ok(())
    }
}
