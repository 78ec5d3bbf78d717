//! evdev codes
//!
//! Wayland delivers raw Linux input event codes from
//! <linux/input-event-codes.h>. Keys are shifted by [`XKB_OFFSET`] into the
//! XKB keycode space and then share the XKB table.

use super::{translate_wide, xkb};
use crate::event::EventCode;

/// evdev keycode + 8 = XKB keycode
pub const XKB_OFFSET: u32 = 8;

// ============================================================================
// Keys used by the layout fixtures
// ============================================================================

pub const KEY_ESC: u32 = 1;
pub const KEY_E: u32 = 18;
pub const KEY_A: u32 = 30;
pub const KEY_S: u32 = 31;
pub const KEY_APOSTROPHE: u32 = 40;
pub const KEY_LEFTSHIFT: u32 = 42;
pub const KEY_B: u32 = 48;

// ============================================================================
// Mouse Buttons
// ============================================================================

pub const BTN_LEFT: u32 = 0x110;
pub const BTN_RIGHT: u32 = 0x111;
pub const BTN_MIDDLE: u32 = 0x112;

/// evdev keycode → XKB keycode
#[inline]
pub const fn to_xkb(key: u32) -> u32 {
    key.saturating_add(XKB_OFFSET)
}

/// Translate an evdev key through the XKB table
#[inline]
pub fn translate_key(key: u32) -> EventCode {
    translate_wide(&xkb::TABLE, to_xkb(key))
}

pub fn translate_button(button: u32) -> EventCode {
    match button {
        BTN_LEFT => EventCode::MouseClickLeft,
        BTN_RIGHT => EventCode::MouseClickRight,
        BTN_MIDDLE => EventCode::MouseClickMiddle,
        _ => EventCode::None,
    }
}
