//! Keycode translation tables
//!
//! One dense table per native scancode space, built at compile time from a
//! sparse list. Every `u8` scancode indexes the table, so lookup is total:
//! unmapped slots hold [`EventCode::None`].
//!
//! Mouse buttons are not contiguous in any native space and use small
//! `match` functions in the per-platform modules instead.

pub mod appkit;
pub mod evdev;
pub mod win32;
pub mod xkb;

use crate::event::EventCode;

/// Dense scancode → event code table
pub type KeycodeTable = [EventCode; 256];

/// Build a dense table from `(scancode, code)` pairs
///
/// Later pairs win when a scancode is listed twice.
pub const fn sparse_table(entries: &[(u8, EventCode)]) -> KeycodeTable {
    let mut table = [EventCode::None; 256];
    let mut i = 0;
    while i < entries.len() {
        let (scancode, code) = entries[i];
        table[scancode as usize] = code;
        i += 1;
    }
    table
}

/// Look up a scancode
#[inline]
pub fn translate(table: &KeycodeTable, scancode: u8) -> EventCode {
    table[scancode as usize]
}

/// Look up a wider native code, treating anything above 255 as unmapped
#[inline]
pub fn translate_wide(table: &KeycodeTable, code: u32) -> EventCode {
    u8::try_from(code).map_or(EventCode::None, |scancode| translate(table, scancode))
}
