//! Win32 virtual-key codes

use super::{sparse_table, KeycodeTable};
use crate::event::EventCode::{self, *};

pub const VK_RETURN: u8 = 0x0D;
pub const VK_SHIFT: u8 = 0x10;
pub const VK_CONTROL: u8 = 0x11;
pub const VK_MENU: u8 = 0x12;
pub const VK_F10: u8 = 0x79;

/// Scancode of the right shift key (shift is not flagged as extended)
pub const SCANCODE_RSHIFT: u8 = 0x36;

pub const TABLE: KeycodeTable = sparse_table(&[
    (0x08, Backspace),
    (0x09, Tab),
    (VK_RETURN, Enter),
    (VK_SHIFT, ShiftLeft),
    (VK_CONTROL, CtrlLeft),
    (VK_MENU, AltLeft),
    (0x13, Pause),
    (0x14, CapsLock),
    (0x1B, Escape),
    (0x20, Space),
    (0x21, PageUp),
    (0x22, PageDown),
    (0x23, End),
    (0x24, Home),
    (0x25, Left),
    (0x26, Up),
    (0x27, Right),
    (0x28, Down),
    (0x2C, PrintScreen),
    (0x2D, Insert),
    (0x2E, Delete),
    (0x30, Key0),
    (0x31, Key1),
    (0x32, Key2),
    (0x33, Key3),
    (0x34, Key4),
    (0x35, Key5),
    (0x36, Key6),
    (0x37, Key7),
    (0x38, Key8),
    (0x39, Key9),
    (0x41, A),
    (0x42, B),
    (0x43, C),
    (0x44, D),
    (0x45, E),
    (0x46, F),
    (0x47, G),
    (0x48, H),
    (0x49, I),
    (0x4A, J),
    (0x4B, K),
    (0x4C, L),
    (0x4D, M),
    (0x4E, N),
    (0x4F, O),
    (0x50, P),
    (0x51, Q),
    (0x52, R),
    (0x53, S),
    (0x54, T),
    (0x55, U),
    (0x56, V),
    (0x57, W),
    (0x58, X),
    (0x59, Y),
    (0x5A, Z),
    (0x5B, ModLeft),
    (0x5C, ModRight),
    (0x5D, Menu),
    (0x60, Num0),
    (0x61, Num1),
    (0x62, Num2),
    (0x63, Num3),
    (0x64, Num4),
    (0x65, Num5),
    (0x66, Num6),
    (0x67, Num7),
    (0x68, Num8),
    (0x69, Num9),
    (0x6A, NumAsterisk),
    (0x6B, NumPlus),
    (0x6D, NumHyphenMinus),
    (0x6E, NumDelete),
    (0x6F, NumSlash),
    (0x70, F1),
    (0x71, F2),
    (0x72, F3),
    (0x73, F4),
    (0x74, F5),
    (0x75, F6),
    (0x76, F7),
    (0x77, F8),
    (0x78, F9),
    (VK_F10, F10),
    (0x7A, F11),
    (0x7B, F12),
    (0x90, NumLock),
    (0x91, ScrollLock),
    (0xBA, Semicolon),
    (0xBB, Equals),
    (0xBC, Comma),
    (0xBD, HyphenMinus),
    (0xBE, Period),
    (0xBF, Slash),
    (0xC0, Grave),
    (0xDB, BracketLeft),
    (0xDC, Antislash),
    (0xDD, BracketRight),
    (0xDE, Apostrophe),
]);

/// Refine a generic virtual key into its left/right or keypad variant
///
/// `extended` is the KF_EXTENDED bit of the key message, `scancode` its
/// hardware scancode byte.
pub fn refine(vk: u8, extended: bool, scancode: u8) -> EventCode {
    match vk {
        VK_CONTROL if extended => CtrlRight,
        VK_MENU if extended => AltRight,
        VK_RETURN if extended => NumEnter,
        VK_SHIFT if scancode == SCANCODE_RSHIFT => ShiftRight,
        _ => TABLE[vk as usize],
    }
}
