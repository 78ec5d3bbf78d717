//! macOS virtual keycodes (kVK_* from Carbon's Events.h)

use super::{sparse_table, KeycodeTable};
use crate::event::EventCode::{self, *};

pub const KVK_RIGHT_COMMAND: u8 = 0x36;
pub const KVK_COMMAND: u8 = 0x37;
pub const KVK_SHIFT: u8 = 0x38;
pub const KVK_CAPS_LOCK: u8 = 0x39;
pub const KVK_OPTION: u8 = 0x3A;
pub const KVK_CONTROL: u8 = 0x3B;
pub const KVK_RIGHT_SHIFT: u8 = 0x3C;
pub const KVK_RIGHT_OPTION: u8 = 0x3D;
pub const KVK_RIGHT_CONTROL: u8 = 0x3E;

pub const TABLE: KeycodeTable = sparse_table(&[
    (0x00, A),
    (0x01, S),
    (0x02, D),
    (0x03, F),
    (0x04, H),
    (0x05, G),
    (0x06, Z),
    (0x07, X),
    (0x08, C),
    (0x09, V),
    (0x0B, B),
    (0x0C, Q),
    (0x0D, W),
    (0x0E, E),
    (0x0F, R),
    (0x10, Y),
    (0x11, T),
    (0x12, Key1),
    (0x13, Key2),
    (0x14, Key3),
    (0x15, Key4),
    (0x16, Key6),
    (0x17, Key5),
    (0x18, Equals),
    (0x19, Key9),
    (0x1A, Key7),
    (0x1B, HyphenMinus),
    (0x1C, Key8),
    (0x1D, Key0),
    (0x1E, BracketRight),
    (0x1F, O),
    (0x20, U),
    (0x21, BracketLeft),
    (0x22, I),
    (0x23, P),
    (0x24, Enter),
    (0x25, L),
    (0x26, J),
    (0x27, Apostrophe),
    (0x28, K),
    (0x29, Semicolon),
    (0x2A, Antislash),
    (0x2B, Comma),
    (0x2C, Slash),
    (0x2D, N),
    (0x2E, M),
    (0x2F, Period),
    (0x30, Tab),
    (0x31, Space),
    (0x32, Grave),
    (0x33, Backspace),
    (0x35, Escape),
    (KVK_RIGHT_COMMAND, ModRight),
    (KVK_COMMAND, ModLeft),
    (KVK_SHIFT, ShiftLeft),
    (KVK_CAPS_LOCK, CapsLock),
    (KVK_OPTION, AltLeft),
    (KVK_CONTROL, CtrlLeft),
    (KVK_RIGHT_SHIFT, ShiftRight),
    (KVK_RIGHT_OPTION, AltRight),
    (KVK_RIGHT_CONTROL, CtrlRight),
    (0x41, NumDelete),
    (0x43, NumAsterisk),
    (0x45, NumPlus),
    (0x47, NumLock),
    (0x4B, NumSlash),
    (0x4C, NumEnter),
    (0x4E, NumHyphenMinus),
    (0x52, Num0),
    (0x53, Num1),
    (0x54, Num2),
    (0x55, Num3),
    (0x56, Num4),
    (0x57, Num5),
    (0x58, Num6),
    (0x59, Num7),
    (0x5B, Num8),
    (0x5C, Num9),
    (0x60, F5),
    (0x61, F6),
    (0x62, F7),
    (0x63, F3),
    (0x64, F8),
    (0x65, F9),
    (0x67, F11),
    // F13-F15 sit where PC keyboards have print screen, scroll lock, pause
    (0x69, PrintScreen),
    (0x6B, ScrollLock),
    (0x71, Pause),
    (0x6D, F10),
    (0x6E, Menu),
    (0x6F, F12),
    (0x72, Insert),
    (0x73, Home),
    (0x74, PageUp),
    (0x75, Delete),
    (0x76, F4),
    (0x77, End),
    (0x78, F2),
    (0x79, PageDown),
    (0x7A, F1),
    (0x7B, Left),
    (0x7C, Right),
    (0x7D, Down),
    (0x7E, Up),
]);

/// `buttonNumber` of an other-mouse event
pub fn translate_other_button(number: i64) -> EventCode {
    match number {
        2 => MouseClickMiddle,
        _ => EventCode::None,
    }
}
