//! XKB keycodes (X11 core protocol and Wayland after the evdev offset)

use super::{sparse_table, KeycodeTable};
use crate::event::EventCode::{self, *};

/// X11 wheel buttons report one tick per button event
pub const WHEEL_STEPS: u32 = 1;

pub const TABLE: KeycodeTable = sparse_table(&[
    (9, Escape),
    (10, Key1),
    (11, Key2),
    (12, Key3),
    (13, Key4),
    (14, Key5),
    (15, Key6),
    (16, Key7),
    (17, Key8),
    (18, Key9),
    (19, Key0),
    (20, HyphenMinus),
    (21, Equals),
    (22, Backspace),
    (23, Tab),
    (24, Q),
    (25, W),
    (26, E),
    (27, R),
    (28, T),
    (29, Y),
    (30, U),
    (31, I),
    (32, O),
    (33, P),
    (34, BracketLeft),
    (35, BracketRight),
    (36, Enter),
    (37, CtrlLeft),
    (38, A),
    (39, S),
    (40, D),
    (41, F),
    (42, G),
    (43, H),
    (44, J),
    (45, K),
    (46, L),
    (47, Semicolon),
    (48, Apostrophe),
    (49, Grave),
    (50, ShiftLeft),
    (51, Antislash),
    (52, Z),
    (53, X),
    (54, C),
    (55, V),
    (56, B),
    (57, N),
    (58, M),
    (59, Comma),
    (60, Period),
    (61, Slash),
    (62, ShiftRight),
    (63, NumAsterisk),
    (64, AltLeft),
    (65, Space),
    (66, CapsLock),
    (67, F1),
    (68, F2),
    (69, F3),
    (70, F4),
    (71, F5),
    (72, F6),
    (73, F7),
    (74, F8),
    (75, F9),
    (76, F10),
    (77, NumLock),
    (78, ScrollLock),
    (79, Num7),
    (80, Num8),
    (81, Num9),
    (82, NumHyphenMinus),
    (83, Num4),
    (84, Num5),
    (85, Num6),
    (86, NumPlus),
    (87, Num1),
    (88, Num2),
    (89, Num3),
    (90, Num0),
    (91, NumDelete),
    (95, F11),
    (96, F12),
    (104, NumEnter),
    (105, CtrlRight),
    (106, NumSlash),
    (107, PrintScreen),
    (108, AltRight),
    (110, Home),
    (111, Up),
    (112, PageUp),
    (113, Left),
    (114, Right),
    (115, End),
    (116, Down),
    (117, PageDown),
    (118, Insert),
    (119, Delete),
    (127, Pause),
    (133, ModLeft),
    (134, ModRight),
    (135, Menu),
]);

/// X11 core pointer button
///
/// Buttons 4 and 5 are the vertical wheel.
pub fn translate_button(button: u8) -> EventCode {
    match button {
        1 => MouseClickLeft,
        2 => MouseClickMiddle,
        3 => MouseClickRight,
        4 => MouseWheelUp,
        5 => MouseWheelDown,
        _ => EventCode::None,
    }
}
