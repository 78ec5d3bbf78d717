//! Unified event model
//!
//! Every backend translates its native input into an [`EventInfo`] built
//! from the codes and states declared here. Codes name physical keys after
//! their idle-state QWERTY/ANSI label, so the same key yields the same code
//! on every platform.

mod info;

pub use info::EventInfo;

use crate::names::named_enum;

named_enum! {
    /// Abstract input symbol
    ///
    /// `None` (zero) means "no event" or "unmapped scancode".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub enum EventCode: u8 {
        #[default]
        None => "none",

        MouseClickLeft => "mouse click left",
        MouseClickRight => "mouse click right",
        MouseClickMiddle => "mouse click middle",
        MouseWheelUp => "mouse wheel up",
        MouseWheelDown => "mouse wheel down",
        MouseMotion => "mouse motion",

        Escape => "escape",
        F1 => "f1",
        F2 => "f2",
        F3 => "f3",
        F4 => "f4",
        F5 => "f5",
        F6 => "f6",
        F7 => "f7",
        F8 => "f8",
        F9 => "f9",
        F10 => "f10",
        F11 => "f11",
        F12 => "f12",

        Grave => "grave",
        Key1 => "1",
        Key2 => "2",
        Key3 => "3",
        Key4 => "4",
        Key5 => "5",
        Key6 => "6",
        Key7 => "7",
        Key8 => "8",
        Key9 => "9",
        Key0 => "0",
        HyphenMinus => "hyphen-minus",
        Equals => "equals",
        Backspace => "backspace",

        Tab => "tab",
        Q => "q",
        W => "w",
        E => "e",
        R => "r",
        T => "t",
        Y => "y",
        U => "u",
        I => "i",
        O => "o",
        P => "p",
        BracketLeft => "bracket left",
        BracketRight => "bracket right",
        Antislash => "antislash",

        CapsLock => "caps lock",
        A => "a",
        S => "s",
        D => "d",
        F => "f",
        G => "g",
        H => "h",
        J => "j",
        K => "k",
        L => "l",
        Semicolon => "semicolon",
        Apostrophe => "apostrophe",
        Enter => "enter",

        ShiftLeft => "shift left",
        Z => "z",
        X => "x",
        C => "c",
        V => "v",
        B => "b",
        N => "n",
        M => "m",
        Comma => "comma",
        Period => "period",
        Slash => "slash",
        ShiftRight => "shift right",

        CtrlLeft => "ctrl left",
        ModLeft => "mod left",
        AltLeft => "alt left",
        Space => "space",
        AltRight => "alt right",
        ModRight => "mod right",
        Menu => "menu",
        CtrlRight => "ctrl right",

        PrintScreen => "print screen",
        ScrollLock => "scroll lock",
        Pause => "pause",

        Insert => "insert",
        Delete => "delete",
        Home => "home",
        End => "end",
        PageUp => "page up",
        PageDown => "page down",

        Up => "up",
        Down => "down",
        Left => "left",
        Right => "right",

        NumLock => "num lock",
        NumSlash => "num slash",
        NumAsterisk => "num asterisk",
        NumHyphenMinus => "num hyphen-minus",
        NumPlus => "num plus",
        NumEnter => "num enter",
        NumDelete => "num delete",
        Num0 => "num 0",
        Num1 => "num 1",
        Num2 => "num 2",
        Num3 => "num 3",
        Num4 => "num 4",
        Num5 => "num 5",
        Num6 => "num 6",
        Num7 => "num 7",
        Num8 => "num 8",
        Num9 => "num 9",
    }
}

impl EventCode {
    pub fn is_none(self) -> bool {
        self == EventCode::None
    }

    pub fn is_wheel(self) -> bool {
        matches!(self, EventCode::MouseWheelUp | EventCode::MouseWheelDown)
    }

    pub fn is_button(self) -> bool {
        matches!(
            self,
            EventCode::MouseClickLeft | EventCode::MouseClickRight | EventCode::MouseClickMiddle
        )
    }

    /// Wheel and motion codes carry no press/release state
    pub fn is_stateless(self) -> bool {
        self.is_wheel() || self == EventCode::MouseMotion
    }

    /// Keys and buttons: a press is always followed by a release
    pub fn is_switch(self) -> bool {
        !self.is_none() && !self.is_stateless()
    }
}

named_enum! {
    /// Transition phase of an event
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum EventState: u8 {
        #[default]
        None => "none",
        Press => "press",
        Release => "release",
    }
}

impl EventState {
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            EventState::Press
        } else {
            EventState::Release
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_zero() {
        assert_eq!(EventCode::None.index(), 0);
        assert_eq!(EventCode::default(), EventCode::None);
        assert_eq!(EventState::default(), EventState::None);
    }

    #[test]
    fn test_code_names() {
        assert_eq!(EventCode::A.name(), "a");
        assert_eq!(EventCode::MouseWheelUp.to_string(), "mouse wheel up");
        assert_eq!(EventCode::name_of(EventCode::COUNT), "invalid");
        assert_eq!(EventState::name_of(EventState::Release.index()), "release");
        assert_eq!(EventState::name_of(3), "invalid");
    }

    #[test]
    fn test_codes_are_totally_ordered() {
        for pair in EventCode::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(EventCode::from_index(EventCode::COUNT - 1), Some(EventCode::Num9));
    }

    #[test]
    fn test_code_classes() {
        assert!(EventCode::MouseWheelDown.is_stateless());
        assert!(EventCode::MouseMotion.is_stateless());
        assert!(EventCode::MouseClickLeft.is_button());
        assert!(EventCode::Enter.is_switch());
        assert!(!EventCode::None.is_switch());
        assert!(!EventCode::MouseMotion.is_switch());
    }
}
