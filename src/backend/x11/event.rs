//! X11 native events, decoded by the host from its xcb connection

/// XInput `FP3232`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fp3232 {
    pub integral: i32,
    pub frac: u32,
}

/// One event from the host's poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum X11Event {
    KeyPress { keycode: u8 },
    KeyRelease { keycode: u8 },
    ButtonPress { button: u8 },
    ButtonRelease { button: u8 },
    MotionNotify { event_x: i16, event_y: i16 },
    /// XInput raw motion; axis 0 and 1 when present in the valuator mask
    RawMotion { dx: Option<Fp3232>, dy: Option<Fp3232> },
    /// Event whose response type equals the XKB extension's first event
    Xkb(XkbEvent),
    Other { response_type: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XkbEvent {
    pub device_id: u8,
    pub kind: XkbEventKind,
}

/// `xkbType` of an XKB extension event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XkbEventKind {
    NewKeyboardNotify {
        changed: u16,
    },
    MapNotify,
    StateNotify {
        base_mods: u8,
        latched_mods: u8,
        locked_mods: u8,
        base_group: i16,
        latched_group: i16,
        locked_group: u8,
    },
    Other(u8),
}

/// `XCB_XKB_NKN_DETAIL_KEYCODES`
pub const NKN_DETAIL_KEYCODES: u16 = 1 << 0;
