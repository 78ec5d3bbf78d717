//! AppKit backend
//!
//! Object messaging source: the host reads the properties of each `NSEvent`
//! into an [`NsEvent`] and passes it in. Modifier keys have no key events of
//! their own on macOS; they are recovered by diffing `modifierFlags` across
//! `flagsChanged` events.

use log::{debug, info};

use super::{key_event, native, wheel_continuous, Backend, NativeResult};
use crate::capture::CaptureState;
use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::event::{EventCode, EventInfo, EventState};
use crate::fixed::Fixed;
use crate::keycodes::appkit::{
    self as kvk, KVK_CAPS_LOCK, KVK_COMMAND, KVK_CONTROL, KVK_OPTION, KVK_RIGHT_COMMAND,
    KVK_RIGHT_CONTROL, KVK_RIGHT_OPTION, KVK_RIGHT_SHIFT, KVK_SHIFT,
};
use crate::keycodes::translate;
use crate::text;

/// `NSEventType` values the backend handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum NsEventType {
    LeftMouseDown = 1,
    LeftMouseUp = 2,
    RightMouseDown = 3,
    RightMouseUp = 4,
    MouseMoved = 5,
    LeftMouseDragged = 6,
    RightMouseDragged = 7,
    KeyDown = 10,
    KeyUp = 11,
    FlagsChanged = 12,
    ScrollWheel = 22,
    OtherMouseDown = 25,
    OtherMouseUp = 26,
    OtherMouseDragged = 27,
}

impl NsEventType {
    pub fn from_raw(raw: u64) -> Option<Self> {
        use NsEventType::*;
        let ty = match raw {
            1 => LeftMouseDown,
            2 => LeftMouseUp,
            3 => RightMouseDown,
            4 => RightMouseUp,
            5 => MouseMoved,
            6 => LeftMouseDragged,
            7 => RightMouseDragged,
            10 => KeyDown,
            11 => KeyUp,
            12 => FlagsChanged,
            22 => ScrollWheel,
            25 => OtherMouseDown,
            26 => OtherMouseUp,
            27 => OtherMouseDragged,
            _ => return None,
        };
        Some(ty)
    }
}

/// `NSEventModifierFlags` (device independent)
pub const FLAG_CAPS_LOCK: u64 = 1 << 16;
pub const FLAG_SHIFT: u64 = 1 << 17;
pub const FLAG_CONTROL: u64 = 1 << 18;
pub const FLAG_OPTION: u64 = 1 << 19;
pub const FLAG_COMMAND: u64 = 1 << 20;

/// `NX_DEVICE*KEYMASK` (low bits, per side)
pub const DEVICE_LCTL: u64 = 0x0000_0001;
pub const DEVICE_LSHIFT: u64 = 0x0000_0002;
pub const DEVICE_RSHIFT: u64 = 0x0000_0004;
pub const DEVICE_LCMD: u64 = 0x0000_0008;
pub const DEVICE_RCMD: u64 = 0x0000_0010;
pub const DEVICE_LALT: u64 = 0x0000_0020;
pub const DEVICE_RALT: u64 = 0x0000_0040;
pub const DEVICE_RCTL: u64 = 0x0000_2000;

/// Properties of one `NSEvent`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NsEvent {
    /// `type`
    pub event_type: u64,
    /// `keyCode` (key and flags-changed events)
    pub key_code: u16,
    /// `modifierFlags`
    pub modifier_flags: u64,
    /// `characters` (key events)
    pub characters: Option<String>,
    /// `buttonNumber` (other-mouse events)
    pub button_number: i64,
    /// `scrollingDeltaY`
    pub scrolling_delta_y: f64,
    /// `locationInWindow`
    pub location: (f64, f64),
    /// `deltaX`, `deltaY`
    pub delta: (f64, f64),
}

impl NsEvent {
    pub fn new(event_type: NsEventType) -> Self {
        Self {
            event_type: event_type as u64,
            ..Self::default()
        }
    }

    pub fn key(event_type: NsEventType, key_code: u16, characters: Option<&str>) -> Self {
        Self {
            key_code,
            characters: characters.map(str::to_owned),
            ..Self::new(event_type)
        }
    }

    pub fn flags_changed(key_code: u16, modifier_flags: u64) -> Self {
        Self {
            key_code,
            modifier_flags,
            ..Self::new(NsEventType::FlagsChanged)
        }
    }

    pub fn scroll(delta_y: f64) -> Self {
        Self {
            scrolling_delta_y: delta_y,
            ..Self::new(NsEventType::ScrollWheel)
        }
    }

    pub fn moved(location: (f64, f64), delta: (f64, f64)) -> Self {
        Self {
            location,
            delta,
            ..Self::new(NsEventType::MouseMoved)
        }
    }
}

/// Cursor calls on `NSCursor` and CoreGraphics
pub trait AppKitApi {
    /// `[NSCursor hide]`
    fn hide_cursor(&mut self) -> NativeResult;
    /// `[NSCursor unhide]`
    fn unhide_cursor(&mut self) -> NativeResult;
    /// `CGAssociateMouseAndMouseCursorPosition`
    fn associate_mouse_and_cursor(&mut self, associated: bool) -> NativeResult;
}

pub struct AppKitHandles {
    pub api: Box<dyn AppKitApi>,
}

pub struct AppKitBackend {
    api: Option<Box<dyn AppKitApi>>,
    capture: CaptureState,
    text_enabled: bool,
    old_flags: u64,
}

/// Flag bit tracking the key behind a flags-changed event
fn modifier_mask(key_code: u8) -> Option<u64> {
    let mask = match key_code {
        KVK_SHIFT => DEVICE_LSHIFT,
        KVK_RIGHT_SHIFT => DEVICE_RSHIFT,
        KVK_CONTROL => DEVICE_LCTL,
        KVK_RIGHT_CONTROL => DEVICE_RCTL,
        KVK_OPTION => DEVICE_LALT,
        KVK_RIGHT_OPTION => DEVICE_RALT,
        KVK_COMMAND => DEVICE_LCMD,
        KVK_RIGHT_COMMAND => DEVICE_RCMD,
        KVK_CAPS_LOCK => FLAG_CAPS_LOCK,
        _ => return None,
    };
    Some(mask)
}

/// Function keys report characters in the U+F700 private use block
fn is_text_char(c: char) -> bool {
    !c.is_control() && !('\u{F700}'..='\u{F8FF}').contains(&c)
}

/// Window coordinate as an event coordinate
fn to_coord(value: f64) -> i16 {
    value.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

impl AppKitBackend {
    fn api(&mut self) -> Result<&mut (dyn AppKitApi + 'static)> {
        match self.api.as_deref_mut() {
            Some(api) => Ok(api),
            None => Err(Error::throw(ErrorKind::Null)),
        }
    }

    fn code(key_code: u16) -> EventCode {
        match u8::try_from(key_code) {
            Ok(code) => translate(&kvk::TABLE, code),
            Err(_) => EventCode::None,
        }
    }

    fn key(&self, event: &NsEvent, state: EventState) -> Result<EventInfo> {
        let text = match (&event.characters, state) {
            (Some(chars), EventState::Press) if self.text_enabled => {
                let filtered: String = chars.chars().filter(|&c| is_text_char(c)).collect();
                text::fragment(&filtered)?
            }
            _ => None,
        };
        Ok(key_event(Self::code(event.key_code), state, text))
    }

    fn flags_changed(&mut self, event: &NsEvent) -> EventInfo {
        let flags = event.modifier_flags;
        let changed = flags ^ self.old_flags;
        self.old_flags = flags;

        let mask = match u8::try_from(event.key_code).ok().and_then(modifier_mask) {
            Some(mask) => mask,
            None => return EventInfo::empty(),
        };
        if changed & mask == 0 {
            return EventInfo::empty();
        }

        let state = EventState::from_pressed(flags & mask != 0);
        EventInfo::switch(Self::code(event.key_code), state)
    }

    fn motion(&self, event: &NsEvent) -> EventInfo {
        if self.capture.is_grabbed() {
            let (dx, dy) = event.delta;
            EventInfo::motion_relative(Fixed::from_f64(dx), Fixed::from_f64(dy))
        } else {
            let (x, y) = event.location;
            EventInfo::motion_absolute(to_coord(x), to_coord(y))
        }
    }

    fn other_button(event: &NsEvent, state: EventState) -> EventInfo {
        let code = kvk::translate_other_button(event.button_number);
        if code.is_none() {
            EventInfo::empty()
        } else {
            EventInfo::switch(code, state)
        }
    }
}

impl Backend for AppKitBackend {
    type Handles = AppKitHandles;
    type Event = NsEvent;

    const NAME: &'static str = "appkit";

    fn init() -> Result<Self> {
        Ok(Self {
            api: None,
            capture: CaptureState::Released,
            text_enabled: true,
            old_flags: 0,
        })
    }

    fn start(&mut self, handles: AppKitHandles, config: &Config) -> Result<()> {
        self.api = Some(handles.api);
        self.capture = CaptureState::Released;
        self.text_enabled = config.text.enabled;
        self.old_flags = 0;
        info!("AppKit backend started");
        Ok(())
    }

    fn handle_event(&mut self, event: &NsEvent) -> Result<EventInfo> {
        use EventCode::{MouseClickLeft, MouseClickRight};
        use EventState::{Press, Release};
        use NsEventType::*;

        let Some(ty) = NsEventType::from_raw(event.event_type) else {
            return Ok(EventInfo::empty());
        };

        let info = match ty {
            LeftMouseDown => EventInfo::switch(MouseClickLeft, Press),
            LeftMouseUp => EventInfo::switch(MouseClickLeft, Release),
            RightMouseDown => EventInfo::switch(MouseClickRight, Press),
            RightMouseUp => EventInfo::switch(MouseClickRight, Release),
            OtherMouseDown => Self::other_button(event, Press),
            OtherMouseUp => Self::other_button(event, Release),
            MouseMoved | LeftMouseDragged | RightMouseDragged | OtherMouseDragged => {
                self.motion(event)
            }
            // positive scrollingDeltaY scrolls content up
            ScrollWheel => wheel_continuous(event.scrolling_delta_y),
            KeyDown => self.key(event, Press)?,
            KeyUp => self.key(event, Release)?,
            FlagsChanged => self.flags_changed(event),
        };
        Ok(info)
    }

    fn mouse_grab(&mut self) -> Result<bool> {
        if self.capture.is_grabbed() {
            return Ok(false);
        }

        let api = self.api()?;
        native(api.hide_cursor(), ErrorKind::AppKitCursorHide)?;
        if let Err(e) = native(
            api.associate_mouse_and_cursor(false),
            ErrorKind::AppKitMouseAssociate,
        ) {
            if let Err(unhide) = api.unhide_cursor() {
                debug!("Cursor unhide failed during unwind: {}", unhide);
            }
            return Err(e);
        }

        self.capture = CaptureState::Grabbed;
        debug!("AppKit mouse grabbed");
        Ok(true)
    }

    fn mouse_ungrab(&mut self) -> Result<bool> {
        if !self.capture.is_grabbed() {
            return Ok(false);
        }

        let api = self.api()?;
        native(
            api.associate_mouse_and_cursor(true),
            ErrorKind::AppKitMouseAssociate,
        )?;
        native(api.unhide_cursor(), ErrorKind::AppKitCursorShow)?;

        self.capture = CaptureState::Released;
        debug!("AppKit mouse released");
        Ok(true)
    }

    fn stop(&mut self) -> Result<()> {
        self.old_flags = 0;
        info!("AppKit backend stopped");
        Ok(())
    }

    fn capture_state(&self) -> CaptureState {
        self.capture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NativeError;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        calls: Vec<&'static str>,
        fail: Option<&'static str>,
    }

    struct FakeApi(Rc<RefCell<Log>>);

    impl FakeApi {
        fn call(&self, name: &'static str) -> NativeResult {
            let mut log = self.0.borrow_mut();
            log.calls.push(name);
            if log.fail == Some(name) {
                Err(NativeError::new(format!("{} failed", name)))
            } else {
                Ok(())
            }
        }
    }

    impl AppKitApi for FakeApi {
        fn hide_cursor(&mut self) -> NativeResult {
            self.call("hide")
        }
        fn unhide_cursor(&mut self) -> NativeResult {
            self.call("unhide")
        }
        fn associate_mouse_and_cursor(&mut self, associated: bool) -> NativeResult {
            self.call(if associated { "associate" } else { "disassociate" })
        }
    }

    fn started() -> (AppKitBackend, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut backend = AppKitBackend::init().unwrap();
        let handles = AppKitHandles {
            api: Box::new(FakeApi(log.clone())),
        };
        backend.start(handles, &Config::default()).unwrap();
        (backend, log)
    }

    #[test]
    fn test_event_type_from_raw() {
        assert_eq!(NsEventType::from_raw(22), Some(NsEventType::ScrollWheel));
        assert_eq!(NsEventType::from_raw(12), Some(NsEventType::FlagsChanged));
        assert_eq!(NsEventType::from_raw(9), None);
    }

    #[test]
    fn test_scroll_is_one_step() {
        let (mut backend, _) = started();
        let info = backend.handle_event(&NsEvent::scroll(1.0)).unwrap();
        assert_eq!(info.code, EventCode::MouseWheelUp);
        assert_eq!(info.state, EventState::None);
        assert_eq!(info.wheel_steps, 1);

        let info = backend.handle_event(&NsEvent::scroll(-7.5)).unwrap();
        assert_eq!(info.code, EventCode::MouseWheelDown);
        assert_eq!(info.wheel_steps, 1);

        assert!(backend.handle_event(&NsEvent::scroll(0.0)).unwrap().is_empty());
    }

    #[test]
    fn test_key_down_text() {
        let (mut backend, _) = started();
        let down = NsEvent::key(NsEventType::KeyDown, 0x00, Some("a"));
        let info = backend.handle_event(&down).unwrap();
        assert_eq!(info.code, EventCode::A);
        assert_eq!(info.state, EventState::Press);
        assert_eq!(info.text.as_deref(), Some("a"));

        let up = NsEvent::key(NsEventType::KeyUp, 0x00, Some("a"));
        let info = backend.handle_event(&up).unwrap();
        assert_eq!(info.state, EventState::Release);
        assert_eq!(info.text, None);
    }

    #[test]
    fn test_function_key_characters_dropped() {
        let (mut backend, _) = started();
        // up arrow reports U+F700
        let up = NsEvent::key(NsEventType::KeyDown, 0x7E, Some("\u{F700}"));
        let info = backend.handle_event(&up).unwrap();
        assert_eq!(info.code, EventCode::Up);
        assert_eq!(info.text, None);

        let escape = NsEvent::key(NsEventType::KeyDown, 0x35, Some("\u{1b}"));
        let info = backend.handle_event(&escape).unwrap();
        assert_eq!(info.code, EventCode::Escape);
        assert_eq!(info.text, None);
    }

    #[test]
    fn test_flags_changed_sides() {
        let (mut backend, _) = started();
        let shift = FLAG_SHIFT | DEVICE_RSHIFT;
        let info = backend
            .handle_event(&NsEvent::flags_changed(KVK_RIGHT_SHIFT.into(), shift))
            .unwrap();
        assert_eq!(info.code, EventCode::ShiftRight);
        assert_eq!(info.state, EventState::Press);

        // left shift joins; right is unchanged
        let both = shift | DEVICE_LSHIFT;
        let info = backend
            .handle_event(&NsEvent::flags_changed(KVK_SHIFT.into(), both))
            .unwrap();
        assert_eq!(info.code, EventCode::ShiftLeft);
        assert_eq!(info.state, EventState::Press);

        let info = backend
            .handle_event(&NsEvent::flags_changed(KVK_RIGHT_SHIFT.into(), FLAG_SHIFT | DEVICE_LSHIFT))
            .unwrap();
        assert_eq!(info.code, EventCode::ShiftRight);
        assert_eq!(info.state, EventState::Release);

        let info = backend
            .handle_event(&NsEvent::flags_changed(KVK_COMMAND.into(), FLAG_COMMAND | DEVICE_LCMD))
            .unwrap();
        assert_eq!(info.code, EventCode::ModLeft);
        assert_eq!(info.state, EventState::Press);
    }

    #[test]
    fn test_caps_lock_toggle() {
        let (mut backend, _) = started();
        let on = backend
            .handle_event(&NsEvent::flags_changed(KVK_CAPS_LOCK.into(), FLAG_CAPS_LOCK))
            .unwrap();
        assert_eq!(on.code, EventCode::CapsLock);
        assert_eq!(on.state, EventState::Press);

        let off = backend
            .handle_event(&NsEvent::flags_changed(KVK_CAPS_LOCK.into(), 0))
            .unwrap();
        assert_eq!(off.code, EventCode::CapsLock);
        assert_eq!(off.state, EventState::Release);
    }

    #[test]
    fn test_buttons() {
        let (mut backend, _) = started();
        let info = backend
            .handle_event(&NsEvent::new(NsEventType::RightMouseDown))
            .unwrap();
        assert_eq!(info.code, EventCode::MouseClickRight);
        assert_eq!(info.state, EventState::Press);

        let mut other = NsEvent::new(NsEventType::OtherMouseUp);
        other.button_number = 2;
        let info = backend.handle_event(&other).unwrap();
        assert_eq!(info.code, EventCode::MouseClickMiddle);
        assert_eq!(info.state, EventState::Release);

        other.button_number = 4;
        assert!(backend.handle_event(&other).unwrap().is_empty());
    }

    #[test]
    fn test_motion_follows_capture() {
        let (mut backend, log) = started();
        let moved = NsEvent::moved((120.7, 40.2), (1.5, -0.25));
        assert_eq!(
            backend.handle_event(&moved).unwrap(),
            EventInfo::motion_absolute(120, 40)
        );

        assert!(backend.mouse_grab().unwrap());
        assert!(!backend.mouse_grab().unwrap());
        assert_eq!(log.borrow().calls, ["hide", "disassociate"]);

        let info = backend.handle_event(&moved).unwrap();
        assert_eq!(info.code, EventCode::MouseMotion);
        assert_eq!(info.delta_x.to_f64(), 1.5);
        assert_eq!(info.delta_y.to_f64(), -0.25);
        assert_eq!((info.mouse_x, info.mouse_y), (0, 0));

        assert!(backend.mouse_ungrab().unwrap());
        assert!(!backend.mouse_ungrab().unwrap());
        assert_eq!(
            log.borrow().calls,
            ["hide", "disassociate", "associate", "unhide"]
        );
    }

    #[test]
    fn test_grab_failure_unwinds() {
        let (mut backend, log) = started();
        log.borrow_mut().fail = Some("disassociate");
        let err = backend.mouse_grab().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AppKitMouseAssociate);
        assert_eq!(backend.capture_state(), CaptureState::Released);
        assert_eq!(log.borrow().calls, ["hide", "disassociate", "unhide"]);
    }

    #[test]
    fn test_grab_before_start() {
        let mut backend = AppKitBackend::init().unwrap();
        assert_eq!(backend.mouse_grab().unwrap_err().kind(), ErrorKind::Null);
    }
}
