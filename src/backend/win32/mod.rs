//! Win32 backend
//!
//! Raw message dispatch: the host forwards each window message it receives
//! and the backend decodes it by message id. Text comes from `WM_CHAR`
//! (already composed by the system), relative motion from `WM_INPUT`.

use log::{debug, info, trace};

use super::{key_event, native, wheel_ticks, Backend, NativeResult};
use crate::capture::CaptureState;
use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::event::{EventCode, EventInfo, EventState};
use crate::fixed::Fixed;
use crate::keycodes::win32::{self as vk, VK_F10, VK_MENU};
use crate::text;

pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_CHAR: u32 = 0x0102;
pub const WM_SYSKEYDOWN: u32 = 0x0104;
pub const WM_SYSKEYUP: u32 = 0x0105;
pub const WM_INPUT: u32 = 0x00FF;
pub const WM_MOUSEMOVE: u32 = 0x0200;
pub const WM_LBUTTONDOWN: u32 = 0x0201;
pub const WM_LBUTTONUP: u32 = 0x0202;
pub const WM_RBUTTONDOWN: u32 = 0x0204;
pub const WM_RBUTTONUP: u32 = 0x0205;
pub const WM_MBUTTONDOWN: u32 = 0x0207;
pub const WM_MBUTTONUP: u32 = 0x0208;
pub const WM_MOUSEWHEEL: u32 = 0x020A;

/// Wheel delta of one notch
pub const WHEEL_DELTA: i32 = 120;

/// `KF_EXTENDED` in the high word of a key message's `lParam`
const KF_EXTENDED: u32 = 0x0100;

/// One window message (`MSG` without window handle, time and point)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Win32Msg {
    pub message: u32,
    pub wparam: usize,
    pub lparam: isize,
}

impl Win32Msg {
    pub fn new(message: u32, wparam: usize, lparam: isize) -> Self {
        Self {
            message,
            wparam,
            lparam,
        }
    }

    fn low_word(value: isize) -> u16 {
        (value as usize & 0xFFFF) as u16
    }

    fn high_word(value: isize) -> u16 {
        ((value as usize >> 16) & 0xFFFF) as u16
    }
}

/// Screen rectangle (`RECT`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// The 2×2 box centred in this rectangle
    pub fn center_box(&self) -> Rect {
        let x = (self.left + self.right) / 2;
        let y = (self.top + self.bottom) / 2;
        Rect {
            left: x - 1,
            top: y - 1,
            right: x + 1,
            bottom: y + 1,
        }
    }
}

/// Decoded `RAWINPUT` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    Mouse {
        last_x: i32,
        last_y: i32,
        /// `MOUSE_MOVE_ABSOLUTE` set (tablets, remote sessions)
        absolute: bool,
    },
    Other,
}

/// Native Win32 calls the backend needs
pub trait Win32Api {
    /// `GetRawInputData` for the `HRAWINPUT` in a `WM_INPUT` message
    fn raw_input(&mut self, handle: isize) -> NativeResult<RawInput>;
    /// Register the generic mouse (usage page 1, usage 2) for `hwnd`
    fn register_raw_mouse(&mut self, hwnd: isize) -> NativeResult;
    fn unregister_raw_mouse(&mut self) -> NativeResult;
    fn window_rect(&mut self, hwnd: isize) -> NativeResult<Rect>;
    /// `ClipCursor`; `None` removes the clip
    fn clip_cursor(&mut self, rect: Option<Rect>) -> NativeResult;
    fn show_cursor(&mut self, show: bool);
}

pub struct Win32Handles {
    pub api: Box<dyn Win32Api>,
    pub hwnd: isize,
}

pub struct Win32Backend {
    api: Option<Box<dyn Win32Api>>,
    hwnd: isize,
    capture: CaptureState,
    text_enabled: bool,
    /// High surrogate waiting for its pair
    high_surrogate: Option<u16>,
    /// Wheel delta below one notch, kept for the next message
    wheel_remainder: i32,
}

impl Win32Backend {
    fn api(&mut self) -> Result<&mut (dyn Win32Api + 'static)> {
        match self.api.as_deref_mut() {
            Some(api) => Ok(api),
            None => Err(Error::throw(ErrorKind::Null)),
        }
    }

    fn key(msg: &Win32Msg, state: EventState) -> EventInfo {
        let code = (msg.wparam & 0xFF) as u8;
        let flags = u32::from(Win32Msg::high_word(msg.lparam));
        let extended = flags & KF_EXTENDED != 0;
        let scancode = (flags & 0xFF) as u8;
        key_event(vk::refine(code, extended, scancode), state, None)
    }

    /// Alt and F10 arrive as system keys
    fn sys_key(msg: &Win32Msg, state: EventState) -> EventInfo {
        match (msg.wparam & 0xFF) as u8 {
            VK_MENU | VK_F10 => Self::key(msg, state),
            _ => EventInfo::empty(),
        }
    }

    fn char(&mut self, msg: &Win32Msg) -> Result<EventInfo> {
        let unit = (msg.wparam & 0xFFFF) as u16;

        if (0xD800..0xDC00).contains(&unit) {
            self.high_surrogate = Some(unit);
            return Ok(EventInfo::empty());
        }

        let high = self.high_surrogate.take();
        let decoded = match high {
            Some(high) => char::decode_utf16([high, unit]).next(),
            None => char::decode_utf16([unit]).next(),
        };
        let c = match decoded {
            Some(Ok(c)) => c,
            _ => {
                trace!("Dropping unpaired surrogate {:#06x}", unit);
                return Ok(EventInfo::empty());
            }
        };

        if !self.text_enabled || c.is_control() {
            return Ok(EventInfo::empty());
        }

        let mut buf = [0u8; 4];
        match text::fragment(c.encode_utf8(&mut buf))? {
            Some(text) => Ok(EventInfo::text_only(text)),
            None => Ok(EventInfo::empty()),
        }
    }

    fn raw_motion(&mut self, msg: &Win32Msg) -> Result<EventInfo> {
        if !self.capture.is_grabbed() {
            return Ok(EventInfo::empty());
        }
        let input = native(self.api()?.raw_input(msg.lparam), ErrorKind::WinMouseRawGet)?;
        match input {
            RawInput::Mouse {
                last_x,
                last_y,
                absolute: false,
            } => Ok(EventInfo::motion_relative(
                Fixed::from_int(last_x),
                Fixed::from_int(last_y),
            )),
            _ => Ok(EventInfo::empty()),
        }
    }

    /// Signed notch count; partial notches carry over
    fn wheel(&mut self, msg: &Win32Msg) -> EventInfo {
        let delta = i32::from(Win32Msg::high_word(msg.wparam as isize) as i16);
        // a direction change discards the partial notch
        if (self.wheel_remainder > 0 && delta < 0) || (self.wheel_remainder < 0 && delta > 0) {
            self.wheel_remainder = 0;
        }
        let total = self.wheel_remainder + delta;
        self.wheel_remainder = total % WHEEL_DELTA;
        wheel_ticks(i64::from(total / WHEEL_DELTA))
    }

    /// Undo the raw input registration of a failed grab
    fn unwind_grab(api: &mut dyn Win32Api) {
        if let Err(e) = api.unregister_raw_mouse() {
            debug!("Raw mouse unregistration failed during unwind: {}", e);
        }
    }
}

impl Backend for Win32Backend {
    type Handles = Win32Handles;
    type Event = Win32Msg;

    const NAME: &'static str = "win32";

    fn init() -> Result<Self> {
        Ok(Self {
            api: None,
            hwnd: 0,
            capture: CaptureState::Released,
            text_enabled: true,
            high_surrogate: None,
            wheel_remainder: 0,
        })
    }

    fn start(&mut self, handles: Win32Handles, config: &Config) -> Result<()> {
        self.api = Some(handles.api);
        self.hwnd = handles.hwnd;
        self.capture = CaptureState::Released;
        self.text_enabled = config.text.enabled;
        info!("Win32 backend started (hwnd={:#x})", handles.hwnd);
        Ok(())
    }

    fn handle_event(&mut self, msg: &Win32Msg) -> Result<EventInfo> {
        use EventCode::{MouseClickLeft, MouseClickMiddle, MouseClickRight};
        use EventState::{Press, Release};

        let info = match msg.message {
            WM_KEYDOWN => Self::key(msg, Press),
            WM_KEYUP => Self::key(msg, Release),
            WM_SYSKEYDOWN => Self::sys_key(msg, Press),
            WM_SYSKEYUP => Self::sys_key(msg, Release),
            WM_CHAR => self.char(msg)?,
            WM_INPUT => self.raw_motion(msg)?,
            WM_MOUSEMOVE => {
                if self.capture.is_grabbed() {
                    return Ok(EventInfo::empty());
                }
                let x = Win32Msg::low_word(msg.lparam) as i16;
                let y = Win32Msg::high_word(msg.lparam) as i16;
                EventInfo::motion_absolute(x, y)
            }
            WM_LBUTTONDOWN => EventInfo::switch(MouseClickLeft, Press),
            WM_LBUTTONUP => EventInfo::switch(MouseClickLeft, Release),
            WM_RBUTTONDOWN => EventInfo::switch(MouseClickRight, Press),
            WM_RBUTTONUP => EventInfo::switch(MouseClickRight, Release),
            WM_MBUTTONDOWN => EventInfo::switch(MouseClickMiddle, Press),
            WM_MBUTTONUP => EventInfo::switch(MouseClickMiddle, Release),
            WM_MOUSEWHEEL => self.wheel(msg),
            _ => EventInfo::empty(),
        };
        Ok(info)
    }

    fn mouse_grab(&mut self) -> Result<bool> {
        if self.capture.is_grabbed() {
            return Ok(false);
        }

        let hwnd = self.hwnd;
        let api = self.api()?;

        native(api.register_raw_mouse(hwnd), ErrorKind::WinMouseGrab)?;

        let rect = match native(api.window_rect(hwnd), ErrorKind::WinWindowRectGet) {
            Ok(rect) => rect,
            Err(e) => {
                Self::unwind_grab(api);
                return Err(e);
            }
        };

        let clip = rect.center_box();
        if let Err(e) = native(api.clip_cursor(Some(clip)), ErrorKind::WinCursorClip) {
            Self::unwind_grab(api);
            return Err(e);
        }

        api.show_cursor(false);
        self.capture = CaptureState::Grabbed;
        debug!("Win32 mouse grabbed (clip={:?})", clip);
        Ok(true)
    }

    fn mouse_ungrab(&mut self) -> Result<bool> {
        if !self.capture.is_grabbed() {
            return Ok(false);
        }

        let api = self.api()?;
        native(api.unregister_raw_mouse(), ErrorKind::WinMouseUngrab)?;
        native(api.clip_cursor(None), ErrorKind::WinCursorUnclip)?;
        api.show_cursor(true);

        self.capture = CaptureState::Released;
        debug!("Win32 mouse released");
        Ok(true)
    }

    fn stop(&mut self) -> Result<()> {
        self.high_surrogate = None;
        self.wheel_remainder = 0;
        info!("Win32 backend stopped");
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
        calls: Vec<String>,
        fail: Option<&'static str>,
        raw: Option<RawInput>,
        clip: Option<Rect>,
    }

    struct FakeApi(Rc<RefCell<Log>>);

    impl FakeApi {
        fn call(&self, name: &'static str) -> NativeResult {
            let mut log = self.0.borrow_mut();
            log.calls.push(name.to_string());
            if log.fail == Some(name) {
                Err(NativeError::new(format!("{} failed", name)))
            } else {
                Ok(())
            }
        }
    }

    impl Win32Api for FakeApi {
        fn raw_input(&mut self, _handle: isize) -> NativeResult<RawInput> {
            self.call("raw_input")?;
            Ok(self.0.borrow().raw.unwrap_or(RawInput::Other))
        }
        fn register_raw_mouse(&mut self, _hwnd: isize) -> NativeResult {
            self.call("register")
        }
        fn unregister_raw_mouse(&mut self) -> NativeResult {
            self.call("unregister")
        }
        fn window_rect(&mut self, _hwnd: isize) -> NativeResult<Rect> {
            self.call("window_rect")?;
            Ok(Rect {
                left: 100,
                top: 50,
                right: 900,
                bottom: 650,
            })
        }
        fn clip_cursor(&mut self, rect: Option<Rect>) -> NativeResult {
            self.call(if rect.is_some() { "clip" } else { "unclip" })?;
            self.0.borrow_mut().clip = rect;
            Ok(())
        }
        fn show_cursor(&mut self, show: bool) {
            let _ = self.call(if show { "show" } else { "hide" });
        }
    }

    fn started() -> (Win32Backend, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut backend = Win32Backend::init().unwrap();
        let handles = Win32Handles {
            api: Box::new(FakeApi(log.clone())),
            hwnd: 0x1234,
        };
        backend.start(handles, &Config::default()).unwrap();
        (backend, log)
    }

    fn key_lparam(scancode: u8, extended: bool) -> isize {
        let mut flags = u32::from(scancode);
        if extended {
            flags |= KF_EXTENDED;
        }
        ((flags << 16) | 1) as isize
    }

    fn wheel_wparam(delta: i16) -> usize {
        (usize::from(delta as u16)) << 16
    }

    #[test]
    fn test_key_messages() {
        let (mut backend, _) = started();
        let down = Win32Msg::new(WM_KEYDOWN, 0x41, key_lparam(0x1E, false));
        let info = backend.handle_event(&down).unwrap();
        assert_eq!(info.code, EventCode::A);
        assert_eq!(info.state, EventState::Press);
        assert_eq!(info.text, None);

        let up = Win32Msg::new(WM_KEYUP, vk::VK_CONTROL.into(), key_lparam(0x1D, true));
        let info = backend.handle_event(&up).unwrap();
        assert_eq!(info.code, EventCode::CtrlRight);
        assert_eq!(info.state, EventState::Release);

        let shift = Win32Msg::new(WM_KEYDOWN, vk::VK_SHIFT.into(), key_lparam(0x36, false));
        assert_eq!(backend.handle_event(&shift).unwrap().code, EventCode::ShiftRight);
    }

    #[test]
    fn test_system_keys() {
        let (mut backend, _) = started();
        let alt = Win32Msg::new(WM_SYSKEYDOWN, VK_MENU.into(), key_lparam(0x38, true));
        let info = backend.handle_event(&alt).unwrap();
        assert_eq!(info.code, EventCode::AltRight);
        assert_eq!(info.state, EventState::Press);

        let alt = Win32Msg::new(WM_SYSKEYUP, VK_MENU.into(), key_lparam(0x38, false));
        assert_eq!(backend.handle_event(&alt).unwrap().code, EventCode::AltLeft);

        let f10 = Win32Msg::new(WM_SYSKEYDOWN, VK_F10.into(), key_lparam(0x44, false));
        assert_eq!(backend.handle_event(&f10).unwrap().code, EventCode::F10);

        // Alt+A arrives as a system key too
        let alt_a = Win32Msg::new(WM_SYSKEYDOWN, 0x41, key_lparam(0x1E, false));
        assert!(backend.handle_event(&alt_a).unwrap().is_empty());
    }

    #[test]
    fn test_char_text() {
        let (mut backend, _) = started();
        let info = backend
            .handle_event(&Win32Msg::new(WM_CHAR, 0xE9, 0))
            .unwrap();
        assert_eq!(info.code, EventCode::None);
        assert_eq!(info.state, EventState::None);
        assert_eq!(info.text.as_deref(), Some("é"));

        // backspace produces no text
        let info = backend
            .handle_event(&Win32Msg::new(WM_CHAR, 0x08, 0))
            .unwrap();
        assert!(info.is_empty());
    }

    #[test]
    fn test_char_surrogate_pair() {
        let (mut backend, _) = started();
        // U+1F600
        let high = backend
            .handle_event(&Win32Msg::new(WM_CHAR, 0xD83D, 0))
            .unwrap();
        assert!(high.is_empty());
        let low = backend
            .handle_event(&Win32Msg::new(WM_CHAR, 0xDE00, 0))
            .unwrap();
        assert_eq!(low.text.as_deref(), Some("\u{1F600}"));

        // a lone low surrogate is dropped
        let lone = backend
            .handle_event(&Win32Msg::new(WM_CHAR, 0xDE00, 0))
            .unwrap();
        assert!(lone.is_empty());
    }

    #[test]
    fn test_text_disabled() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut backend = Win32Backend::init().unwrap();
        let mut config = Config::default();
        config.text.enabled = false;
        let handles = Win32Handles {
            api: Box::new(FakeApi(log)),
            hwnd: 1,
        };
        backend.start(handles, &config).unwrap();
        let info = backend
            .handle_event(&Win32Msg::new(WM_CHAR, 'x' as usize, 0))
            .unwrap();
        assert!(info.is_empty());
    }

    #[test]
    fn test_buttons_and_motion() {
        let (mut backend, _) = started();
        let info = backend
            .handle_event(&Win32Msg::new(WM_MBUTTONDOWN, 0, 0))
            .unwrap();
        assert_eq!(info.code, EventCode::MouseClickMiddle);
        assert_eq!(info.state, EventState::Press);

        // x = -5, y = 300
        let lparam = ((300 << 16) | 0xFFFB) as isize;
        let info = backend
            .handle_event(&Win32Msg::new(WM_MOUSEMOVE, 0, lparam))
            .unwrap();
        assert_eq!(info, EventInfo::motion_absolute(-5, 300));
    }

    #[test]
    fn test_wheel_notches() {
        let (mut backend, _) = started();
        let info = backend
            .handle_event(&Win32Msg::new(WM_MOUSEWHEEL, wheel_wparam(240), 0))
            .unwrap();
        assert_eq!(info.code, EventCode::MouseWheelUp);
        assert_eq!(info.wheel_steps, 2);

        let info = backend
            .handle_event(&Win32Msg::new(WM_MOUSEWHEEL, wheel_wparam(-120), 0))
            .unwrap();
        assert_eq!(info.code, EventCode::MouseWheelDown);
        assert_eq!(info.wheel_steps, 1);
    }

    #[test]
    fn test_wheel_partial_notches_accumulate() {
        let (mut backend, _) = started();
        let half = Win32Msg::new(WM_MOUSEWHEEL, wheel_wparam(60), 0);
        assert!(backend.handle_event(&half).unwrap().is_empty());
        let info = backend.handle_event(&half).unwrap();
        assert_eq!(info.code, EventCode::MouseWheelUp);
        assert_eq!(info.wheel_steps, 1);
    }

    #[test]
    fn test_grab_sequence() {
        let (mut backend, log) = started();
        assert!(backend.mouse_grab().unwrap());
        assert!(!backend.mouse_grab().unwrap());
        assert_eq!(log.borrow().calls, ["register", "window_rect", "clip", "hide"]);
        assert_eq!(
            log.borrow().clip,
            Some(Rect {
                left: 499,
                top: 349,
                right: 501,
                bottom: 351,
            })
        );

        log.borrow_mut().calls.clear();
        assert!(backend.mouse_ungrab().unwrap());
        assert!(!backend.mouse_ungrab().unwrap());
        assert_eq!(log.borrow().calls, ["unregister", "unclip", "show"]);
        assert_eq!(backend.capture_state(), CaptureState::Released);
    }

    #[test]
    fn test_grab_clip_failure_unwinds() {
        let (mut backend, log) = started();
        log.borrow_mut().fail = Some("clip");
        let err = backend.mouse_grab().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WinCursorClip);
        assert_eq!(backend.capture_state(), CaptureState::Released);
        assert_eq!(log.borrow().calls.last().map(String::as_str), Some("unregister"));
    }

    #[test]
    fn test_raw_motion_while_grabbed() {
        let (mut backend, log) = started();
        log.borrow_mut().raw = Some(RawInput::Mouse {
            last_x: -3,
            last_y: 7,
            absolute: false,
        });
        let input = Win32Msg::new(WM_INPUT, 0, 0x77);

        // released: raw input is not read
        assert!(backend.handle_event(&input).unwrap().is_empty());
        assert!(log.borrow().calls.is_empty());

        backend.mouse_grab().unwrap();
        let info = backend.handle_event(&input).unwrap();
        assert_eq!(info.code, EventCode::MouseMotion);
        assert_eq!(info.delta_x, Fixed::from_int(-3));
        assert_eq!(info.delta_y, Fixed::from_int(7));

        // absolute motion is dropped while grabbed
        let moved = Win32Msg::new(WM_MOUSEMOVE, 0, 0x0010_0010);
        assert!(backend.handle_event(&moved).unwrap().is_empty());

        log.borrow_mut().fail = Some("raw_input");
        let err = backend.handle_event(&input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WinMouseRawGet);
    }
}
