//! X11 backend
//!
//! Synchronous poll-and-switch source: the host polls its connection and
//! hands every event to [`X11Backend::handle_event`]. Keyboard layout follows
//! the XKB extension (new keyboard, map and state notifications for the core
//! keyboard device). Capture uses XFixes to hide the cursor, a core pointer
//! grab, and XInput raw motion for relative deltas.

mod event;

pub use event::{Fp3232, X11Event, XkbEvent, XkbEventKind, NKN_DETAIL_KEYCODES};

use log::{debug, info, warn};
use xkbcommon::xkb;

use super::{key_event, native, Backend, NativeResult};
use crate::capture::CaptureState;
use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::event::{EventInfo, EventState};
use crate::fixed::Fixed;
use crate::keycodes::{self, xkb as xkb_codes};
use crate::text::Layout;

/// XFixes version required for cursor hiding
pub const XFIXES_VERSION: (u32, u32) = (4, 0);

/// Native X11 requests the backend needs
pub trait X11Connection {
    /// Set up the XKB extension; returns its first event code
    fn xkb_setup(&mut self) -> NativeResult<u8>;
    /// Core keyboard device id (negative on failure)
    fn xkb_core_keyboard_device_id(&mut self) -> NativeResult<i32>;
    fn xkb_keymap_new(&mut self, context: &xkb::Context, device_id: i32)
        -> NativeResult<xkb::Keymap>;
    fn xkb_state_new(&mut self, keymap: &xkb::Keymap, device_id: i32) -> NativeResult<xkb::State>;
    /// Select new-keyboard, map and state notifications for a device
    fn xkb_select_events(&mut self, device_id: i32) -> NativeResult;

    fn xfixes_query_version(&mut self, major: u32, minor: u32) -> NativeResult;
    fn xfixes_hide_cursor(&mut self, window: u32) -> NativeResult;
    fn xfixes_show_cursor(&mut self, window: u32) -> NativeResult;

    /// Grab the pointer, confined to `window`
    fn grab_pointer(&mut self, window: u32) -> NativeResult;
    fn ungrab_pointer(&mut self) -> NativeResult;

    fn xinput_client_pointer(&mut self, window: u32) -> NativeResult<u16>;
    /// Select (or clear, with `enable == false`) raw motion on the root window
    fn xinput_select_raw_motion(&mut self, root: u32, device: u16, enable: bool) -> NativeResult;
}

/// Handles supplied at `start`
pub struct X11Handles {
    pub connection: Box<dyn X11Connection>,
    pub window: u32,
    pub root: u32,
}

pub struct X11Backend {
    layout: Option<Layout>,
    connection: Option<Box<dyn X11Connection>>,
    window: u32,
    root: u32,
    xkb_event_base: u8,
    device_id: i32,
    pointer_device: Option<u16>,
    capture: CaptureState,
    text_enabled: bool,
}

impl X11Backend {
    /// First event code of the XKB extension; hosts route matching events as
    /// [`X11Event::Xkb`]
    pub fn xkb_event_base(&self) -> u8 {
        self.xkb_event_base
    }

    pub fn device_id(&self) -> i32 {
        self.device_id
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    fn connection(&mut self) -> Result<&mut (dyn X11Connection + 'static)> {
        match self.connection.as_deref_mut() {
            Some(connection) => Ok(connection),
            None => Err(Error::throw(ErrorKind::Null)),
        }
    }

    /// Fetch the device keymap and state and swap them in as one pair
    fn update_keymap(
        connection: &mut dyn X11Connection,
        layout: &mut Layout,
        device_id: i32,
    ) -> Result<()> {
        let keymap = native(
            connection.xkb_keymap_new(layout.context(), device_id),
            ErrorKind::X11XkbKeymapNew,
        )?;
        let state = native(
            connection.xkb_state_new(&keymap, device_id),
            ErrorKind::X11XkbStateNew,
        )?;
        layout.replace(keymap, state);
        debug!("X11 keymap updated (device={})", device_id);
        Ok(())
    }

    fn handle_xkb(&mut self, event: &XkbEvent) -> Result<EventInfo> {
        if i32::from(event.device_id) != self.device_id {
            return Ok(EventInfo::empty());
        }

        let reload = match event.kind {
            XkbEventKind::NewKeyboardNotify { changed } => changed & NKN_DETAIL_KEYCODES != 0,
            XkbEventKind::MapNotify => true,
            XkbEventKind::StateNotify {
                base_mods,
                latched_mods,
                locked_mods,
                base_group,
                latched_group,
                locked_group,
            } => {
                if let Some(layout) = self.layout.as_mut() {
                    // negative groups wrap, xkbcommon normalizes them
                    layout.update_mask(
                        base_mods.into(),
                        latched_mods.into(),
                        locked_mods.into(),
                        base_group as u32,
                        latched_group as u32,
                        locked_group.into(),
                    );
                }
                false
            }
            XkbEventKind::Other(_) => false,
        };

        if reload {
            let device_id = self.device_id;
            if let (Some(connection), Some(layout)) =
                (self.connection.as_deref_mut(), self.layout.as_mut())
            {
                Self::update_keymap(connection, layout, device_id)?;
            }
        }

        Ok(EventInfo::empty())
    }

    fn key(&mut self, keycode: u8, state: EventState) -> Result<EventInfo> {
        let code = keycodes::translate(&xkb_codes::TABLE, keycode);
        let text = match self.layout.as_mut() {
            Some(layout) if self.text_enabled => layout.key_text(keycode.into(), state)?,
            _ => None,
        };
        Ok(key_event(code, state, text))
    }

    fn button(&self, button: u8, state: EventState) -> EventInfo {
        let code = xkb_codes::translate_button(button);
        if code.is_none() {
            EventInfo::empty()
        } else if code.is_wheel() {
            // the wheel reports press/release pairs; one tick per press
            match state {
                EventState::Press => EventInfo::wheel(code, xkb_codes::WHEEL_STEPS),
                _ => EventInfo::empty(),
            }
        } else {
            EventInfo::switch(code, state)
        }
    }

    /// Undo the first steps of a failed grab
    fn unwind_grab(connection: &mut dyn X11Connection, window: u32, grabbed: bool) {
        if grabbed {
            if let Err(e) = connection.ungrab_pointer() {
                warn!("X11 grab unwind: ungrab failed: {}", e);
            }
        }
        if let Err(e) = connection.xfixes_show_cursor(window) {
            warn!("X11 grab unwind: show cursor failed: {}", e);
        }
    }
}

impl Backend for X11Backend {
    type Handles = X11Handles;
    type Event = X11Event;

    const NAME: &'static str = "x11";

    fn init() -> Result<Self> {
        Ok(Self {
            layout: None,
            connection: None,
            window: 0,
            root: 0,
            xkb_event_base: 0,
            device_id: -1,
            pointer_device: None,
            capture: CaptureState::Released,
            text_enabled: true,
        })
    }

    fn start(&mut self, handles: X11Handles, config: &Config) -> Result<()> {
        let X11Handles {
            mut connection,
            window,
            root,
        } = handles;

        let xkb_event_base = native(connection.xkb_setup(), ErrorKind::X11XkbSetup)?;

        let mut layout = Layout::new(&config.text);

        let device_id = native(
            connection.xkb_core_keyboard_device_id(),
            ErrorKind::X11XkbDeviceGet,
        )?;
        if device_id < 0 {
            return Err(Error::throw(ErrorKind::X11XkbDeviceGet));
        }

        Self::update_keymap(connection.as_mut(), &mut layout, device_id)?;

        native(
            connection.xkb_select_events(device_id),
            ErrorKind::X11XkbSelectEvents,
        )?;

        // everything acquired; commit
        self.layout = Some(layout);
        self.connection = Some(connection);
        self.window = window;
        self.root = root;
        self.xkb_event_base = xkb_event_base;
        self.device_id = device_id;
        self.text_enabled = config.text.enabled;

        info!(
            "X11 backend started (window={:#x}, xkb device={})",
            window, device_id
        );
        Ok(())
    }

    fn handle_event(&mut self, event: &X11Event) -> Result<EventInfo> {
        match *event {
            X11Event::KeyPress { keycode } => self.key(keycode, EventState::Press),
            X11Event::KeyRelease { keycode } => self.key(keycode, EventState::Release),
            X11Event::ButtonPress { button } => Ok(self.button(button, EventState::Press)),
            X11Event::ButtonRelease { button } => Ok(self.button(button, EventState::Release)),
            X11Event::MotionNotify { event_x, event_y } => {
                if self.capture.is_grabbed() {
                    return Ok(EventInfo::empty());
                }
                Ok(EventInfo::motion_absolute(event_x, event_y))
            }
            X11Event::RawMotion { dx, dy } => {
                if !self.capture.is_grabbed() {
                    return Ok(EventInfo::empty());
                }
                let axis = |v: Option<Fp3232>| {
                    v.map_or(Fixed::ZERO, |v| Fixed::from_fp3232(v.integral, v.frac))
                };
                Ok(EventInfo::motion_relative(axis(dx), axis(dy)))
            }
            X11Event::Xkb(ref xkb_event) => self.handle_xkb(xkb_event),
            X11Event::Other { .. } => Ok(EventInfo::empty()),
        }
    }

    fn mouse_grab(&mut self) -> Result<bool> {
        if self.capture.is_grabbed() {
            return Ok(false);
        }

        let (window, root) = (self.window, self.root);
        let connection = self.connection()?;

        let (major, minor) = XFIXES_VERSION;
        native(
            connection.xfixes_query_version(major, minor),
            ErrorKind::X11XfixesVersion,
        )?;
        native(
            connection.xfixes_hide_cursor(window),
            ErrorKind::X11XfixesHide,
        )?;

        if let Err(e) = native(connection.grab_pointer(window), ErrorKind::X11Grab) {
            Self::unwind_grab(connection, window, false);
            return Err(e);
        }

        let device = match native(
            connection.xinput_client_pointer(window),
            ErrorKind::X11XinputGetPointer,
        ) {
            Ok(device) => device,
            Err(e) => {
                Self::unwind_grab(connection, window, true);
                return Err(e);
            }
        };

        if let Err(e) = native(
            connection.xinput_select_raw_motion(root, device, true),
            ErrorKind::X11XinputSelectEvents,
        ) {
            Self::unwind_grab(connection, window, true);
            return Err(e);
        }

        self.pointer_device = Some(device);
        self.capture = CaptureState::Grabbed;
        debug!("X11 mouse grabbed (pointer device={})", device);
        Ok(true)
    }

    fn mouse_ungrab(&mut self) -> Result<bool> {
        if !self.capture.is_grabbed() {
            return Ok(false);
        }

        let (window, root) = (self.window, self.root);
        let device = self.pointer_device;
        let connection = self.connection()?;

        native(connection.ungrab_pointer(), ErrorKind::X11Ungrab)?;
        native(
            connection.xfixes_show_cursor(window),
            ErrorKind::X11XfixesShow,
        )?;
        if let Some(device) = device {
            native(
                connection.xinput_select_raw_motion(root, device, false),
                ErrorKind::X11XinputSelectEvents,
            )?;
        }

        self.pointer_device = None;
        self.capture = CaptureState::Released;
        debug!("X11 mouse released");
        Ok(true)
    }

    fn stop(&mut self) -> Result<()> {
        self.layout = None;
        info!("X11 backend stopped");
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
    use crate::event::EventCode;
    use crate::text::fixtures;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every request; `fail` names a request that should fail
    #[derive(Default)]
    struct Log {
        calls: Vec<String>,
        fail: Option<&'static str>,
        device_id: i32,
    }

    struct FakeConnection(Rc<RefCell<Log>>);

    impl FakeConnection {
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

    impl X11Connection for FakeConnection {
        fn xkb_setup(&mut self) -> NativeResult<u8> {
            self.call("xkb_setup").map(|_| 85)
        }
        fn xkb_core_keyboard_device_id(&mut self) -> NativeResult<i32> {
            let id = self.0.borrow().device_id;
            self.call("xkb_device_id").map(|_| id)
        }
        fn xkb_keymap_new(
            &mut self,
            context: &xkb::Context,
            _device_id: i32,
        ) -> NativeResult<xkb::Keymap> {
            self.call("xkb_keymap_new")?;
            xkb::Keymap::new_from_string(
                context,
                fixtures::KEYMAP.to_string(),
                xkb::KEYMAP_FORMAT_TEXT_V1,
                xkb::COMPILE_NO_FLAGS,
            )
            .ok_or_else(|| NativeError::new("bad fixture"))
        }
        fn xkb_state_new(
            &mut self,
            keymap: &xkb::Keymap,
            _device_id: i32,
        ) -> NativeResult<xkb::State> {
            self.call("xkb_state_new").map(|_| xkb::State::new(keymap))
        }
        fn xkb_select_events(&mut self, _device_id: i32) -> NativeResult {
            self.call("xkb_select_events")
        }
        fn xfixes_query_version(&mut self, _major: u32, _minor: u32) -> NativeResult {
            self.call("xfixes_query_version")
        }
        fn xfixes_hide_cursor(&mut self, _window: u32) -> NativeResult {
            self.call("hide")
        }
        fn xfixes_show_cursor(&mut self, _window: u32) -> NativeResult {
            self.call("show")
        }
        fn grab_pointer(&mut self, _window: u32) -> NativeResult {
            self.call("grab")
        }
        fn ungrab_pointer(&mut self) -> NativeResult {
            self.call("ungrab")
        }
        fn xinput_client_pointer(&mut self, _window: u32) -> NativeResult<u16> {
            self.call("client_pointer").map(|_| 2)
        }
        fn xinput_select_raw_motion(
            &mut self,
            _root: u32,
            _device: u16,
            enable: bool,
        ) -> NativeResult {
            self.call(if enable { "select_raw" } else { "clear_raw" })
        }
    }

    fn handles(log: &Rc<RefCell<Log>>) -> X11Handles {
        X11Handles {
            connection: Box::new(FakeConnection(log.clone())),
            window: 0x400001,
            root: 0x1e3,
        }
    }

    fn config() -> Config {
        Config {
            text: fixtures::text_config(false),
            ..Config::default()
        }
    }

    fn started() -> (X11Backend, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log {
            device_id: 3,
            ..Log::default()
        }));
        let mut backend = X11Backend::init().unwrap();
        backend.start(handles(&log), &config()).unwrap();
        log.borrow_mut().calls.clear();
        (backend, log)
    }

    #[test]
    fn test_start_sequence() {
        let log = Rc::new(RefCell::new(Log {
            device_id: 3,
            ..Log::default()
        }));
        let mut backend = X11Backend::init().unwrap();
        backend.start(handles(&log), &config()).unwrap();

        assert_eq!(
            log.borrow().calls,
            [
                "xkb_setup",
                "xkb_device_id",
                "xkb_keymap_new",
                "xkb_state_new",
                "xkb_select_events"
            ]
        );
        assert_eq!(backend.xkb_event_base(), 85);
        assert_eq!(backend.device_id(), 3);
        assert!(backend.layout().unwrap().has_keymap());
    }

    #[test]
    fn test_start_failures_name_the_step() {
        for (step, kind) in [
            ("xkb_setup", ErrorKind::X11XkbSetup),
            ("xkb_device_id", ErrorKind::X11XkbDeviceGet),
            ("xkb_keymap_new", ErrorKind::X11XkbKeymapNew),
            ("xkb_state_new", ErrorKind::X11XkbStateNew),
            ("xkb_select_events", ErrorKind::X11XkbSelectEvents),
        ] {
            let log = Rc::new(RefCell::new(Log {
                device_id: 3,
                fail: Some(step),
                ..Log::default()
            }));
            let mut backend = X11Backend::init().unwrap();
            let err = backend.start(handles(&log), &config()).unwrap_err();
            assert_eq!(err.kind(), kind);
            // nothing from the failed call is kept
            assert!(backend.layout().is_none());
        }
    }

    #[test]
    fn test_negative_device_id() {
        let log = Rc::new(RefCell::new(Log {
            device_id: -1,
            ..Log::default()
        }));
        let mut backend = X11Backend::init().unwrap();
        let err = backend.start(handles(&log), &config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::X11XkbDeviceGet);
    }

    #[test]
    fn test_key_press_with_text() {
        let (mut backend, _) = started();
        let info = backend
            .handle_event(&X11Event::KeyPress { keycode: 38 })
            .unwrap();
        assert_eq!(info.code, EventCode::A);
        assert_eq!(info.state, EventState::Press);
        assert_eq!(info.text.as_deref(), Some("a"));

        let info = backend
            .handle_event(&X11Event::KeyRelease { keycode: 38 })
            .unwrap();
        assert_eq!(info.state, EventState::Release);
        assert_eq!(info.text, None);
    }

    #[test]
    fn test_state_notify_updates_mask() {
        let (mut backend, _) = started();
        let state = XkbEvent {
            device_id: 3,
            kind: XkbEventKind::StateNotify {
                base_mods: fixtures::MOD_SHIFT as u8,
                latched_mods: 0,
                locked_mods: 0,
                base_group: 0,
                latched_group: 0,
                locked_group: 0,
            },
        };
        assert!(backend.handle_event(&X11Event::Xkb(state)).unwrap().is_empty());
        let info = backend
            .handle_event(&X11Event::KeyPress { keycode: 38 })
            .unwrap();
        assert_eq!(info.text.as_deref(), Some("A"));
    }

    #[test]
    fn test_xkb_events_filtered_by_device() {
        let (mut backend, log) = started();

        let other = XkbEvent {
            device_id: 9,
            kind: XkbEventKind::MapNotify,
        };
        backend.handle_event(&X11Event::Xkb(other)).unwrap();
        assert!(log.borrow().calls.is_empty());

        let unrelated = XkbEvent {
            device_id: 3,
            kind: XkbEventKind::NewKeyboardNotify { changed: 1 << 1 },
        };
        backend.handle_event(&X11Event::Xkb(unrelated)).unwrap();
        assert!(log.borrow().calls.is_empty());

        let keycodes = XkbEvent {
            device_id: 3,
            kind: XkbEventKind::NewKeyboardNotify {
                changed: NKN_DETAIL_KEYCODES,
            },
        };
        backend.handle_event(&X11Event::Xkb(keycodes)).unwrap();
        assert_eq!(log.borrow().calls, ["xkb_keymap_new", "xkb_state_new"]);
    }

    #[test]
    fn test_buttons_and_wheel() {
        let (mut backend, _) = started();
        let info = backend
            .handle_event(&X11Event::ButtonPress { button: 3 })
            .unwrap();
        assert_eq!(info.code, EventCode::MouseClickRight);
        assert_eq!(info.state, EventState::Press);

        let info = backend
            .handle_event(&X11Event::ButtonPress { button: 4 })
            .unwrap();
        assert_eq!(info.code, EventCode::MouseWheelUp);
        assert_eq!(info.state, EventState::None);
        assert_eq!(info.wheel_steps, 1);

        assert!(backend
            .handle_event(&X11Event::ButtonRelease { button: 4 })
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_motion_depends_on_capture() {
        let (mut backend, _) = started();
        let absolute = X11Event::MotionNotify {
            event_x: 10,
            event_y: -4,
        };
        let raw = X11Event::RawMotion {
            dx: Some(Fp3232 {
                integral: 1,
                frac: 0x8000_0000,
            }),
            dy: None,
        };

        let info = backend.handle_event(&absolute).unwrap();
        assert_eq!((info.mouse_x, info.mouse_y), (10, -4));
        assert!(backend.handle_event(&raw).unwrap().is_empty());

        backend.mouse_grab().unwrap();
        assert!(backend.handle_event(&absolute).unwrap().is_empty());
        let info = backend.handle_event(&raw).unwrap();
        assert_eq!(info.code, EventCode::MouseMotion);
        assert_eq!(info.delta_x.to_f64(), 1.5);
        assert_eq!(info.delta_y, Fixed::ZERO);
    }

    #[test]
    fn test_grab_sequence_and_idempotence() {
        let (mut backend, log) = started();
        assert!(backend.mouse_grab().unwrap());
        assert_eq!(
            log.borrow().calls,
            [
                "xfixes_query_version",
                "hide",
                "grab",
                "client_pointer",
                "select_raw"
            ]
        );
        assert_eq!(backend.capture_state(), CaptureState::Grabbed);

        log.borrow_mut().calls.clear();
        assert!(!backend.mouse_grab().unwrap());
        assert!(log.borrow().calls.is_empty());

        assert!(backend.mouse_ungrab().unwrap());
        assert_eq!(log.borrow().calls, ["ungrab", "show", "clear_raw"]);
        assert!(!backend.mouse_ungrab().unwrap());
        assert_eq!(backend.capture_state(), CaptureState::Released);
    }

    #[test]
    fn test_grab_failure_unwinds() {
        let (mut backend, log) = started();
        log.borrow_mut().fail = Some("client_pointer");

        let err = backend.mouse_grab().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::X11XinputGetPointer);
        assert_eq!(backend.capture_state(), CaptureState::Released);
        assert_eq!(
            log.borrow().calls,
            [
                "xfixes_query_version",
                "hide",
                "grab",
                "client_pointer",
                "ungrab",
                "show"
            ]
        );
    }

    #[test]
    fn test_grab_before_start() {
        let mut backend = X11Backend::init().unwrap();
        assert_eq!(backend.mouse_grab().unwrap_err().kind(), ErrorKind::Null);
    }
}
