//! Listener callbacks
//!
//! The host wires every registry, seat, pointer, keyboard and relative
//! pointer event to a [`Listener`]. Each callback locks the shared state,
//! updates it, releases the lock and only then calls the host's notifier
//! with the serial to flush.

use std::os::fd::OwnedFd;
use std::sync::Arc;

use bitflags::bitflags;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use super::correlation::Correlator;
use super::keymap;
use super::{Notifier, ObjectId, Protocol, WaylandProtocol};
use crate::backend::{key_event, native, wheel_continuous, wheel_ticks};
use crate::capture::CaptureState;
use crate::error::{Error, ErrorKind, Result};
use crate::event::{EventInfo, EventState};
use crate::fixed::Fixed;
use crate::keycodes::evdev;
use crate::text::Layout;

pub const RELATIVE_POINTER_MANAGER: &str = "zwp_relative_pointer_manager_v1";
pub const POINTER_CONSTRAINTS: &str = "zwp_pointer_constraints_v1";

/// `wl_pointer.axis` vertical scroll
pub const AXIS_VERTICAL_SCROLL: u32 = 0;

/// `wl_pointer.button_state` / `wl_keyboard.key_state` pressed
pub const STATE_PRESSED: u32 = 1;

bitflags! {
    /// `wl_seat.capability`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SeatCapabilities: u32 {
        const POINTER = 1;
        const KEYBOARD = 2;
        const TOUCH = 4;
    }
}

/// The two host registrations `start` performs
///
/// Both must complete before the source is usable; tracked per backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCapabilities {
    pub registry: bool,
    pub seat: bool,
}

impl PendingCapabilities {
    pub fn is_complete(&self) -> bool {
        self.registry && self.seat
    }
}

/// Bound global: registry name and proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Global {
    name: u32,
    id: ObjectId,
}

/// Capture resources; both present exactly while grabbed
#[derive(Debug, Default)]
struct PointerCapture {
    state: CaptureState,
    relative: Option<ObjectId>,
    locked: Option<ObjectId>,
}

/// Seat objects taken out of the shared state, released after unlocking
#[derive(Debug, Default)]
struct Released {
    locked: Option<ObjectId>,
    relative: Option<ObjectId>,
    pointer: Option<ObjectId>,
    keyboard: Option<ObjectId>,
}

impl Released {
    fn release(self, protocol: &dyn WaylandProtocol) {
        if let Some(locked) = self.locked {
            protocol.destroy_locked_pointer(locked);
        }
        if let Some(relative) = self.relative {
            protocol.destroy_relative_pointer(relative);
        }
        if let Some(pointer) = self.pointer {
            protocol.release_pointer(pointer);
        }
        if let Some(keyboard) = self.keyboard {
            protocol.release_keyboard(keyboard);
        }
    }
}

pub(super) struct Shared {
    pub(super) correlator: Correlator,
    layout: Option<Layout>,
    text_enabled: bool,
    protocol: Option<Protocol>,
    notifier: Option<Notifier>,
    pub(super) registration: PendingCapabilities,
    attached: bool,
    /// Bumped on every attach and detach; requests issued in an older
    /// session are undone instead of committed
    session: u64,
    pointer: Option<ObjectId>,
    keyboard: Option<ObjectId>,
    relative_manager: Option<Global>,
    constraints_manager: Option<Global>,
    pointer_surface: Option<ObjectId>,
    enter_serial: u32,
    discrete_seen: bool,
    capture: PointerCapture,
}

impl Shared {
    fn new() -> Self {
        Self {
            correlator: Correlator::new(),
            layout: None,
            text_enabled: true,
            protocol: None,
            notifier: None,
            registration: PendingCapabilities::default(),
            attached: false,
            session: 0,
            pointer: None,
            keyboard: None,
            relative_manager: None,
            constraints_manager: None,
            pointer_surface: None,
            enter_serial: 0,
            discrete_seen: false,
            capture: PointerCapture::default(),
        }
    }

    fn protocol(&self) -> Result<Protocol> {
        self.protocol
            .clone()
            .ok_or_else(|| Error::throw(ErrorKind::Null))
    }

    fn is_session(&self, session: u64) -> bool {
        self.attached && self.session == session
    }

    fn key_text(&mut self, key: u32, state: EventState) -> Result<Option<smol_str::SmolStr>> {
        match self.layout.as_mut() {
            Some(layout) if self.text_enabled => layout.key_text(evdev::to_xkb(key), state),
            _ => Ok(None),
        }
    }

    fn key(&mut self, key: u32, state: EventState) -> Result<EventInfo> {
        let code = evdev::translate_key(key);
        let text = self.key_text(key, state)?;
        Ok(key_event(code, state, text))
    }

    /// Key or button record; unmapped input only advances the serial
    fn record_switch(&mut self, serial: u32, event: EventInfo) -> bool {
        if event.is_empty() {
            self.correlator.set_serial(Some(serial));
            return false;
        }
        self.correlator.record(Some(serial), event);
        true
    }

    /// Notifier and serial to call once the lock is released
    fn pending_notification(&self) -> Option<(Notifier, u32)> {
        self.notifier
            .clone()
            .map(|notifier| (notifier, self.correlator.serial()))
    }

    fn take_capture(&mut self) -> Released {
        self.capture.state = CaptureState::Released;
        Released {
            locked: self.capture.locked.take(),
            relative: self.capture.relative.take(),
            ..Released::default()
        }
    }

    fn take_pointer(&mut self) -> Released {
        self.pointer_surface = None;
        Released {
            pointer: self.pointer.take(),
            ..self.take_capture()
        }
    }

    fn take_seat(&mut self) -> Released {
        Released {
            keyboard: self.keyboard.take(),
            ..self.take_pointer()
        }
    }

    pub(super) fn capture_state(&self) -> CaptureState {
        self.capture.state
    }
}

/// Callback target handed to the host at `start`
///
/// Cheap to clone; all clones share the backend's state. The lock is never
/// held while a [`WaylandProtocol`] request or the notifier runs, so hosts
/// may dispatch further callbacks from inside either.
#[derive(Clone)]
pub struct Listener {
    shared: Arc<Mutex<Shared>>,
}

impl Listener {
    pub(super) fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::new())),
        }
    }

    pub(super) fn lock(&self) -> parking_lot::MutexGuard<'_, Shared> {
        self.shared.lock()
    }

    /// Start routing callbacks into a fresh session
    pub(super) fn attach(
        &self,
        layout: Layout,
        text_enabled: bool,
        protocol: Protocol,
        notifier: Notifier,
    ) {
        let mut shared = self.shared.lock();
        shared.session += 1;
        shared.correlator.reset();
        shared.layout = Some(layout);
        shared.text_enabled = text_enabled;
        shared.protocol = Some(protocol);
        shared.notifier = Some(notifier);
        shared.registration = PendingCapabilities::default();
        shared.attached = true;
    }

    /// Stop routing callbacks and release every seat object
    ///
    /// Bound globals and the focus surface belong to the detached session
    /// and are forgotten; a later attach learns them again.
    pub(super) fn detach(&self) {
        let (protocol, released) = {
            let mut shared = self.shared.lock();
            let released = shared.take_seat();
            shared.attached = false;
            shared.session += 1;
            shared.correlator.reset();
            shared.layout = None;
            shared.notifier = None;
            shared.relative_manager = None;
            shared.constraints_manager = None;
            shared.enter_serial = 0;
            shared.discrete_seen = false;
            (shared.protocol.take(), released)
        };
        if let Some(protocol) = protocol {
            released.release(&*protocol);
        }
    }

    /// Run `f` under the lock, then notify outside of it
    fn dispatch<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Shared) -> Result<bool>,
    {
        let notification = {
            let mut shared = self.shared.lock();
            if !shared.attached {
                return Ok(());
            }
            if !f(&mut *shared)? {
                return Ok(());
            }
            shared.pending_notification()
        };

        if let Some((notifier, serial)) = notification {
            notifier(serial);
        }
        Ok(())
    }

    /// Record the flushable event for `serial`, if complete
    pub fn flush(&self, serial: u32) -> Option<EventInfo> {
        self.shared.lock().correlator.flush(serial)
    }

    pub fn registration(&self) -> PendingCapabilities {
        self.shared.lock().registration
    }

    pub(super) fn capture_state(&self) -> CaptureState {
        self.shared.lock().capture_state()
    }

    // ------------------------------------------------------------------
    // Capture
    // ------------------------------------------------------------------

    /// Hide the cursor, then create the relative pointer and the lock
    pub(super) fn grab(&self) -> Result<bool> {
        let (protocol, session, pointer, relative_manager, constraints_manager, surface, serial) = {
            let shared = self.shared.lock();
            if shared.capture.state.is_grabbed() {
                return Ok(false);
            }
            let pointer = shared
                .pointer
                .ok_or_else(|| Error::throw(ErrorKind::WaylandPointerMissing))?;
            let relative_manager = shared
                .relative_manager
                .ok_or_else(|| Error::throw(ErrorKind::WaylandPointerRelativeManagerMissing))?;
            let constraints_manager = shared
                .constraints_manager
                .ok_or_else(|| Error::throw(ErrorKind::WaylandPointerConstraintsManagerMissing))?;
            let surface = shared
                .pointer_surface
                .ok_or_else(|| Error::throw(ErrorKind::WaylandPointerSurfaceMissing))?;
            (
                shared.protocol()?,
                shared.session,
                pointer,
                relative_manager,
                constraints_manager,
                surface,
                shared.enter_serial,
            )
        };

        protocol.set_cursor(pointer, serial, None);

        let relative = native(
            protocol.get_relative_pointer(relative_manager.id, pointer),
            ErrorKind::WaylandPointerRelativeGet,
        )?;

        let locked = match native(
            protocol.lock_pointer(constraints_manager.id, surface, pointer),
            ErrorKind::WaylandPointerLockedGet,
        ) {
            Ok(locked) => locked,
            Err(e) => {
                protocol.destroy_relative_pointer(relative);
                return Err(e);
            }
        };

        let committed = {
            let mut shared = self.shared.lock();
            let unchanged = shared.is_session(session)
                && shared.pointer == Some(pointer)
                && !shared.capture.state.is_grabbed();
            if unchanged {
                shared.capture = PointerCapture {
                    state: CaptureState::Grabbed,
                    relative: Some(relative),
                    locked: Some(locked),
                };
            }
            unchanged
        };

        if !committed {
            warn!("Seat changed while locking the pointer, undoing");
            Released {
                locked: Some(locked),
                relative: Some(relative),
                ..Released::default()
            }
            .release(&*protocol);
            return Err(Error::throw(ErrorKind::WaylandPointerMissing));
        }

        debug!("Wayland pointer locked (surface={:?})", surface);
        Ok(true)
    }

    pub(super) fn ungrab(&self) -> Result<bool> {
        let (protocol, released) = {
            let mut shared = self.shared.lock();
            if !shared.capture.state.is_grabbed() {
                return Ok(false);
            }
            if shared.capture.relative.is_none() {
                return Err(Error::throw(ErrorKind::WaylandPointerRelativeMissing));
            }
            if shared.capture.locked.is_none() {
                return Err(Error::throw(ErrorKind::WaylandPointerLockedMissing));
            }
            let protocol = shared.protocol()?;
            (protocol, shared.take_capture())
        };

        released.release(&*protocol);
        debug!("Wayland pointer unlocked");
        Ok(true)
    }

    // ------------------------------------------------------------------
    // wl_registry
    // ------------------------------------------------------------------

    pub fn registry_global(&self, name: u32, interface: &str, version: u32) -> Result<()> {
        let is_relative = interface == RELATIVE_POINTER_MANAGER;
        if !is_relative && interface != POINTER_CONSTRAINTS {
            return Ok(());
        }

        let (protocol, session) = {
            let shared = self.shared.lock();
            if !shared.attached {
                return Ok(());
            }
            (shared.protocol()?, shared.session)
        };

        let id = native(protocol.bind(name, interface, 1), ErrorKind::WaylandRequest)?;

        let mut shared = self.shared.lock();
        if !shared.is_session(session) {
            debug!("{} bound after detach, ignored", interface);
            return Ok(());
        }
        let global = Some(Global { name, id });
        if is_relative {
            shared.relative_manager = global;
        } else {
            shared.constraints_manager = global;
        }
        debug!("Bound {} (name={}, version={})", interface, name, version);
        Ok(())
    }

    pub fn registry_global_remove(&self, name: u32) {
        let mut shared = self.shared.lock();
        if shared.relative_manager.map(|g| g.name) == Some(name) {
            shared.relative_manager = None;
            debug!("{} removed", RELATIVE_POINTER_MANAGER);
        }
        if shared.constraints_manager.map(|g| g.name) == Some(name) {
            shared.constraints_manager = None;
            debug!("{} removed", POINTER_CONSTRAINTS);
        }
    }

    // ------------------------------------------------------------------
    // wl_seat
    // ------------------------------------------------------------------

    pub fn seat_capabilities(&self, capabilities: SeatCapabilities) -> Result<()> {
        let has_pointer = capabilities.contains(SeatCapabilities::POINTER);
        let has_keyboard = capabilities.contains(SeatCapabilities::KEYBOARD);

        let (protocol, session, released, want_pointer, want_keyboard) = {
            let mut shared = self.shared.lock();
            if !shared.attached {
                return Ok(());
            }
            let mut released = Released::default();
            if !has_pointer && shared.pointer.is_some() {
                if shared.capture.state.is_grabbed() {
                    warn!("Pointer removed while grabbed, releasing capture");
                }
                released = shared.take_pointer();
            }
            if !has_keyboard {
                released.keyboard = shared.keyboard.take();
            }
            (
                shared.protocol()?,
                shared.session,
                released,
                has_pointer && shared.pointer.is_none(),
                has_keyboard && shared.keyboard.is_none(),
            )
        };

        if released.pointer.is_some() {
            debug!("Seat pointer released");
        }
        if released.keyboard.is_some() {
            debug!("Seat keyboard released");
        }
        released.release(&*protocol);

        if want_pointer {
            let pointer = native(protocol.get_pointer(), ErrorKind::WaylandPointerGet)?;
            let mut shared = self.shared.lock();
            if shared.is_session(session) && shared.pointer.is_none() {
                shared.pointer = Some(pointer);
                debug!("Seat pointer acquired");
            } else {
                drop(shared);
                protocol.release_pointer(pointer);
            }
        }

        if want_keyboard {
            let keyboard = native(protocol.get_keyboard(), ErrorKind::WaylandKeyboardGet)?;
            let mut shared = self.shared.lock();
            if shared.is_session(session) && shared.keyboard.is_none() {
                shared.keyboard = Some(keyboard);
                debug!("Seat keyboard acquired");
            } else {
                drop(shared);
                protocol.release_keyboard(keyboard);
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // wl_pointer
    // ------------------------------------------------------------------

    /// Surface coordinates are `wl_fixed_t`
    pub fn pointer_enter(&self, serial: u32, surface: ObjectId, x: i32, y: i32) -> Result<()> {
        self.dispatch(|shared| {
            shared.pointer_surface = Some(surface);
            shared.enter_serial = serial;
            if shared.capture.state.is_grabbed() {
                shared.correlator.set_serial(Some(serial));
                return Ok(false);
            }
            shared
                .correlator
                .record_position(Some(serial), to_coord(x), to_coord(y));
            Ok(true)
        })
    }

    pub fn pointer_leave(&self, serial: u32, surface: ObjectId) {
        let mut shared = self.shared.lock();
        if !shared.attached {
            return;
        }
        shared.correlator.set_serial(Some(serial));
        if shared.pointer_surface == Some(surface) {
            shared.pointer_surface = None;
        }
    }

    pub fn pointer_motion(&self, _time: u32, x: i32, y: i32) -> Result<()> {
        self.dispatch(|shared| {
            // a locked pointer reports relative motion only
            if shared.capture.state.is_grabbed() {
                return Ok(false);
            }
            shared
                .correlator
                .record_position(None, to_coord(x), to_coord(y));
            Ok(true)
        })
    }

    pub fn pointer_button(&self, serial: u32, _time: u32, button: u32, state: u32) -> Result<()> {
        self.dispatch(|shared| {
            let code = evdev::translate_button(button);
            let event = if code.is_none() {
                EventInfo::empty()
            } else {
                EventInfo::switch(code, EventState::from_pressed(state == STATE_PRESSED))
            };
            Ok(shared.record_switch(serial, event))
        })
    }

    /// Continuous scroll; `value` is `wl_fixed_t`, positive meaning down
    ///
    /// Ignored when the same frame already carried a discrete step.
    pub fn pointer_axis(&self, _time: u32, axis: u32, value: i32) -> Result<()> {
        self.dispatch(|shared| {
            if axis != AXIS_VERTICAL_SCROLL || shared.discrete_seen {
                return Ok(false);
            }
            let event = wheel_continuous(-f64::from(value));
            if event.is_empty() {
                return Ok(false);
            }
            shared.correlator.record(None, event);
            Ok(true)
        })
    }

    /// Wheel clicks; negative means up
    pub fn pointer_axis_discrete(&self, axis: u32, discrete: i32) -> Result<()> {
        self.dispatch(|shared| {
            if axis != AXIS_VERTICAL_SCROLL {
                return Ok(false);
            }
            shared.discrete_seen = true;
            let event = wheel_ticks(-i64::from(discrete));
            if event.is_empty() {
                return Ok(false);
            }
            shared.correlator.record(None, event);
            Ok(true)
        })
    }

    pub fn pointer_frame(&self) {
        self.shared.lock().discrete_seen = false;
    }

    // ------------------------------------------------------------------
    // wl_keyboard
    // ------------------------------------------------------------------

    /// Compile a new keymap and swap it in; the descriptor is consumed
    pub fn keyboard_keymap(&self, format: u32, fd: OwnedFd, size: u32) -> Result<()> {
        let text = keymap::read_keymap(format, fd, size)?;

        let mut shared = self.shared.lock();
        if !shared.attached {
            return Ok(());
        }
        match shared.layout.as_mut() {
            Some(layout) => {
                layout.compile_string(text)?;
                info!("Wayland keymap updated ({} bytes)", size);
                Ok(())
            }
            None => Err(Error::throw(ErrorKind::Null)),
        }
    }

    /// Keys already held when focus arrives are reported as presses
    ///
    /// Each held key is its own record; the notifier runs once per key with
    /// the enter serial.
    pub fn keyboard_enter(&self, serial: u32, _surface: ObjectId, keys: &[u32]) -> Result<()> {
        if keys.is_empty() {
            let mut shared = self.shared.lock();
            if shared.attached {
                shared.correlator.set_serial(Some(serial));
            }
            return Ok(());
        }
        for &key in keys {
            self.dispatch(|shared| {
                let event = shared.key(key, EventState::Press)?;
                if !shared.record_switch(serial, event) {
                    return Ok(false);
                }
                shared.correlator.commit();
                Ok(true)
            })?;
        }
        Ok(())
    }

    pub fn keyboard_leave(&self, serial: u32, _surface: ObjectId) {
        let mut shared = self.shared.lock();
        if shared.attached {
            shared.correlator.set_serial(Some(serial));
        }
    }

    pub fn keyboard_key(&self, serial: u32, _time: u32, key: u32, state: u32) -> Result<()> {
        self.dispatch(|shared| {
            let event = shared.key(key, EventState::from_pressed(state == STATE_PRESSED))?;
            Ok(shared.record_switch(serial, event))
        })
    }

    pub fn keyboard_modifiers(
        &self,
        serial: u32,
        depressed: u32,
        latched: u32,
        locked: u32,
        group: u32,
    ) -> Result<()> {
        self.dispatch(|shared| {
            shared.correlator.set_serial(Some(serial));
            if let Some(layout) = shared.layout.as_mut() {
                layout.update_mask(depressed, latched, locked, 0, 0, group);
            }
            trace!(
                "Modifiers: depressed={:#x} latched={:#x} locked={:#x} group={}",
                depressed,
                latched,
                locked,
                group
            );
            Ok(true)
        })
    }

    // ------------------------------------------------------------------
    // zwp_relative_pointer_v1 / zwp_locked_pointer_v1
    // ------------------------------------------------------------------

    /// Relative motion; the unaccelerated deltas are used
    #[allow(clippy::too_many_arguments)]
    pub fn relative_motion(
        &self,
        _utime_hi: u32,
        _utime_lo: u32,
        _dx: i32,
        _dy: i32,
        dx_unaccel: i32,
        dy_unaccel: i32,
    ) -> Result<()> {
        self.dispatch(|shared| {
            if !shared.capture.state.is_grabbed() {
                return Ok(false);
            }
            shared.correlator.record_delta(
                Fixed::from_wl_fixed(dx_unaccel),
                Fixed::from_wl_fixed(dy_unaccel),
            );
            Ok(true)
        })
    }

    pub fn pointer_locked(&self) {
        trace!("Pointer lock activated");
    }

    pub fn pointer_unlocked(&self) {
        trace!("Pointer lock deactivated");
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener").finish_non_exhaustive()
    }
}

/// `wl_fixed_to_int`, clamped to the event's coordinate range
fn to_coord(value: i32) -> i16 {
    let int = value / 256;
    int.clamp(i16::MIN.into(), i16::MAX.into()) as i16
}
