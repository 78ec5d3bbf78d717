//! Wayland backend
//!
//! Callback-driven source. The host routes registry, seat, pointer, keyboard
//! and relative-pointer events to the [`Listener`] registered at `start`.
//! Callbacks accumulate one record per serial and call the host's notifier;
//! the host then passes that serial back through `handle_event` to collect
//! the record.
//!
//! Capture locks the pointer to the focused surface with
//! `zwp_pointer_constraints_v1` and reads unaccelerated deltas from
//! `zwp_relative_pointer_manager_v1`.

mod correlation;
mod keymap;
mod listener;

pub use correlation::Correlator;
pub use keymap::{read_keymap, FORMAT_NO_KEYMAP, FORMAT_XKB_V1};
pub use listener::{
    Listener, PendingCapabilities, SeatCapabilities, AXIS_VERTICAL_SCROLL, POINTER_CONSTRAINTS,
    RELATIVE_POINTER_MANAGER, STATE_PRESSED,
};

use std::sync::Arc;

use log::{debug, info};

use super::{native, Backend, NativeResult};
use crate::capture::CaptureState;
use crate::config::Config;
use crate::error::{ErrorKind, Result};
use crate::event::EventInfo;
use crate::text::Layout;

/// Protocol object handle as the host tracks it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u32);

/// Called with a serial whose record is ready to flush
pub type Notifier = Arc<dyn Fn(u32) + Send + Sync>;

/// Wayland requests the backend issues
///
/// Requests take `&self` and may run while other listener callbacks are
/// being dispatched, including callbacks the request itself triggers.
pub trait WaylandProtocol {
    fn get_pointer(&self) -> NativeResult<ObjectId>;
    fn release_pointer(&self, pointer: ObjectId);
    fn get_keyboard(&self) -> NativeResult<ObjectId>;
    fn release_keyboard(&self, keyboard: ObjectId);

    /// `wl_registry.bind`
    fn bind(&self, name: u32, interface: &str, version: u32) -> NativeResult<ObjectId>;

    /// `wl_pointer.set_cursor`; `None` hides the cursor
    fn set_cursor(&self, pointer: ObjectId, serial: u32, surface: Option<ObjectId>);

    fn get_relative_pointer(&self, manager: ObjectId, pointer: ObjectId)
        -> NativeResult<ObjectId>;
    fn destroy_relative_pointer(&self, relative: ObjectId);

    /// Persistent `zwp_pointer_constraints_v1.lock_pointer` without a region
    fn lock_pointer(
        &self,
        constraints: ObjectId,
        surface: ObjectId,
        pointer: ObjectId,
    ) -> NativeResult<ObjectId>;
    fn destroy_locked_pointer(&self, locked: ObjectId);
}

/// Shared handle to the host's protocol bindings
pub type Protocol = Arc<dyn WaylandProtocol>;

/// Handles supplied at `start`
pub struct WaylandHandles {
    pub protocol: Protocol,
    /// Route `wl_registry` events to the listener
    pub add_registry_handler: Box<dyn FnOnce(Listener) -> NativeResult>,
    /// Route `wl_seat` and device events to the listener
    pub add_capabilities_handler: Box<dyn FnOnce(Listener) -> NativeResult>,
    pub notify: Notifier,
}

pub struct WaylandBackend {
    listener: Listener,
}

impl WaylandBackend {
    /// Listener shared with the host
    pub fn listener(&self) -> &Listener {
        &self.listener
    }
}

impl Backend for WaylandBackend {
    type Handles = WaylandHandles;
    type Event = u32;

    const NAME: &'static str = "wayland";

    fn init() -> Result<Self> {
        Ok(Self {
            listener: Listener::new(),
        })
    }

    fn start(&mut self, handles: WaylandHandles, config: &Config) -> Result<()> {
        let WaylandHandles {
            protocol,
            add_registry_handler,
            add_capabilities_handler,
            notify,
        } = handles;

        // the compositor sends the real keymap on keyboard focus
        let mut layout = Layout::new(&config.text);
        if config.keymap.is_configured() {
            layout.compile_names(&config.keymap)?;
        }

        // objects of an earlier session belong to the old protocol handle
        self.listener.detach();
        self.listener
            .attach(layout, config.text.enabled, protocol, notify);

        // hosts may replay globals from inside the registration
        if let Err(e) = native(
            add_registry_handler(self.listener.clone()),
            ErrorKind::WaylandListenerAdd,
        ) {
            self.listener.detach();
            return Err(e);
        }
        self.listener.lock().registration.registry = true;

        if let Err(e) = native(
            add_capabilities_handler(self.listener.clone()),
            ErrorKind::WaylandListenerAdd,
        ) {
            self.listener.detach();
            return Err(e);
        }
        self.listener.lock().registration.seat = true;

        info!("Wayland backend started");
        Ok(())
    }

    fn handle_event(&mut self, serial: &u32) -> Result<EventInfo> {
        Ok(self.listener.flush(*serial).unwrap_or_default())
    }

    fn mouse_grab(&mut self) -> Result<bool> {
        self.listener.grab()
    }

    fn mouse_ungrab(&mut self) -> Result<bool> {
        self.listener.ungrab()
    }

    /// Detach the listener and release the seat, capture and layout
    fn stop(&mut self) -> Result<()> {
        self.listener.detach();
        info!("Wayland backend stopped");
        Ok(())
    }

    fn clean(self) -> Result<()> {
        self.listener.detach();
        debug!("Wayland backend cleaned");
        Ok(())
    }

    fn capture_state(&self) -> CaptureState {
        self.listener.capture_state()
    }
}
