//! Backend contract
//!
//! Each native event source implements [`Backend`]. The host owns the event
//! loop and the native handles; a backend only translates what it is given.
//! Native API calls go through small collaborator traits (one per platform)
//! so that hosts plug in their own bindings and tests plug in fakes.

pub mod appkit;
#[cfg(unix)]
pub mod wayland;
pub mod win32;
pub mod x11;

use log::warn;
use smol_str::SmolStr;
use thiserror::Error;

use crate::capture::CaptureState;
use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::event::{EventCode, EventInfo, EventState};

/// Failure reported by a native collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct NativeError(pub String);

impl NativeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

pub type NativeResult<T = ()> = std::result::Result<T, NativeError>;

/// Lifecycle shared by every platform backend
///
/// Order: `init → start → handle_event* → mouse_grab/mouse_ungrab* → stop → clean`.
pub trait Backend: Sized {
    /// Native handles supplied by the host at `start`
    type Handles;
    /// Native event value passed to `handle_event`
    type Event: ?Sized;

    /// Short name for logs
    const NAME: &'static str;

    /// Allocate backend-private state without touching native handles
    fn init() -> Result<Self>;

    /// Bind native handles and create the layout state
    ///
    /// A failing step releases everything acquired earlier in the same call.
    fn start(&mut self, handles: Self::Handles, config: &Config) -> Result<()>;

    /// Translate one native event (empty record if it carries nothing)
    fn handle_event(&mut self, event: &Self::Event) -> Result<EventInfo>;

    /// Capture the mouse; `Ok(false)` if it already was
    fn mouse_grab(&mut self) -> Result<bool>;

    /// Release the mouse; `Ok(false)` if it already was
    fn mouse_ungrab(&mut self) -> Result<bool>;

    /// Release layout and compose resources
    fn stop(&mut self) -> Result<()>;

    /// Release the backend itself
    fn clean(self) -> Result<()> {
        Ok(())
    }

    fn capture_state(&self) -> CaptureState;
}

/// Map a native failure to a named error kind
#[track_caller]
pub(crate) fn native<T>(result: NativeResult<T>, kind: ErrorKind) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("{}: {}", kind, e);
            Err(Error::throw(kind))
        }
    }
}

/// Key record; an unmapped key still carries its text, if any
pub(crate) fn key_event(code: EventCode, state: EventState, text: Option<SmolStr>) -> EventInfo {
    if code.is_none() {
        match text {
            Some(text) => EventInfo::text_only(text),
            None => EventInfo::empty(),
        }
    } else {
        EventInfo::switch(code, state).with_text(text)
    }
}

/// Wheel record for a signed tick count, positive meaning up
pub(crate) fn wheel_ticks(ticks_up: i64) -> EventInfo {
    let steps = u32::try_from(ticks_up.unsigned_abs()).unwrap_or(u32::MAX);
    match ticks_up.signum() {
        1 => EventInfo::wheel(EventCode::MouseWheelUp, steps),
        -1 => EventInfo::wheel(EventCode::MouseWheelDown, steps),
        _ => EventInfo::empty(),
    }
}

/// Wheel record for a continuous scroll delta, positive meaning up
///
/// Any nonzero delta is exactly one step in its direction; magnitudes are
/// not accumulated.
pub(crate) fn wheel_continuous(delta_up: f64) -> EventInfo {
    if delta_up > 0.0 {
        wheel_ticks(1)
    } else if delta_up < 0.0 {
        wheel_ticks(-1)
    } else {
        EventInfo::empty()
    }
}
