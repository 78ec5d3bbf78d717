//! Error taxonomy
//!
//! A closed set of error kinds shared by every backend, plus the throw
//! protocol: constructing an [`Error`] records where it was raised, logs it,
//! and (with the `abort-on-error` feature) aborts the process.

use std::panic::Location;

use log::debug;
use thiserror::Error;

use crate::names::named_enum;

named_enum! {
    /// Every failure the crate can report
    ///
    /// `Ok` is the sentinel carried by [`ErrorInfo::ok`]; it is never thrown.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum ErrorKind: u16 {
        #[default]
        Ok => "no error",

        // generic
        Null => "null pointer",
        Alloc => "failed malloc",
        Bounds => "out-of-bounds index",
        Domain => "invalid domain",
        InvalidDescriptor => "invalid file descriptor",

        // event model validation
        EventCodeInvalid => "invalid event code",
        EventStateInvalid => "invalid event state",

        // keyboard layout
        XkbKeymapNew => "couldn't compile xkb keymap",
        XkbStateNew => "couldn't create xkb state",

        // x11
        X11XkbSetup => "couldn't setup xkb extension",
        X11XkbDeviceGet => "couldn't get xkb device id",
        X11XkbKeymapNew => "couldn't get xkb keymap from device",
        X11XkbStateNew => "couldn't get xkb state from device",
        X11XkbSelectEvents => "couldn't select xkb events",
        X11XfixesVersion => "couldn't query xfixes version",
        X11XfixesHide => "couldn't hide cursor",
        X11XfixesShow => "couldn't show cursor",
        X11Grab => "couldn't grab pointer",
        X11Ungrab => "couldn't ungrab pointer",
        X11XinputGetPointer => "couldn't get xinput client pointer",
        X11XinputSelectEvents => "couldn't select xinput events",

        // wayland
        WaylandRequest => "couldn't send wayland request",
        WaylandPointerGet => "couldn't get wayland pointer",
        WaylandKeyboardGet => "couldn't get wayland keyboard",
        WaylandListenerAdd => "couldn't add wayland listener",
        WaylandKeymapFormat => "unsupported wayland keymap format",
        WaylandKeymapMap => "couldn't map wayland keymap",
        WaylandPointerMissing => "wayland pointer missing",
        WaylandPointerRelativeManagerMissing => "wayland relative pointer manager missing",
        WaylandPointerConstraintsManagerMissing => "wayland pointer constraints manager missing",
        WaylandPointerSurfaceMissing => "wayland pointer surface missing",
        WaylandPointerRelativeGet => "couldn't get wayland relative pointer",
        WaylandPointerLockedGet => "couldn't get wayland locked pointer",
        WaylandPointerRelativeMissing => "wayland relative pointer missing",
        WaylandPointerLockedMissing => "wayland locked pointer missing",

        // win32
        WinMouseGrab => "couldn't grab win32 mouse",
        WinMouseUngrab => "couldn't ungrab win32 mouse",
        WinWindowRectGet => "couldn't get win32 window rect",
        WinCursorClip => "couldn't clip win32 cursor",
        WinCursorUnclip => "couldn't unclip win32 cursor",
        WinMouseRawGet => "couldn't get win32 raw mouse input",

        // appkit
        AppKitCursorHide => "couldn't hide appkit cursor",
        AppKitCursorShow => "couldn't show appkit cursor",
        AppKitMouseAssociate => "couldn't (dis)associate appkit mouse and cursor",
    }
}

impl ErrorKind {
    /// True for the `Ok` sentinel
    pub fn is_ok(self) -> bool {
        self == ErrorKind::Ok
    }
}

/// A thrown error: its kind plus the source location that raised it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} ({}:{})", location.file(), location.line())]
pub struct Error {
    kind: ErrorKind,
    location: &'static Location<'static>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Raise an error of the given kind at the caller's location
    #[track_caller]
    pub fn throw(kind: ErrorKind) -> Self {
        let location = Location::caller();
        debug!(
            "evnorm error: {} ({}:{})",
            kind,
            location.file(),
            location.line()
        );

        #[cfg(feature = "abort-on-error")]
        std::process::abort();

        #[cfg(not(feature = "abort-on-error"))]
        Self { kind, location }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Where the error was raised
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl From<ErrorKind> for Error {
    #[track_caller]
    fn from(kind: ErrorKind) -> Self {
        Error::throw(kind)
    }
}

/// Plain error record for hosts that poll the last outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub file: &'static str,
    pub line: u32,
}

impl ErrorInfo {
    /// The "no error" record
    pub const fn ok() -> Self {
        Self {
            kind: ErrorKind::Ok,
            file: "",
            line: 0,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.kind.is_ok()
    }

    /// Record the outcome of an operation
    pub fn observe<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self::from(e),
        }
    }
}

impl Default for ErrorInfo {
    fn default() -> Self {
        Self::ok()
    }
}

impl From<&Error> for ErrorInfo {
    fn from(e: &Error) -> Self {
        Self {
            kind: e.kind,
            file: e.location.file(),
            line: e.location.line(),
        }
    }
}

#[cfg(all(test, not(feature = "abort-on-error")))]
mod tests {
    use super::*;

    #[test]
    fn test_names_indexed_by_value() {
        assert_eq!(ErrorKind::Ok.index(), 0);
        assert_eq!(ErrorKind::Null.name(), "null pointer");
        assert_eq!(ErrorKind::name_of(ErrorKind::Alloc.index()), "failed malloc");
        assert_eq!(ErrorKind::WinMouseGrab.name(), "couldn't grab win32 mouse");
    }

    #[test]
    fn test_out_of_range_name_is_invalid() {
        assert_eq!(ErrorKind::name_of(ErrorKind::COUNT), "invalid");
        assert_eq!(ErrorKind::name_of(usize::MAX), "invalid");
        assert_eq!(ErrorKind::from_index(ErrorKind::COUNT), None);
    }

    #[test]
    fn test_every_kind_round_trips_through_index() {
        for (i, kind) in ErrorKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(ErrorKind::from_index(i), Some(*kind));
            assert_ne!(kind.name(), "invalid");
        }
    }

    #[test]
    fn test_throw_records_caller_location() {
        let line = line!() + 1;
        let err = Error::throw(ErrorKind::Domain);
        assert_eq!(err.kind(), ErrorKind::Domain);
        assert_eq!(err.location().line(), line);
        assert!(err.location().file().ends_with("error.rs"));
        assert!(err.to_string().starts_with("invalid domain ("));
    }

    #[test]
    fn test_error_info_observe() {
        let ok: Result<()> = Ok(());
        assert!(ErrorInfo::observe(&ok).is_ok());

        let failed: Result<()> = Err(ErrorKind::Bounds.into());
        let info = ErrorInfo::observe(&failed);
        assert_eq!(info.kind, ErrorKind::Bounds);
        assert!(info.line > 0);
        assert!(!info.is_ok());
    }
}
