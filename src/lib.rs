//! evnorm - cross-platform input event normalization
//!
//! Translates native input notifications from X11, Wayland, Win32 and AppKit
//! into one platform-independent [`EventInfo`] record. The host owns windows
//! and the event loop; evnorm only translates what it is handed.
//!
//! ```ignore
//! let mut input = Context::<X11Backend>::with_config(Config::load())?;
//! input.start(handles)?;
//! let info = input.handle_event(&event)?;
//! ```

mod names;

pub mod backend;
pub mod capture;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod fixed;
pub mod keycodes;
pub mod text;

pub use backend::{Backend, NativeError, NativeResult};
pub use capture::CaptureState;
pub use config::Config;
pub use context::Context;
pub use error::{Error, ErrorInfo, ErrorKind, Result};
pub use event::{EventCode, EventInfo, EventState};
pub use fixed::Fixed;

/// Initialize `env_logger` with `RUST_LOG`, falling back to `default_filter`
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logger(default_filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init();
}
