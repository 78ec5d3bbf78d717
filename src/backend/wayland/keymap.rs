//! Keymap delivery over shared memory
//!
//! `wl_keyboard.keymap` hands over a file descriptor and a size. The file is
//! mapped read-only and holds a NUL-terminated XKB v1 text keymap.

use std::fs::File;
use std::os::fd::OwnedFd;

use log::warn;
use memmap2::MmapOptions;

use crate::error::{Error, ErrorKind, Result};

/// `WL_KEYBOARD_KEYMAP_FORMAT_NO_KEYMAP`
pub const FORMAT_NO_KEYMAP: u32 = 0;
/// `WL_KEYBOARD_KEYMAP_FORMAT_XKB_V1`
pub const FORMAT_XKB_V1: u32 = 1;

/// Read the keymap text; the descriptor is closed on return
pub fn read_keymap(format: u32, fd: OwnedFd, size: u32) -> Result<String> {
    if format != FORMAT_XKB_V1 {
        return Err(Error::throw(ErrorKind::WaylandKeymapFormat));
    }

    let file = File::from(fd);

    // SAFETY: the compositor keeps the keymap file unchanged while mapped
    let map = unsafe { MmapOptions::new().len(size as usize).map(&file) };
    let map = match map {
        Ok(map) => map,
        Err(e) => {
            warn!("Keymap mmap failed ({} bytes): {}", size, e);
            return Err(Error::throw(ErrorKind::WaylandKeymapMap));
        }
    };

    let bytes = match map.iter().position(|&b| b == 0) {
        Some(end) => &map[..end],
        None => &map[..],
    };
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_owned()),
        Err(_) => Err(Error::throw(ErrorKind::XkbKeymapNew)),
    }
}
