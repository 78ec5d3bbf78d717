//! Text composition pipeline
//!
//! [`Layout`] owns the xkbcommon objects of one backend: the context, the
//! keymap/state pair and the optional compose table/state pair. Field order
//! fixes destruction order (states before what they were built from).
//!
//! Two policies turn a physical key into UTF-8:
//! - simple: ask the keymap state for the key's current symbol text
//! - composing: feed the keysym to the compose state machine first, which
//!   handles dead keys and multi-key sequences across several presses

pub mod locale;

use std::ffi::OsStr;

use log::{debug, info};
use smol_str::SmolStr;
use xkbcommon::xkb;
use xkbcommon::xkb::compose;

use crate::config::{KeymapConfig, TextConfig};
use crate::error::{Error, ErrorKind, Result};
use crate::event::EventState;

/// Longest text held inline by `SmolStr` without a heap allocation
const INLINE_CAP: usize = 23;

/// Copy a UTF-8 fragment into an owned event string
///
/// An empty fragment means "no text". Longer fragments reserve their buffer
/// fallibly so an allocation failure is reported instead of aborting.
pub fn fragment(utf8: &str) -> Result<Option<SmolStr>> {
    if utf8.is_empty() {
        return Ok(None);
    }
    if utf8.len() <= INLINE_CAP {
        return Ok(Some(SmolStr::new(utf8)));
    }

    let mut owned = String::new();
    owned
        .try_reserve_exact(utf8.len())
        .map_err(|_| Error::throw(ErrorKind::Alloc))?;
    owned.push_str(utf8);
    Ok(Some(SmolStr::from(owned)))
}

/// Keymap and the state bound to it, always replaced together
struct Keyboard {
    state: xkb::State,
    keymap: xkb::Keymap,
}

struct Compose {
    state: compose::State,
    // released after the state built from it
    #[allow(dead_code)]
    table: compose::Table,
}

/// Keyboard-layout state of one backend
pub struct Layout {
    compose: Option<Compose>,
    keyboard: Option<Keyboard>,
    context: xkb::Context,
}

impl Layout {
    /// Create the layout context and, if enabled, load the locale's compose table
    pub fn new(config: &TextConfig) -> Self {
        let mut layout = Self {
            compose: None,
            keyboard: None,
            context: xkb::Context::new(xkb::CONTEXT_NO_FLAGS),
        };

        if config.compose {
            let locale = if config.locale.is_empty() {
                locale::detect()
            } else {
                config.locale.clone().into()
            };
            layout.load_compose_locale(&locale);
        }

        layout
    }

    pub fn context(&self) -> &xkb::Context {
        &self.context
    }

    /// Load the system compose table for a locale
    ///
    /// A locale without composition rules is not an error; text then always
    /// uses the simple policy.
    pub fn load_compose_locale(&mut self, locale: &OsStr) -> bool {
        match compose::Table::new_from_locale(&self.context, locale, compose::COMPILE_NO_FLAGS) {
            Ok(table) => {
                debug!("Compose table loaded (locale={:?})", locale);
                self.set_compose_table(table);
                true
            }
            Err(()) => {
                debug!("No compose table for locale {:?}", locale);
                self.compose = None;
                false
            }
        }
    }

    /// Load compose rules from an in-memory Compose file
    pub fn load_compose_buffer(&mut self, buffer: &str, locale: &str) -> bool {
        if locale.contains('\0') {
            debug!("Compose locale {:?} contains NUL", locale);
            return false;
        }
        match compose::Table::new_from_buffer(
            &self.context,
            buffer,
            locale,
            compose::FORMAT_TEXT_V1,
            compose::COMPILE_NO_FLAGS,
        ) {
            Ok(table) => {
                self.set_compose_table(table);
                true
            }
            Err(()) => {
                debug!("Compose buffer rejected");
                false
            }
        }
    }

    fn set_compose_table(&mut self, table: compose::Table) {
        let state = compose::State::new(&table, compose::STATE_NO_FLAGS);
        self.compose = Some(Compose { state, table });
    }

    pub fn has_compose(&self) -> bool {
        self.compose.is_some()
    }

    pub fn has_keymap(&self) -> bool {
        self.keyboard.is_some()
    }

    pub fn keymap(&self) -> Option<&xkb::Keymap> {
        self.keyboard.as_ref().map(|k| &k.keymap)
    }

    /// Replace the keymap/state pair
    ///
    /// Callers build and validate the new pair first; the old one is
    /// released only here.
    pub fn replace(&mut self, keymap: xkb::Keymap, state: xkb::State) {
        self.keyboard = Some(Keyboard { state, keymap });
    }

    /// Replace the keymap and derive a fresh state from it
    pub fn replace_keymap(&mut self, keymap: xkb::Keymap) {
        let state = xkb::State::new(&keymap);
        self.replace(keymap, state);
    }

    /// Compile an XKB v1 text keymap
    pub fn compile_string(&mut self, text: String) -> Result<()> {
        let keymap = xkb::Keymap::new_from_string(
            &self.context,
            text,
            xkb::KEYMAP_FORMAT_TEXT_V1,
            xkb::COMPILE_NO_FLAGS,
        )
        .ok_or_else(|| Error::throw(ErrorKind::XkbKeymapNew))?;

        self.replace_keymap(keymap);
        debug!("Keymap replaced from text");
        Ok(())
    }

    /// Compile a keymap from RMLVO names
    pub fn compile_names(&mut self, names: &KeymapConfig) -> Result<()> {
        let options = if names.options.is_empty() {
            None
        } else {
            Some(names.options.clone())
        };

        let keymap = xkb::Keymap::new_from_names(
            &self.context,
            &names.rules,
            &names.model,
            &names.layout,
            &names.variant,
            options,
            xkb::COMPILE_NO_FLAGS,
        )
        .ok_or_else(|| Error::throw(ErrorKind::XkbKeymapNew))?;

        self.replace_keymap(keymap);
        info!(
            "Keymap compiled (layout={}, variant={})",
            if names.layout.is_empty() { "default" } else { &names.layout },
            if names.variant.is_empty() { "default" } else { &names.variant },
        );
        Ok(())
    }

    /// Drop the keymap/state pair and the compose pair
    pub fn release(&mut self) {
        self.compose = None;
        self.keyboard = None;
    }

    /// Update modifiers and groups as reported by the windowing system
    pub fn update_mask(
        &mut self,
        depressed_mods: u32,
        latched_mods: u32,
        locked_mods: u32,
        depressed_layout: u32,
        latched_layout: u32,
        locked_layout: u32,
    ) {
        if let Some(keyboard) = self.keyboard.as_mut() {
            keyboard.state.update_mask(
                depressed_mods,
                latched_mods,
                locked_mods,
                depressed_layout,
                latched_layout,
                locked_layout,
            );
        }
    }

    /// Keysym the key currently produces
    pub fn keysym(&self, keycode: u32) -> Option<xkb::Keysym> {
        self.keyboard
            .as_ref()
            .map(|k| k.state.key_get_one_sym(xkb::Keycode::new(keycode)))
    }

    /// Text for a key transition
    ///
    /// Releases never produce text. Presses use the composing policy when a
    /// compose table is loaded, the simple policy otherwise.
    pub fn key_text(&mut self, keycode: u32, state: EventState) -> Result<Option<SmolStr>> {
        if state != EventState::Press {
            return Ok(None);
        }
        if self.compose.is_some() {
            self.composed_text(keycode)
        } else {
            self.simple_text(keycode)
        }
    }

    /// Simple policy: the key's current symbol text
    pub fn simple_text(&self, keycode: u32) -> Result<Option<SmolStr>> {
        match self.keyboard.as_ref() {
            Some(keyboard) => {
                let utf8 = keyboard.state.key_get_utf8(xkb::Keycode::new(keycode));
                fragment(&utf8)
            }
            None => Ok(None),
        }
    }

    /// Composing policy
    ///
    /// The compose state accumulates across presses and is never reset here.
    pub fn composed_text(&mut self, keycode: u32) -> Result<Option<SmolStr>> {
        let Some(keysym) = self.keysym(keycode) else {
            return Ok(None);
        };
        let Some(compose) = self.compose.as_mut() else {
            return self.simple_text(keycode);
        };

        match compose.state.feed(keysym) {
            compose::FeedResult::Ignored => Ok(None),
            compose::FeedResult::Accepted => match compose.state.status() {
                compose::Status::Nothing => self.simple_text(keycode),
                compose::Status::Composed => match compose.state.utf8() {
                    Some(utf8) => fragment(&utf8),
                    None => Ok(None),
                },
                compose::Status::Composing | compose::Status::Cancelled => Ok(None),
            },
        }
    }
}

impl std::fmt::Debug for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layout")
            .field("keymap", &self.has_keymap())
            .field("compose", &self.has_compose())
            .finish()
    }
}
