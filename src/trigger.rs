//! Trigger sinks: what happens when the marker is presented.
//!
//! The default sink presses and releases a key through the X11 `XTEST`
//! extension, so the focused application (e.g. a slide viewer) receives it
//! as if typed on the keyboard.

use crate::{
    error::{AppError, Result},
    presence::TriggerEvent,
};
use log::{debug, info};
use x11rb::{
    connection::Connection,
    protocol::{
        xproto::{ConnectionExt as _, Keycode, Keysym, Window, KEY_PRESS_EVENT, KEY_RELEASE_EVENT},
        xtest::ConnectionExt as _,
    },
    rust_connection::RustConnection,
};

/// Consumer of trigger events
pub trait TriggerSink {
    /// Handle one trigger
    fn emit(&mut self, event: &TriggerEvent) -> Result<()>;

    /// Sink name for logging
    fn name(&self) -> &str;
}

/// Sink that only logs triggers
#[derive(Debug, Default)]
pub struct LogSink;

impl TriggerSink for LogSink {
    fn emit(&mut self, event: &TriggerEvent) -> Result<()> {
        info!("Trigger #{} (key injection disabled)", event.sequence);
        Ok(())
    }

    fn name(&self) -> &str {
        "LogSink"
    }
}

/// Key press injection for X11
pub struct X11KeyInjector {
    connection: RustConnection,
    root: Window,
    keycode: Keycode,
    key: String,
}

impl X11KeyInjector {
    /// Connect to the X server and resolve `key` to a keycode
    pub fn new(key: &str) -> Result<Self> {
        info!("Initializing X11 key injection for '{}'", key);

        let keysym = keysym_from_name(key)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown key name: {key}")))?;

        let (connection, screen_num) = RustConnection::connect(None)
            .map_err(|e| AppError::X11(format!("Failed to connect to X11: {e}")))?;

        let root = connection
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| AppError::X11("Failed to get screen".to_string()))?
            .root;

        let version = connection
            .xtest_get_version(2, 2)
            .map_err(|e| AppError::X11(format!("XTEST extension unavailable: {e}")))?
            .reply()
            .map_err(|e| AppError::X11(format!("Failed to query XTEST version: {e}")))?;
        debug!("XTEST version {}.{}", version.major_version, version.minor_version);

        let keycode = find_keycode(&connection, keysym)?;
        info!("Key '{}' mapped to keycode {}", key, keycode);

        Ok(Self {
            connection,
            root,
            keycode,
            key: key.to_string(),
        })
    }

    /// Press and release the configured key
    pub fn press(&self) -> Result<()> {
        for event_type in [KEY_PRESS_EVENT, KEY_RELEASE_EVENT] {
            self.connection
                .xtest_fake_input(event_type, self.keycode, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
                .map_err(|e| AppError::KeyInjection(format!("Failed to send fake input: {e}")))?;
        }

        self.connection
            .flush()
            .map_err(|e| AppError::KeyInjection(format!("Failed to flush connection: {e}")))?;

        Ok(())
    }
}

impl TriggerSink for X11KeyInjector {
    fn emit(&mut self, event: &TriggerEvent) -> Result<()> {
        debug!("Pressing '{}' for trigger #{}", self.key, event.sequence);
        self.press()
    }

    fn name(&self) -> &str {
        "X11KeyInjector"
    }
}

/// Find a keycode whose mapping contains `keysym`
fn find_keycode(connection: &RustConnection, keysym: Keysym) -> Result<Keycode> {
    let setup = connection.setup();
    let min_keycode = setup.min_keycode;
    let count = setup.max_keycode.saturating_sub(min_keycode).saturating_add(1);

    let mapping = connection
        .get_keyboard_mapping(min_keycode, count)
        .map_err(|e| AppError::X11(format!("Failed to request keyboard mapping: {e}")))?
        .reply()
        .map_err(|e| AppError::X11(format!("Failed to get keyboard mapping: {e}")))?;

    let per_keycode = usize::from(mapping.keysyms_per_keycode);
    if per_keycode == 0 {
        return Err(AppError::X11("Empty keyboard mapping".to_string()));
    }

    mapping
        .keysyms
        .chunks(per_keycode)
        .position(|syms| syms.contains(&keysym))
        .and_then(|index| u8::try_from(index).ok())
        .map(|offset| min_keycode.saturating_add(offset))
        .ok_or_else(|| AppError::KeyInjection(format!("No keycode produces keysym {keysym:#x}")))
}

/// Resolve an X11 keysym name (or a single printable character) to its value
#[must_use]
pub fn keysym_from_name(name: &str) -> Option<Keysym> {
    let keysym = match name {
        "space" => 0x0020,
        "Return" | "Enter" => 0xff0d,
        "Tab" => 0xff09,
        "Escape" => 0xff1b,
        "BackSpace" => 0xff08,
        "Left" => 0xff51,
        "Up" => 0xff52,
        "Right" => 0xff53,
        "Down" => 0xff54,
        "Prior" | "Page_Up" => 0xff55,
        "Next" | "Page_Down" => 0xff56,
        "Home" => 0xff50,
        "End" => 0xff57,
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                // Latin-1 keysyms equal their code points
                (Some(c), None) if (' '..='~').contains(&c) => Keysym::from(c),
                _ => return None,
            }
        }
    };
    Some(keysym)
}
