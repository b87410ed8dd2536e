// Global hotkeys via XGrabKey on the root window.
//
// Grabs are registered on the caller's thread so failures (BadAccess when
// another client owns the combo) surface immediately. Key presses are read
// by one dispatch thread that owns the event queue of the shared connection.

use std::sync::{Arc, Mutex, Once};
use std::thread;

use cursor_ruler_shared::hotkey::{Hotkey, Key, Modifiers};
use cursor_ruler_shared::{DisplayError, HotkeyCallback};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, ConnectionExt as _, GrabMode, Keycode, ModMask};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

/// Lock and NumLock (Mod2) must not stop a hotkey from firing.
const IGNORED_MASKS: [u16; 4] = [0, LOCK, MOD2, LOCK | MOD2];
const LOCK: u16 = 1 << 1;
const MOD2: u16 = 1 << 4;
const RELEVANT: u16 = !(LOCK | MOD2) & 0x00ff;

struct Binding {
    keycode: Keycode,
    modifiers: u16,
    callback: HotkeyCallback,
}

pub struct HotkeyDispatcher {
    bindings: Arc<Mutex<Vec<Binding>>>,
    started: Once,
}

impl HotkeyDispatcher {
    pub fn new() -> Self {
        Self {
            bindings: Arc::new(Mutex::new(Vec::new())),
            started: Once::new(),
        }
    }

    pub fn register(
        &self,
        conn: &Arc<RustConnection>,
        root: xproto::Window,
        hotkey: &Hotkey,
        callback: HotkeyCallback,
    ) -> Result<(), DisplayError> {
        let unavailable = |reason: String| DisplayError::HotkeyUnavailable(format!("{hotkey}: {reason}"));

        let keycode = keycode_for(conn, keysym(hotkey.key))?
            .ok_or_else(|| unavailable("key is not on the keyboard map".into()))?;
        let modifiers = modifier_mask(hotkey.modifiers);

        for extra in IGNORED_MASKS {
            conn.grab_key(
                true,
                root,
                ModMask::from(modifiers | extra),
                keycode,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )
            .map_err(|err| unavailable(err.to_string()))?
            .check()
            .map_err(|err| unavailable(err.to_string()))?;
        }

        self.bindings
            .lock()
            .map_err(|_| unavailable("binding table poisoned".into()))?
            .push(Binding {
                keycode,
                modifiers,
                callback,
            });
        tracing::debug!(%hotkey, keycode, "grabbed hotkey");

        self.started.call_once(|| spawn_dispatch(Arc::clone(conn), Arc::clone(&self.bindings)));
        Ok(())
    }
}

fn spawn_dispatch(conn: Arc<RustConnection>, bindings: Arc<Mutex<Vec<Binding>>>) {
    let spawned = thread::Builder::new()
        .name("x11-hotkeys".into())
        .spawn(move || loop {
            match conn.wait_for_event() {
                Ok(Event::KeyPress(event)) => {
                    let state = u16::from(event.state) & RELEVANT;
                    let Ok(bindings) = bindings.lock() else {
                        break;
                    };
                    bindings
                        .iter()
                        .filter(|b| b.keycode == event.detail && b.modifiers == state)
                        .for_each(|b| (b.callback)());
                }
                Ok(Event::Error(err)) => tracing::debug!(?err, "X11 request failed"),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!("hotkey dispatch stopped: {err}");
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        tracing::error!("failed to start hotkey thread: {err}");
    }
}

fn modifier_mask(modifiers: Modifiers) -> u16 {
    let mut mask = 0;
    if modifiers.shift {
        mask |= u16::from(ModMask::SHIFT);
    }
    if modifiers.ctrl {
        mask |= u16::from(ModMask::CONTROL);
    }
    if modifiers.alt {
        mask |= u16::from(ModMask::M1);
    }
    if modifiers.super_key {
        mask |= u16::from(ModMask::M4);
    }
    mask
}

fn keysym(key: Key) -> u32 {
    match key {
        Key::Char(c) => u32::from(c),
        Key::Space => 0x0020,
        Key::Escape => 0xff1b,
        Key::Enter => 0xff0d,
        Key::Tab => 0xff09,
        Key::Home => 0xff50,
        Key::End => 0xff57,
        Key::PageUp => 0xff55,
        Key::PageDown => 0xff56,
        Key::Left => 0xff51,
        Key::Up => 0xff52,
        Key::Right => 0xff53,
        Key::Down => 0xff54,
        Key::F(n) => 0xffbe + u32::from(n.saturating_sub(1)),
    }
}

fn keycode_for(conn: &RustConnection, keysym: u32) -> Result<Option<Keycode>, DisplayError> {
    let setup = conn.setup();
    let (min, max) = (setup.min_keycode, setup.max_keycode);
    let mapping = conn
        .get_keyboard_mapping(min, max - min + 1)
        .map_err(|err| DisplayError::request("GetKeyboardMapping", err))?
        .reply()
        .map_err(|err| DisplayError::request("GetKeyboardMapping", err))?;

    let per_keycode = usize::from(mapping.keysyms_per_keycode);
    if per_keycode == 0 {
        return Ok(None);
    }
    Ok(mapping
        .keysyms
        .chunks(per_keycode)
        .position(|syms| syms.contains(&keysym))
        .and_then(|index| u8::try_from(index).ok())
        .map(|offset| min + offset))
}
