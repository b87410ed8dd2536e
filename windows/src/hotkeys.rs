// Global hotkeys using Win32 RegisterHotKey API.
//
// A hotkey registered without a window posts WM_HOTKEY to the registering
// thread's queue, so each combo gets a small thread that registers it,
// reports the result back and then blocks in GetMessageW.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use cursor_ruler_shared::hotkey::{Hotkey, Key, Modifiers};
use cursor_ruler_shared::{DisplayError, HotkeyCallback};
use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT,
    MOD_SHIFT, MOD_WIN, VIRTUAL_KEY, VK_DOWN, VK_END, VK_ESCAPE, VK_F1, VK_HOME, VK_LEFT,
    VK_NEXT, VK_PRIOR, VK_RETURN, VK_RIGHT, VK_SPACE, VK_TAB, VK_UP,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetMessageW, PostThreadMessageW, MSG, WM_HOTKEY, WM_QUIT,
};

const HOTKEY_ID: i32 = 1;

/// A registered hotkey and the thread listening for it.
pub struct HotkeyThread {
    thread_id: u32,
    handle: Option<JoinHandle<()>>,
}

impl HotkeyThread {
    pub fn spawn(hotkey: &Hotkey, callback: HotkeyCallback) -> Result<Self, DisplayError> {
        let label = hotkey.to_string();
        let modifiers = modifier_flags(hotkey.modifiers);
        let vk = u32::from(virtual_key(hotkey.key).0);
        let (ready_tx, ready_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name(format!("hotkey {label}"))
            .spawn(move || {
                let thread_id = unsafe { GetCurrentThreadId() };
                let registered = unsafe { RegisterHotKey(None, HOTKEY_ID, modifiers, vk) };
                let ok = registered.is_ok();
                let _ = ready_tx.send(registered.map(|()| thread_id).map_err(|e| e.to_string()));
                if !ok {
                    return;
                }

                let mut msg = MSG::default();
                // GetMessageW returns 0 on WM_QUIT and -1 on error.
                while unsafe { GetMessageW(&mut msg, None, 0, 0) }.0 > 0 {
                    if msg.message == WM_HOTKEY && msg.wParam.0 == HOTKEY_ID as usize {
                        callback();
                    }
                }
                unsafe {
                    let _ = UnregisterHotKey(None, HOTKEY_ID);
                }
            })
            .map_err(|err| DisplayError::HotkeyUnavailable(format!("{label}: {err}")))?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                tracing::debug!(hotkey = %label, "registered hotkey");
                Ok(Self {
                    thread_id,
                    handle: Some(handle),
                })
            }
            Ok(Err(reason)) => {
                let _ = handle.join();
                Err(DisplayError::HotkeyUnavailable(format!("{label}: {reason}")))
            }
            Err(_) => {
                let _ = handle.join();
                Err(DisplayError::HotkeyUnavailable(format!(
                    "{label}: hotkey thread exited"
                )))
            }
        }
    }
}

impl Drop for HotkeyThread {
    fn drop(&mut self) {
        unsafe {
            let _ = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn modifier_flags(modifiers: Modifiers) -> HOT_KEY_MODIFIERS {
    let mut flags = MOD_NOREPEAT.0;
    if modifiers.ctrl {
        flags |= MOD_CONTROL.0;
    }
    if modifiers.shift {
        flags |= MOD_SHIFT.0;
    }
    if modifiers.alt {
        flags |= MOD_ALT.0;
    }
    if modifiers.super_key {
        flags |= MOD_WIN.0;
    }
    HOT_KEY_MODIFIERS(flags)
}

fn virtual_key(key: Key) -> VIRTUAL_KEY {
    match key {
        // Letter VKs are the uppercase ASCII codes, digits their ASCII codes.
        Key::Char(c) => VIRTUAL_KEY(c.to_ascii_uppercase() as u16),
        Key::Space => VK_SPACE,
        Key::Escape => VK_ESCAPE,
        Key::Enter => VK_RETURN,
        Key::Tab => VK_TAB,
        Key::Home => VK_HOME,
        Key::End => VK_END,
        Key::PageUp => VK_PRIOR,
        Key::PageDown => VK_NEXT,
        Key::Up => VK_UP,
        Key::Down => VK_DOWN,
        Key::Left => VK_LEFT,
        Key::Right => VK_RIGHT,
        Key::F(n) => VIRTUAL_KEY(VK_F1.0 + u16::from(n.saturating_sub(1))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_map_to_uppercase_virtual_keys() {
        assert_eq!(virtual_key(Key::Char('q')).0, u16::from(b'Q'));
        assert_eq!(virtual_key(Key::Char('7')).0, u16::from(b'7'));
        assert_eq!(virtual_key(Key::F(12)).0, VK_F1.0 + 11);
    }

    #[test]
    fn modifiers_never_repeat() {
        let flags = modifier_flags(Modifiers {
            ctrl: true,
            shift: true,
            ..Modifiers::default()
        });
        assert_eq!(flags.0, MOD_NOREPEAT.0 | MOD_CONTROL.0 | MOD_SHIFT.0);
    }
}
