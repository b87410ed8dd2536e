// Platform-neutral global hotkey description, written as "Ctrl+Shift+Space".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub super_key: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Lowercase ASCII letter or digit.
    Char(char),
    Space,
    Escape,
    Enter,
    Tab,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    /// Function key F1..F12.
    F(u8),
}

impl Key {
    fn parse(name: &str) -> Option<Key> {
        let lower = name.to_ascii_lowercase();
        let key = match lower.as_str() {
            "space" => Key::Space,
            "escape" | "esc" => Key::Escape,
            "enter" | "return" => Key::Enter,
            "tab" => Key::Tab,
            "home" => Key::Home,
            "end" => Key::End,
            "pageup" | "prior" => Key::PageUp,
            "pagedown" | "next" => Key::PageDown,
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphanumeric() => Key::Char(c),
                    (Some('f'), Some(_)) => {
                        let n: u8 = lower[1..].parse().ok()?;
                        if !(1..=12).contains(&n) {
                            return None;
                        }
                        Key::F(n)
                    }
                    _ => return None,
                }
            }
        };
        Some(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Key::Space => f.write_str("Space"),
            Key::Escape => f.write_str("Escape"),
            Key::Enter => f.write_str("Enter"),
            Key::Tab => f.write_str("Tab"),
            Key::Home => f.write_str("Home"),
            Key::End => f.write_str("End"),
            Key::PageUp => f.write_str("PageUp"),
            Key::PageDown => f.write_str("PageDown"),
            Key::Up => f.write_str("Up"),
            Key::Down => f.write_str("Down"),
            Key::Left => f.write_str("Left"),
            Key::Right => f.write_str("Right"),
            Key::F(n) => write!(f, "F{n}"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HotkeyParseError {
    #[error("hotkey is empty")]
    Empty,
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

/// A modifier set plus one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl Hotkey {
    /// Ctrl+Shift+Space toggles the overlay.
    pub fn default_toggle() -> Self {
        Self {
            modifiers: Modifiers {
                ctrl: true,
                shift: true,
                ..Modifiers::default()
            },
            key: Key::Space,
        }
    }

    /// Ctrl+Shift+Q quits. Ctrl+Shift+Escape is reserved for Task Manager on
    /// Windows and cannot be registered there.
    pub fn default_quit() -> Self {
        Self {
            key: Key::Char('q'),
            ..Self::default_toggle()
        }
    }
}

impl FromStr for Hotkey {
    type Err = HotkeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some((key_name, modifier_names)) = parts.split_last() else {
            return Err(HotkeyParseError::Empty);
        };
        if key_name.is_empty() {
            return Err(HotkeyParseError::Empty);
        }

        let mut modifiers = Modifiers::default();
        for name in modifier_names {
            match name.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "shift" => modifiers.shift = true,
                "alt" | "mod1" => modifiers.alt = true,
                "super" | "win" | "meta" | "mod4" => modifiers.super_key = true,
                _ => return Err(HotkeyParseError::UnknownModifier(name.to_string())),
            }
        }

        let key = Key::parse(key_name)
            .ok_or_else(|| HotkeyParseError::UnknownKey(key_name.to_string()))?;
        Ok(Self { modifiers, key })
    }
}

impl TryFrom<String> for Hotkey {
    type Error = HotkeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Hotkey> for String {
    fn from(hotkey: Hotkey) -> Self {
        hotkey.to_string()
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.modifiers;
        for (held, name) in [
            (m.ctrl, "Ctrl"),
            (m.shift, "Shift"),
            (m.alt, "Alt"),
            (m.super_key, "Super"),
        ] {
            if held {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_toggle() {
        let hotkey: Hotkey = "Ctrl+Shift+Space".parse().unwrap();
        assert_eq!(hotkey, Hotkey::default_toggle());
        assert_eq!(hotkey.to_string(), "Ctrl+Shift+Space");
    }

    #[test]
    fn default_quit_is_ctrl_shift_q() {
        let quit = Hotkey::default_quit();
        assert_eq!(quit.to_string(), "Ctrl+Shift+Q");
        assert_ne!(quit.key, Key::Escape);
        assert_eq!("ctrl+shift+q".parse::<Hotkey>().unwrap(), quit);
    }

    #[test]
    fn parsing_is_case_insensitive_and_accepts_aliases() {
        let hotkey: Hotkey = "control+ALT+win+f5".parse().unwrap();
        assert!(hotkey.modifiers.ctrl && hotkey.modifiers.alt && hotkey.modifiers.super_key);
        assert!(!hotkey.modifiers.shift);
        assert_eq!(hotkey.key, Key::F(5));

        let letter: Hotkey = "Ctrl+Q".parse().unwrap();
        assert_eq!(letter.key, Key::Char('q'));
        assert_eq!(letter.to_string(), "Ctrl+Q");
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<Hotkey>(), Err(HotkeyParseError::Empty));
        assert_eq!("Ctrl+".parse::<Hotkey>(), Err(HotkeyParseError::Empty));
        assert_eq!(
            "Hyper+A".parse::<Hotkey>(),
            Err(HotkeyParseError::UnknownModifier("Hyper".into()))
        );
        assert_eq!(
            "Ctrl+F13".parse::<Hotkey>(),
            Err(HotkeyParseError::UnknownKey("F13".into()))
        );
        assert_eq!(
            "Ctrl+@".parse::<Hotkey>(),
            Err(HotkeyParseError::UnknownKey("@".into()))
        );
    }
}
