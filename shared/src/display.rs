// Capability interface to the windowing system.
//
// The engine never talks to X11 or Win32 directly. Each platform crate
// implements `DisplayServer` over its native protocol and hands the engine a
// connected instance. Handles are opaque integers minted by the implementation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DisplayError;
use crate::hotkey::Hotkey;

/// Opaque overlay window id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub u64);

/// Opaque graphics context (X11 GC, Win32 pen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GcHandle(pub u64);

/// Opaque 1-bit shape mask (X11 bitmap, Win32 region).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaskHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared euclidean distance, computed in i64 so large jumps cannot overflow.
    pub fn distance_squared(self, other: Point) -> i64 {
        let dx = i64::from(other.x) - i64::from(self.x);
        let dy = i64::from(other.y) - i64::from(self.y);
        dx * dx + dy * dy
    }
}

/// Window rectangle in root (screen) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}

/// Screen size queried once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenBounds {
    pub width: u32,
    pub height: u32,
}

impl ScreenBounds {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// 24-bit `0xRRGGBB` color. Serialized as `"#rrggbb"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0x000000);

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid color '{0}', expected #rrggbb")]
pub struct ColorParseError(String);

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .unwrap_or(trimmed);
        if hex.len() != 6 {
            return Err(ColorParseError(s.to_string()));
        }
        u32::from_str_radix(hex, 16)
            .map(Color)
            .map_err(|_| ColorParseError(s.to_string()))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0 & 0xff_ffff)
    }
}

/// Pen used for trail strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stroke {
    pub color: Color,
    pub width: u32,
}

/// Invoked on the display server's dispatch thread when a hotkey fires.
pub type HotkeyCallback = Box<dyn Fn() + Send + 'static>;

/// Everything the engine needs from the windowing system.
///
/// Geometry and property calls are fire-and-forget from the engine's point of
/// view: it logs their errors and re-issues geometry on the next frame.
/// Connection setup is the implementation's constructor.
pub trait DisplayServer {
    fn screen_bounds(&self) -> ScreenBounds;

    /// Create an undecorated, window-manager-bypassing overlay. The window
    /// starts unmapped.
    fn create_overlay_window(
        &self,
        rect: Rect,
        background: Color,
    ) -> Result<WindowHandle, DisplayError>;

    fn map_window(&self, window: WindowHandle) -> Result<(), DisplayError>;

    fn unmap_window(&self, window: WindowHandle) -> Result<(), DisplayError>;

    fn destroy_window(&self, window: WindowHandle) -> Result<(), DisplayError>;

    fn configure_window(&self, window: WindowHandle, rect: Rect) -> Result<(), DisplayError>;

    /// Set compositor opacity, `percent` in `[0, 100]`.
    fn set_window_opacity(&self, window: WindowHandle, percent: f64) -> Result<(), DisplayError>;

    /// Make the window transparent to pointer input.
    fn set_click_through(&self, window: WindowHandle) -> Result<(), DisplayError>;

    fn query_cursor_position(&self) -> Result<Point, DisplayError>;

    /// Grab `hotkey` globally. `callback` runs on a dispatch thread distinct
    /// from the caller.
    fn register_global_hotkey(
        &self,
        hotkey: &Hotkey,
        callback: HotkeyCallback,
    ) -> Result<(), DisplayError>;

    fn create_graphics_context(
        &self,
        window: WindowHandle,
        stroke: &Stroke,
    ) -> Result<GcHandle, DisplayError>;

    /// Draw a line in window-local coordinates.
    fn draw_line(
        &self,
        window: WindowHandle,
        gc: GcHandle,
        from: Point,
        to: Point,
    ) -> Result<(), DisplayError>;

    /// Build a `width` x `height` mask whose only set pixels are the stroke
    /// from `from` to `to` (local coordinates).
    fn create_mask_surface(
        &self,
        width: u32,
        height: u32,
        stroke: &Stroke,
        from: Point,
        to: Point,
    ) -> Result<MaskHandle, DisplayError>;

    /// Use `mask` as the window's visible shape. The mask is consumed.
    fn apply_shape_mask(&self, window: WindowHandle, mask: MaskHandle)
        -> Result<(), DisplayError>;

    fn free_graphics_context(&self, gc: GcHandle) -> Result<(), DisplayError>;

    /// Push queued requests to the server and service pending window messages.
    fn flush(&self) -> Result<(), DisplayError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parses_hash_and_0x_forms() {
        assert_eq!("#f0f0f0".parse::<Color>(), Ok(Color(0xf0f0f0)));
        assert_eq!("0x808080".parse::<Color>(), Ok(Color(0x808080)));
        assert_eq!("FF0000".parse::<Color>(), Ok(Color(0xff0000)));
        assert!("#fff".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
    }

    #[test]
    fn color_displays_lowercase_hex() {
        assert_eq!(Color(0xFF0000).to_string(), "#ff0000");
        assert_eq!(Color::BLACK.to_string(), "#000000");
        let c = Color(0x123456);
        assert_eq!((c.red(), c.green(), c.blue()), (0x12, 0x34, 0x56));
    }

    #[test]
    fn distance_squared_handles_large_jumps() {
        let a = Point::new(i32::MIN / 2, 0);
        let b = Point::new(i32::MAX / 2, 0);
        assert!(a.distance_squared(b) > 0);
        assert_eq!(Point::new(1, 1).distance_squared(Point::new(4, 5)), 25);
    }
}
