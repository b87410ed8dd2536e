// Presentation modes. Exactly one is chosen at startup and never changes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::display::{Color, DisplayServer, Rect, ScreenBounds, WindowHandle};
use crate::error::{CliError, DisplayError};
use crate::geometry;

/// Darkens bands above and below the cursor, leaving a gap around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HideConfig {
    pub hide_band_height: u32,
    pub cursor_gap_height: u32,
    pub border_thickness: u32,
    pub overlay_color: Color,
    pub border_color: Color,
    pub opacity_percent: f64,
}

impl Default for HideConfig {
    fn default() -> Self {
        Self {
            hide_band_height: 400,
            cursor_gap_height: 80,
            border_thickness: 2,
            overlay_color: Color(0xf0f0f0),
            border_color: Color::BLACK,
            opacity_percent: 100.0,
        }
    }
}

/// Translucent band centered on the cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulerConfig {
    pub ruler_band_height: u32,
    pub ruler_color: Color,
    pub opacity_percent: f64,
}

impl Default for RulerConfig {
    fn default() -> Self {
        Self {
            ruler_band_height: 40,
            ruler_color: Color(0x808080),
            opacity_percent: 94.0,
        }
    }
}

/// Mode selector as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeKind {
    #[default]
    Ruler,
    Hide,
}

impl FromStr for ModeKind {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ruler" => Ok(ModeKind::Ruler),
            "hide" => Ok(ModeKind::Hide),
            other => Err(CliError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModeKind::Ruler => "ruler",
            ModeKind::Hide => "hide",
        })
    }
}

/// Windows owned by the active mode, in creation order.
///
/// Hide: top band, top border, bottom border, bottom band. Ruler: the band.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WindowSet {
    handles: Vec<WindowHandle>,
}

impl WindowSet {
    pub fn handles(&self) -> &[WindowHandle] {
        &self.handles
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn map_all<D: DisplayServer + ?Sized>(&self, display: &D) {
        for &window in &self.handles {
            if let Err(err) = display.map_window(window) {
                tracing::warn!(?window, %err, "map failed");
            }
        }
    }

    pub fn unmap_all<D: DisplayServer + ?Sized>(&self, display: &D) {
        for &window in &self.handles {
            if let Err(err) = display.unmap_window(window) {
                tracing::warn!(?window, %err, "unmap failed");
            }
        }
    }

    /// Destroy every window. The set is left empty.
    pub fn destroy<D: DisplayServer + ?Sized>(&mut self, display: &D) {
        for window in self.handles.drain(..) {
            if let Err(err) = display.destroy_window(window) {
                tracing::debug!(?window, %err, "destroy failed");
            }
        }
    }

    fn create<D: DisplayServer + ?Sized>(
        display: &D,
        specs: &[(Rect, Color)],
    ) -> Result<Self, DisplayError> {
        let mut set = WindowSet {
            handles: Vec::with_capacity(specs.len()),
        };
        for &(rect, color) in specs {
            match display.create_overlay_window(rect, color) {
                Ok(window) => set.handles.push(window),
                Err(err) => {
                    set.destroy(display);
                    return Err(err);
                }
            }
        }
        Ok(set)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Hide(HideConfig),
    Ruler(RulerConfig),
}

impl Mode {
    pub fn from_kind(kind: ModeKind, hide: &HideConfig, ruler: &RulerConfig) -> Self {
        match kind {
            ModeKind::Hide => Mode::Hide(hide.clone()),
            ModeKind::Ruler => Mode::Ruler(ruler.clone()),
        }
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::Hide(_) => ModeKind::Hide,
            Mode::Ruler(_) => ModeKind::Ruler,
        }
    }

    pub fn opacity_percent(&self) -> f64 {
        let percent = match self {
            Mode::Hide(c) => c.opacity_percent,
            Mode::Ruler(c) => c.opacity_percent,
        };
        percent.clamp(0.0, 100.0)
    }

    /// Create this mode's windows, unmapped. Nothing is left behind on failure.
    pub fn create_window_set<D: DisplayServer + ?Sized>(
        &self,
        display: &D,
        bounds: ScreenBounds,
    ) -> Result<WindowSet, DisplayError> {
        match self {
            Mode::Hide(c) => {
                let band = Rect::new(0, 0, bounds.width, 1);
                let border = Rect::new(0, 0, bounds.width, c.border_thickness.max(1));
                WindowSet::create(
                    display,
                    &[
                        (band, c.overlay_color),
                        (border, c.border_color),
                        (border, c.border_color),
                        (band, c.overlay_color),
                    ],
                )
            }
            Mode::Ruler(c) => WindowSet::create(
                display,
                &[(
                    Rect::new(0, 0, bounds.width, c.ruler_band_height.max(1)),
                    c.ruler_color,
                )],
            ),
        }
    }

    /// Move the windows to follow `cursor_y`. Request failures are logged;
    /// the next frame re-issues the geometry.
    pub fn update<D: DisplayServer + ?Sized>(
        &self,
        display: &D,
        windows: &WindowSet,
        cursor_y: i32,
        bounds: ScreenBounds,
    ) {
        match (self, windows.handles()) {
            (Mode::Hide(c), &[top, top_border, bottom_border, bottom]) => {
                let layout = geometry::hide_layout(
                    cursor_y,
                    c.hide_band_height,
                    c.cursor_gap_height,
                    c.border_thickness,
                    bounds,
                );
                if let Some(rect) = layout.top_band {
                    configure(display, top, rect);
                }
                configure(display, top_border, layout.top_border);
                configure(display, bottom_border, layout.bottom_border);
                if let Some(rect) = layout.bottom_band {
                    configure(display, bottom, rect);
                }
            }
            (Mode::Ruler(c), &[band]) => {
                configure(
                    display,
                    band,
                    geometry::ruler_band(cursor_y, c.ruler_band_height, bounds),
                );
            }
            (mode, handles) => {
                tracing::error!(
                    mode = %mode.kind(),
                    windows = handles.len(),
                    "window set does not belong to this mode"
                );
            }
        }
    }
}

fn configure<D: DisplayServer + ?Sized>(display: &D, window: WindowHandle, rect: Rect) {
    if let Err(err) = display.configure_window(window, rect) {
        tracing::debug!(?window, %err, "configure failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_kind_parses_cli_values() {
        assert_eq!("ruler".parse::<ModeKind>(), Ok(ModeKind::Ruler));
        assert_eq!("hide".parse::<ModeKind>(), Ok(ModeKind::Hide));
        assert_eq!(
            "Hide".parse::<ModeKind>(),
            Err(CliError::InvalidMode("Hide".into()))
        );
        assert_eq!(ModeKind::default(), ModeKind::Ruler);
    }

    #[test]
    fn opacity_is_clamped() {
        let mode = Mode::Ruler(RulerConfig {
            opacity_percent: 140.0,
            ..RulerConfig::default()
        });
        assert_eq!(mode.opacity_percent(), 100.0);
        let mode = Mode::Hide(HideConfig {
            opacity_percent: -3.0,
            ..HideConfig::default()
        });
        assert_eq!(mode.opacity_percent(), 0.0);
    }

    #[test]
    fn from_kind_picks_matching_config() {
        let hide = HideConfig::default();
        let ruler = RulerConfig::default();
        assert_eq!(Mode::from_kind(ModeKind::Hide, &hide, &ruler), Mode::Hide(hide.clone()));
        assert_eq!(Mode::from_kind(ModeKind::Ruler, &hide, &ruler).kind(), ModeKind::Ruler);
    }
}
