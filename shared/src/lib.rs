// Platform-neutral core of cursor-ruler: overlay geometry, modes, the trail
// effect and the poll-loop engine. Platform crates supply a `DisplayServer`.

pub mod app;
pub mod cli;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod hotkey;
pub mod logging;
pub mod mode;
pub mod trail;

pub use display::{
    Color, DisplayServer, GcHandle, HotkeyCallback, MaskHandle, Point, Rect, ScreenBounds, Stroke,
    WindowHandle,
};
pub use engine::{CancelToken, Phase, Ruler};
pub use error::{CliError, DisplayError, InitError, RunError};
pub use mode::{HideConfig, Mode, ModeKind, RulerConfig, WindowSet};
pub use trail::{TrailConfig, TrailManager};

/// Application version, reported by `--help`.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
