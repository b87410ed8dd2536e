use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::hotkey::Hotkey;
use crate::mode::{HideConfig, RulerConfig};
use crate::trail::TrailConfig;

/// Runtime settings. Every field has a default; an optional JSON file can
/// override any subset of them. The file is only ever read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Cursor polling period (~60 Hz by default).
    pub poll_interval_ms: u64,
    pub toggle_hotkey: Hotkey,
    /// `null` disables the quit hotkey.
    pub quit_hotkey: Option<Hotkey>,
    pub hide: HideConfig,
    pub ruler: RulerConfig,
    pub trail: TrailConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 16,
            toggle_hotkey: Hotkey::default_toggle(),
            quit_hotkey: Some(Hotkey::default_quit()),
            hide: HideConfig::default(),
            ruler: RulerConfig::default(),
            trail: TrailConfig::default(),
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Clamp values the display server would reject (zero-sized windows,
    /// opacity outside 0..=100).
    pub fn sanitize(&mut self) {
        fn at_least_one(name: &str, value: &mut u32) {
            if *value == 0 {
                tracing::warn!(setting = name, "must be at least 1, using 1");
                *value = 1;
            }
        }
        fn percent(name: &str, value: &mut f64) {
            let current = *value;
            if !(0.0..=100.0).contains(&current) {
                let clamped = if current.is_nan() { 100.0 } else { current.clamp(0.0, 100.0) };
                tracing::warn!(setting = name, from = current, to = clamped, "opacity out of range");
                *value = clamped;
            }
        }

        at_least_one("hide.border_thickness", &mut self.hide.border_thickness);
        at_least_one("ruler.ruler_band_height", &mut self.ruler.ruler_band_height);
        at_least_one("trail.line_width", &mut self.trail.line_width);
        percent("hide.opacity_percent", &mut self.hide.opacity_percent);
        percent("ruler.opacity_percent", &mut self.ruler.opacity_percent);
        if self.poll_interval_ms == 0 {
            tracing::warn!("poll_interval_ms must be positive, using 1");
            self.poll_interval_ms = 1;
        }
    }
}

pub fn config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("cursor-ruler").join("config.json")
}

/// Load settings from the default location, falling back to defaults.
pub fn load_settings() -> Settings {
    load_settings_from(&config_path())
}

pub fn load_settings_from(path: &Path) -> Settings {
    let mut settings = if path.exists() {
        match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(settings) => {
                    tracing::debug!(path = %path.display(), "loaded settings");
                    settings
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "invalid settings file, using defaults");
                    Settings::default()
                }
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "cannot read settings file, using defaults");
                Settings::default()
            }
        }
    } else {
        Settings::default()
    };
    settings.sanitize();
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Color;
    use crate::hotkey::Key;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("nope.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.poll_interval(), Duration::from_millis(16));
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{
                "toggle_hotkey": "Ctrl+Alt+R",
                "quit_hotkey": null,
                "ruler": {{ "ruler_band_height": 60, "ruler_color": "#336699" }},
                "trail": {{ "enabled": true }}
            }}"##
        )
        .unwrap();

        let settings = load_settings_from(file.path());
        assert_eq!(settings.toggle_hotkey.key, Key::Char('r'));
        assert_eq!(settings.quit_hotkey, None);
        assert_eq!(settings.ruler.ruler_band_height, 60);
        assert_eq!(settings.ruler.ruler_color, Color(0x336699));
        assert_eq!(settings.ruler.opacity_percent, 94.0);
        assert!(settings.trail.enabled);
        assert_eq!(settings.trail.duration_ms, 2000);
        assert_eq!(settings.hide, HideConfig::default());
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "toggle_hotkey": "Hyper+X" }}"#).unwrap();
        assert_eq!(load_settings_from(file.path()), Settings::default());
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let mut settings = Settings::default();
        settings.hide.border_thickness = 0;
        settings.ruler.opacity_percent = 250.0;
        settings.poll_interval_ms = 0;
        settings.sanitize();
        assert_eq!(settings.hide.border_thickness, 1);
        assert_eq!(settings.ruler.opacity_percent, 100.0);
        assert_eq!(settings.poll_interval_ms, 1);
    }

    #[test]
    fn settings_round_trip_through_json() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert!(json.contains("\"Ctrl+Shift+Space\""));
        assert!(json.contains("\"#f0f0f0\""));
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Settings::default());
    }
}
