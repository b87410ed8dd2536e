// The poll-loop engine.
//
// `Ruler` owns the display connection, the mode's windows and the trail. The
// hotkey callbacks registered with the display server only ever touch two
// atomic flags: visibility and shutdown. The poll loop notices a changed
// visibility flag on its next tick and maps or unmaps the windows itself, so
// all geometry requests come from one thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Settings;
use crate::display::{DisplayServer, Point, ScreenBounds};
use crate::error::{DisplayError, InitError, RunError};
use crate::hotkey::Hotkey;
use crate::mode::{Mode, WindowSet};
use crate::trail::TrailManager;

/// Cooperative shutdown signal shared with hotkey callbacks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Terminated,
}

pub struct Ruler<D: DisplayServer> {
    display: D,
    mode: Mode,
    bounds: ScreenBounds,
    windows: WindowSet,
    trail: Option<TrailManager>,
    /// Written by the toggle hotkey.
    visible: Arc<AtomicBool>,
    /// What the windows currently reflect.
    shown: bool,
    last_y: Option<i32>,
    poll_interval: Duration,
    cancel: CancelToken,
    phase: Phase,
}

impl<D: DisplayServer> Ruler<D> {
    /// Connect, create and configure the mode's windows, register hotkeys and
    /// show the overlay at the current cursor position.
    ///
    /// Any failure aborts startup; windows created so far are destroyed.
    pub fn init<F>(connect: F, mode: Mode, settings: &Settings) -> Result<Self, InitError>
    where
        F: FnOnce() -> Result<D, DisplayError>,
    {
        let display = connect().map_err(InitError::Connect)?;
        let bounds = display.screen_bounds();
        tracing::info!(
            width = bounds.width,
            height = bounds.height,
            mode = %mode.kind(),
            "connected to display server"
        );

        let windows = mode
            .create_window_set(&display, bounds)
            .map_err(InitError::WindowCreation)?;

        // From here on, dropping `ruler` tears the windows down again.
        let mut ruler = Ruler {
            display,
            mode,
            bounds,
            windows,
            trail: settings
                .trail
                .enabled
                .then(|| TrailManager::new(settings.trail.clone())),
            visible: Arc::new(AtomicBool::new(true)),
            shown: false,
            last_y: None,
            poll_interval: settings.poll_interval(),
            cancel: CancelToken::new(),
            phase: Phase::Running,
        };

        for &window in ruler.windows.handles() {
            ruler
                .display
                .set_click_through(window)
                .map_err(InitError::ClickThrough)?;
        }

        let opacity = ruler.mode.opacity_percent();
        for &window in ruler.windows.handles() {
            ruler
                .display
                .set_window_opacity(window, opacity)
                .map_err(InitError::Opacity)?;
        }

        ruler.register_toggle(&settings.toggle_hotkey)?;
        if let Some(quit) = &settings.quit_hotkey {
            ruler.register_quit(quit)?;
        }

        let cursor = ruler
            .display
            .query_cursor_position()
            .map_err(InitError::InitialPlacement)?;
        ruler.show(cursor.y);
        ruler
            .display
            .flush()
            .map_err(InitError::InitialPlacement)?;

        tracing::info!(
            toggle = %settings.toggle_hotkey,
            trail = ruler.trail.is_some(),
            "overlay running"
        );
        Ok(ruler)
    }

    fn register_toggle(&self, hotkey: &Hotkey) -> Result<(), InitError> {
        let visible = Arc::clone(&self.visible);
        self.display
            .register_global_hotkey(
                hotkey,
                Box::new(move || {
                    let was = visible.fetch_xor(true, Ordering::AcqRel);
                    tracing::debug!(from = was, to = !was, "visibility toggled");
                }),
            )
            .map_err(|source| InitError::Hotkey {
                hotkey: *hotkey,
                source,
            })
    }

    fn register_quit(&self, hotkey: &Hotkey) -> Result<(), InitError> {
        let cancel = self.cancel.clone();
        self.display
            .register_global_hotkey(
                hotkey,
                Box::new(move || {
                    tracing::info!("quit requested");
                    cancel.cancel();
                }),
            )
            .map_err(|source| InitError::Hotkey {
                hotkey: *hotkey,
                source,
            })
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn windows(&self) -> &WindowSet {
        &self.windows
    }

    pub fn trail(&self) -> Option<&TrailManager> {
        self.trail.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the windows are currently mapped.
    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Poll until cancelled, then release everything.
    pub fn run(mut self) -> Result<(), RunError> {
        let result = loop {
            if self.cancel.is_cancelled() {
                break Ok(());
            }
            if let Err(err) = self.tick(Instant::now()) {
                break Err(err);
            }
            thread::sleep(self.poll_interval);
        };
        self.shutdown();
        result
    }

    /// One iteration of the poll loop.
    pub fn tick(&mut self, now: Instant) -> Result<(), RunError> {
        let cursor = self
            .display
            .query_cursor_position()
            .map_err(RunError::CursorQuery)?;

        self.apply_visibility(cursor.y);

        if self.last_y != Some(cursor.y) {
            if self.shown {
                self.mode
                    .update(&self.display, &self.windows, cursor.y, self.bounds);
            }
            self.last_y = Some(cursor.y);
        }

        self.step_trail(cursor, now);

        if let Err(err) = self.display.flush() {
            tracing::debug!(%err, "flush failed");
        }
        Ok(())
    }

    fn step_trail(&mut self, cursor: Point, now: Instant) {
        let Some(trail) = self.trail.as_mut() else {
            return;
        };
        if !self.shown {
            trail.update_position(cursor);
        } else if trail.last_position().is_none() {
            trail.update_position(cursor);
        } else if trail.should_add(cursor) {
            if let Some(previous) = trail.last_position() {
                trail.add(&self.display, previous, cursor, now);
            }
            trail.update_position(cursor);
        }
        trail.update(&self.display, now);
    }

    fn apply_visibility(&mut self, cursor_y: i32) {
        let wanted = self.visible.load(Ordering::Acquire);
        if wanted == self.shown {
            return;
        }
        if wanted {
            self.show(cursor_y);
        } else {
            self.hide();
        }
    }

    fn show(&mut self, cursor_y: i32) {
        self.mode
            .update(&self.display, &self.windows, cursor_y, self.bounds);
        self.windows.map_all(&self.display);
        self.last_y = Some(cursor_y);
        self.shown = true;
        tracing::info!("overlay shown");
    }

    fn hide(&mut self) {
        self.windows.unmap_all(&self.display);
        if let Some(trail) = self.trail.as_mut() {
            trail.clear(&self.display);
        }
        self.shown = false;
        tracing::info!("overlay hidden");
    }

    /// Release trail segments and windows. Idempotent; the connection itself
    /// goes when the engine is dropped.
    pub fn shutdown(&mut self) {
        if self.phase == Phase::Terminated {
            return;
        }
        if let Some(trail) = self.trail.as_mut() {
            trail.clear(&self.display);
        }
        self.windows.destroy(&self.display);
        if let Err(err) = self.display.flush() {
            tracing::debug!(%err, "flush failed during shutdown");
        }
        self.shown = false;
        self.phase = Phase::Terminated;
        tracing::info!("overlay terminated");
    }
}

impl<D: DisplayServer> Drop for Ruler<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
