// Short-lived line segments tracing recent pointer movement.
//
// Each segment is its own small overlay window, shaped to the stroke so that
// overlapping segments compose without a rectangular backing. Segments expire
// by age, so `update` must run every frame even when the pointer is still.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::display::{
    Color, DisplayServer, GcHandle, Point, Rect, Stroke, WindowHandle,
};
use crate::error::DisplayError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    pub enabled: bool,
    pub duration_ms: u64,
    pub min_distance: u32,
    pub line_width: u32,
    pub color: Color,
    /// Margin around the segment's bounding box.
    pub padding: u32,
    /// Ramp opacity from 100% to 0% over the segment's lifetime.
    pub fade: bool,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_ms: 2000,
            min_distance: 1,
            line_width: 8,
            color: Color(0xff0000),
            padding: 5,
            fade: true,
        }
    }
}

impl TrailConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    fn stroke(&self) -> Stroke {
        Stroke {
            color: self.color,
            width: self.line_width.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailSegment {
    pub start: Point,
    pub end: Point,
    pub created_at: Instant,
    pub window: WindowHandle,
    pub gc: GcHandle,
}

impl TrailSegment {
    fn release<D: DisplayServer + ?Sized>(&self, display: &D) {
        if let Err(err) = display.unmap_window(self.window) {
            tracing::debug!(window = ?self.window, %err, "trail unmap failed");
        }
        if let Err(err) = display.free_graphics_context(self.gc) {
            tracing::debug!(gc = ?self.gc, %err, "trail gc release failed");
        }
        if let Err(err) = display.destroy_window(self.window) {
            tracing::debug!(window = ?self.window, %err, "trail destroy failed");
        }
    }
}

#[derive(Debug)]
pub struct TrailManager {
    config: TrailConfig,
    segments: Vec<TrailSegment>,
    last: Option<Point>,
}

impl TrailManager {
    pub fn new(config: TrailConfig) -> Self {
        Self {
            config,
            segments: Vec::new(),
            last: None,
        }
    }

    pub fn config(&self) -> &TrailConfig {
        &self.config
    }

    /// True once a previous point exists and `point` is at least
    /// `min_distance` away from it.
    pub fn should_add(&self, point: Point) -> bool {
        let Some(last) = self.last else {
            return false;
        };
        let min = i64::from(self.config.min_distance);
        last.distance_squared(point) >= min * min
    }

    pub fn update_position(&mut self, point: Point) {
        self.last = Some(point);
    }

    pub fn last_position(&self) -> Option<Point> {
        self.last
    }

    pub fn segments(&self) -> &[TrailSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Draw a segment from `from` to `to`. Display failures are logged and the
    /// segment is skipped; anything allocated for it is released.
    pub fn add<D: DisplayServer + ?Sized>(
        &mut self,
        display: &D,
        from: Point,
        to: Point,
        now: Instant,
    ) {
        // Window coordinates are 16-bit on X11.
        let pad = i32::from(i16::try_from(self.config.padding).unwrap_or(i16::MAX));
        let min_x = from.x.min(to.x).saturating_sub(pad);
        let min_y = from.y.min(to.y).saturating_sub(pad);
        let max_x = from.x.max(to.x).saturating_add(pad);
        let max_y = from.y.max(to.y).saturating_add(pad);
        let bounds = Rect::new(
            min_x,
            min_y,
            max_x.abs_diff(min_x).max(1),
            max_y.abs_diff(min_y).max(1),
        );
        let local = |p: Point| Point::new(p.x.saturating_sub(min_x), p.y.saturating_sub(min_y));
        let (local_from, local_to) = (local(from), local(to));
        let stroke = self.config.stroke();

        let window = match display.create_overlay_window(bounds, stroke.color) {
            Ok(window) => window,
            Err(err) => {
                tracing::warn!(%err, "trail window creation failed");
                return;
            }
        };

        match self.build(display, window, bounds, &stroke, local_from, local_to) {
            Ok(gc) => self.segments.push(TrailSegment {
                start: from,
                end: to,
                created_at: now,
                window,
                gc,
            }),
            Err(err) => {
                tracing::warn!(%err, "trail segment skipped");
                if let Err(err) = display.destroy_window(window) {
                    tracing::debug!(?window, %err, "trail destroy failed");
                }
            }
        }
    }

    fn build<D: DisplayServer + ?Sized>(
        &self,
        display: &D,
        window: WindowHandle,
        bounds: Rect,
        stroke: &Stroke,
        from: Point,
        to: Point,
    ) -> Result<GcHandle, DisplayError> {
        let mask = display.create_mask_surface(bounds.width, bounds.height, stroke, from, to)?;
        display.apply_shape_mask(window, mask)?;
        display.set_click_through(window)?;
        if self.config.fade {
            display.set_window_opacity(window, 100.0)?;
        }
        display.map_window(window)?;

        let gc = display.create_graphics_context(window, stroke)?;
        if let Err(err) = display.draw_line(window, gc, from, to) {
            if let Err(free_err) = display.free_graphics_context(gc) {
                tracing::debug!(?gc, err = %free_err, "trail gc release failed");
            }
            return Err(err);
        }
        Ok(gc)
    }

    /// Expire segments older than the configured duration and fade the rest.
    pub fn update<D: DisplayServer + ?Sized>(&mut self, display: &D, now: Instant) {
        let lifetime = self.config.duration();
        let fade = self.config.fade;

        self.segments.retain(|segment| {
            let age = now.saturating_duration_since(segment.created_at);
            if age > lifetime {
                segment.release(display);
                return false;
            }
            if fade {
                let percent = fade_percent(age, lifetime);
                if let Err(err) = display.set_window_opacity(segment.window, percent) {
                    tracing::debug!(window = ?segment.window, %err, "trail fade failed");
                }
            }
            true
        });
    }

    /// Release every segment immediately.
    pub fn clear<D: DisplayServer + ?Sized>(&mut self, display: &D) {
        for segment in self.segments.drain(..) {
            segment.release(display);
        }
    }
}

fn fade_percent(age: Duration, lifetime: Duration) -> f64 {
    if lifetime.is_zero() {
        return 0.0;
    }
    let progress = age.as_secs_f64() / lifetime.as_secs_f64();
    ((1.0 - progress) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(min_distance: u32) -> TrailManager {
        TrailManager::new(TrailConfig {
            enabled: true,
            min_distance,
            ..TrailConfig::default()
        })
    }

    #[test]
    fn first_sample_never_adds() {
        let trail = manager(1);
        assert_eq!(trail.last_position(), None);
        assert!(!trail.should_add(Point::new(100, 100)));
    }

    #[test]
    fn zero_movement_does_not_add() {
        let mut trail = manager(1);
        trail.update_position(Point::new(100, 100));
        assert!(!trail.should_add(Point::new(100, 100)));
        assert!(trail.should_add(Point::new(101, 100)));
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut trail = manager(5);
        trail.update_position(Point::new(0, 0));
        assert!(trail.should_add(Point::new(3, 4)));
        assert!(!trail.should_add(Point::new(3, 3)));
        assert!(trail.should_add(Point::new(-5, 0)));
    }

    #[test]
    fn fade_ramps_linearly() {
        let lifetime = Duration::from_secs(2);
        assert_eq!(fade_percent(Duration::ZERO, lifetime), 100.0);
        assert_eq!(fade_percent(Duration::from_secs(1), lifetime), 50.0);
        assert_eq!(fade_percent(Duration::from_secs(3), lifetime), 0.0);
        assert_eq!(fade_percent(Duration::from_secs(1), Duration::ZERO), 0.0);
    }
}
