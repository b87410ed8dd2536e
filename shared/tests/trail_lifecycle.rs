use std::time::{Duration, Instant};

use cursor_ruler_shared::{Color, Point, Rect, TrailConfig, TrailManager};

use mock_display::MockDisplay;

fn trail(fade: bool) -> TrailManager {
    TrailManager::new(TrailConfig {
        enabled: true,
        fade,
        ..TrailConfig::default()
    })
}

const EPSILON: Duration = Duration::from_millis(1);

#[test]
fn segment_window_is_padded_shaped_and_click_through() {
    let display = MockDisplay::new(1920, 1080);
    let mut trail = trail(true);
    trail.add(&display, Point::new(100, 100), Point::new(130, 90), Instant::now());

    assert_eq!(trail.len(), 1);
    let segment = &trail.segments()[0];
    let window = display.window(segment.window);
    assert_eq!(window.rect, Rect::new(95, 85, 40, 20));
    assert_eq!(window.background, Color(0xff0000));
    assert!(window.mapped && window.shaped && window.click_through);
    assert_eq!(window.opacity, Some(100.0));
    assert_eq!(window.lines, vec![(Point::new(5, 15), Point::new(35, 5))]);
    assert_eq!(display.live_masks(), 0);
    assert_eq!(display.live_gcs(), 1);
}

#[test]
fn segment_lives_exactly_its_duration() {
    let display = MockDisplay::new(1920, 1080);
    let mut trail = trail(false);
    let created = Instant::now();
    let lifetime = trail.config().duration();
    trail.add(&display, Point::new(0, 0), Point::new(10, 10), created);

    trail.update(&display, created + lifetime - EPSILON);
    assert_eq!(trail.len(), 1);
    trail.update(&display, created + lifetime);
    assert_eq!(trail.len(), 1);

    trail.update(&display, created + lifetime + EPSILON);
    assert!(trail.is_empty());
    assert_eq!(display.window_count(), 0);
    assert_eq!(display.live_gcs(), 0);
}

#[test]
fn segments_expire_independently() {
    let display = MockDisplay::new(1920, 1080);
    let mut trail = trail(false);
    let t0 = Instant::now();
    trail.add(&display, Point::new(0, 0), Point::new(5, 0), t0);
    trail.add(&display, Point::new(5, 0), Point::new(9, 0), t0 + Duration::from_millis(500));

    trail.update(&display, t0 + Duration::from_millis(2100));
    assert_eq!(trail.len(), 1);
    assert_eq!(trail.segments()[0].start, Point::new(5, 0));

    trail.update(&display, t0 + Duration::from_millis(2600));
    assert!(trail.is_empty());
}

#[test]
fn fading_lowers_opacity_with_age() {
    let display = MockDisplay::new(1920, 1080);
    let mut trail = trail(true);
    let t0 = Instant::now();
    trail.add(&display, Point::new(0, 0), Point::new(5, 5), t0);
    let window = trail.segments()[0].window;

    trail.update(&display, t0 + Duration::from_millis(500));
    let quarter = display.window(window).opacity.unwrap();
    trail.update(&display, t0 + Duration::from_millis(1500));
    let three_quarters = display.window(window).opacity.unwrap();

    assert!((quarter - 75.0).abs() < 1e-6);
    assert!((three_quarters - 25.0).abs() < 1e-6);
}

#[test]
fn allocation_failure_is_skipped_without_leaks() {
    let display = MockDisplay::new(1920, 1080);
    let mut trail = trail(true);

    display.set_create_budget(Some(0));
    trail.add(&display, Point::new(0, 0), Point::new(5, 5), Instant::now());
    assert!(trail.is_empty());

    display.set_create_budget(None);
    display.set_gc_fails(true);
    trail.add(&display, Point::new(0, 0), Point::new(5, 5), Instant::now());
    assert!(trail.is_empty());
    assert_eq!(display.window_count(), 0);
    assert_eq!(display.live_gcs(), 0);

    display.set_gc_fails(false);
    trail.add(&display, Point::new(0, 0), Point::new(5, 5), Instant::now());
    assert_eq!(trail.len(), 1);
}

#[test]
fn clear_releases_everything() {
    let display = MockDisplay::new(1920, 1080);
    let mut trail = trail(false);
    let now = Instant::now();
    for i in 0..5 {
        trail.add(&display, Point::new(i, 0), Point::new(i + 3, 4), now);
    }
    assert_eq!(display.window_count(), 5);

    trail.clear(&display);
    assert!(trail.is_empty());
    assert_eq!(display.window_count(), 0);
    assert_eq!(display.live_gcs(), 0);
}

#[test]
fn huge_padding_is_capped_to_window_coordinates() {
    let display = MockDisplay::new(1920, 1080);
    let mut trail = TrailManager::new(TrailConfig {
        enabled: true,
        padding: u32::MAX,
        ..TrailConfig::default()
    });
    trail.add(&display, Point::new(100, 100), Point::new(130, 90), Instant::now());

    assert_eq!(trail.len(), 1);
    let pad = i32::from(i16::MAX);
    let window = display.window(trail.segments()[0].window);
    assert_eq!(window.rect.x, 100 - pad);
    assert_eq!(window.rect.y, 90 - pad);
    assert_eq!(window.rect.width, 30 + 2 * i16::MAX as u32);
    assert_eq!(window.lines, vec![(Point::new(pad, pad + 10), Point::new(pad + 30, pad))]);
}

#[test]
fn failed_draw_releases_the_graphics_context() {
    let display = MockDisplay::new(1920, 1080);
    let mut trail = trail(false);
    display.set_draw_fails(true);
    trail.add(&display, Point::new(0, 0), Point::new(5, 5), Instant::now());

    assert!(trail.is_empty());
    assert_eq!(display.window_count(), 0);
    assert_eq!(display.live_gcs(), 0);
}
