// Pure layout math. Every rectangle spans the full screen width; only the
// vertical position follows the cursor.

use crate::display::{Rect, ScreenBounds};

/// Window rectangles for hide mode at one cursor position.
///
/// A band whose computed height is not positive is `None`: the caller leaves
/// that window where it was instead of collapsing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HideLayout {
    pub top_band: Option<Rect>,
    pub top_border: Rect,
    pub bottom_border: Rect,
    pub bottom_band: Option<Rect>,
}

/// Top edge of the uncovered gap around the cursor.
pub fn gap_top(cursor_y: i32, gap_height: u32) -> i32 {
    cursor_y.saturating_sub(half(gap_height))
}

/// Bottom edge (exclusive) of the uncovered gap around the cursor.
pub fn gap_bottom(cursor_y: i32, gap_height: u32) -> i32 {
    cursor_y.saturating_add(half(gap_height))
}

pub fn hide_layout(
    cursor_y: i32,
    band_height: u32,
    gap_height: u32,
    border_thickness: u32,
    bounds: ScreenBounds,
) -> HideLayout {
    let cursor_top = gap_top(cursor_y, gap_height);
    let cursor_bottom = gap_bottom(cursor_y, gap_height);
    let band = to_i32(band_height);

    let top_start = cursor_top.saturating_sub(band).max(0);
    let top_band = full_width(top_start, cursor_top, bounds);

    let bottom_end = cursor_bottom.saturating_add(band).min(to_i32(bounds.height));
    let bottom_band = full_width(cursor_bottom, bottom_end, bounds);

    HideLayout {
        top_band,
        top_border: Rect::new(0, cursor_top, bounds.width, border_thickness),
        bottom_border: Rect::new(
            0,
            cursor_bottom.saturating_sub(to_i32(border_thickness)),
            bounds.width,
            border_thickness,
        ),
        bottom_band,
    }
}

/// Ruler band of fixed height, vertically centered on the cursor.
pub fn ruler_band(cursor_y: i32, band_height: u32, bounds: ScreenBounds) -> Rect {
    Rect::new(
        0,
        cursor_y.saturating_sub(half(band_height)),
        bounds.width,
        band_height,
    )
}

fn full_width(start: i32, end: i32, bounds: ScreenBounds) -> Option<Rect> {
    (end > start).then(|| Rect::new(0, start, bounds.width, end.abs_diff(start)))
}

fn half(value: u32) -> i32 {
    to_i32(value / 2)
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: ScreenBounds = ScreenBounds::new(1920, 1080);

    #[test]
    fn hide_layout_mid_screen() {
        let layout = hide_layout(540, 200, 50, 2, SCREEN);
        assert_eq!(layout.top_band, Some(Rect::new(0, 315, 1920, 200)));
        assert_eq!(layout.bottom_band, Some(Rect::new(0, 565, 1920, 200)));
        assert_eq!(layout.top_border, Rect::new(0, 515, 1920, 2));
        assert_eq!(layout.bottom_border, Rect::new(0, 563, 1920, 2));
    }

    #[test]
    fn oversized_heights_saturate_at_the_screen_edges() {
        let layout = hide_layout(540, u32::MAX, 80, 2, SCREEN);
        assert_eq!(layout.top_band, Some(Rect::new(0, 0, 1920, 500)));
        assert_eq!(layout.bottom_band, Some(Rect::new(0, 580, 1920, 500)));

        let layout = hide_layout(540, 200, u32::MAX, u32::MAX, SCREEN);
        assert_eq!(layout.top_band, None);
        assert_eq!(layout.bottom_band, None);

        let band = ruler_band(i32::MIN + 5, u32::MAX, SCREEN);
        assert_eq!(band.y, i32::MIN);
    }

    #[test]
    fn hide_bands_never_cover_the_gap() {
        let gap = 50;
        for cursor_y in 0..SCREEN.height as i32 {
            let layout = hide_layout(cursor_y, 200, gap, 2, SCREEN);
            let top = gap_top(cursor_y, gap);
            let bottom = gap_bottom(cursor_y, gap);
            if let Some(band) = layout.top_band {
                assert!(band.y >= 0);
                assert_eq!(band.bottom(), top, "cursor_y={cursor_y}");
            }
            if let Some(band) = layout.bottom_band {
                assert_eq!(band.y, bottom, "cursor_y={cursor_y}");
                assert!(band.bottom() <= SCREEN.height as i32);
            }
        }
    }

    #[test]
    fn hide_bands_vanish_at_screen_edges() {
        let layout = hide_layout(10, 200, 50, 2, SCREEN);
        assert_eq!(layout.top_band, None);
        assert!(layout.bottom_band.is_some());

        let layout = hide_layout(1070, 200, 50, 2, SCREEN);
        assert!(layout.top_band.is_some());
        assert_eq!(layout.bottom_band, None);
    }

    #[test]
    fn ruler_band_is_centered() {
        assert_eq!(ruler_band(100, 40, SCREEN), Rect::new(0, 80, 1920, 40));
        for cursor_y in [0, 1, 539, 1079] {
            let band = ruler_band(cursor_y, 40, SCREEN);
            assert_eq!(band.height, 40);
            assert_eq!(band.y + 20, cursor_y);
        }
    }

    #[test]
    fn odd_heights_round_down() {
        let band = ruler_band(100, 41, SCREEN);
        assert_eq!(band.y, 80);
        assert_eq!(band.height, 41);
        assert_eq!(gap_top(100, 51), 75);
        assert_eq!(gap_bottom(100, 51), 125);
    }
}
