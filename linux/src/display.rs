// X11 display server over x11rb.
//
// Overlays are override-redirect InputOutput windows on the root, so the
// window manager never places or decorates them. Translucency goes through
// the EWMH `_NET_WM_WINDOW_OPACITY` property (honoured by compositors),
// click-through through an empty XFIXES input region, and trail strokes
// through a 1-bit SHAPE bounding mask.

use std::fmt::Display;
use std::sync::Arc;

use cursor_ruler_shared::hotkey::Hotkey;
use cursor_ruler_shared::{
    Color, DisplayError, DisplayServer, GcHandle, HotkeyCallback, MaskHandle, Point, Rect,
    ScreenBounds, Stroke, WindowHandle,
};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::xfixes::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    self, AtomEnum, CapStyle, ChangeGCAux, ConfigureWindowAux, ConnectionExt as _, CoordMode,
    CreateGCAux, CreateWindowAux, JoinStyle, PropMode, Rectangle, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::hotkeys::HotkeyDispatcher;

const ATOM_OPACITY: &[u8] = b"_NET_WM_WINDOW_OPACITY";
const XFIXES_MAJOR: u32 = 5;
const XFIXES_MINOR: u32 = 0;

/// Map any x11rb error into a named request failure.
trait OrRequest<T> {
    fn or_request(self, request: &'static str) -> Result<T, DisplayError>;
}

impl<T, E: Display> OrRequest<T> for Result<T, E> {
    fn or_request(self, request: &'static str) -> Result<T, DisplayError> {
        self.map_err(|err| DisplayError::request(request, err))
    }
}

pub struct X11Display {
    conn: Arc<RustConnection>,
    root: xproto::Window,
    bounds: ScreenBounds,
    opacity_atom: xproto::Atom,
    has_shape: bool,
    has_xfixes: bool,
    hotkeys: HotkeyDispatcher,
}

impl X11Display {
    /// Connect to `$DISPLAY` and probe the extensions the overlay relies on.
    pub fn connect() -> Result<Self, DisplayError> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|err| DisplayError::Connection(err.to_string()))?;

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let bounds = ScreenBounds::new(
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        );

        let opacity_atom = conn
            .intern_atom(false, ATOM_OPACITY)
            .or_request("InternAtom")?
            .reply()
            .or_request("InternAtom")?
            .atom;

        let has_shape = conn
            .extension_information(shape::X11_EXTENSION_NAME)
            .or_request("QueryExtension")?
            .is_some();
        let has_xfixes = conn
            .extension_information(xfixes::X11_EXTENSION_NAME)
            .or_request("QueryExtension")?
            .is_some();
        if has_xfixes {
            // XFIXES requests are rejected until the version is negotiated.
            conn.xfixes_query_version(XFIXES_MAJOR, XFIXES_MINOR)
                .or_request("XFixesQueryVersion")?
                .reply()
                .or_request("XFixesQueryVersion")?;
        }
        tracing::debug!(screen = screen_num, root, has_shape, has_xfixes, "X11 connection ready");

        Ok(Self {
            conn: Arc::new(conn),
            root,
            bounds,
            opacity_atom,
            has_shape,
            has_xfixes,
            hotkeys: HotkeyDispatcher::new(),
        })
    }

    fn require_shape(&self) -> Result<(), DisplayError> {
        if self.has_shape {
            Ok(())
        } else {
            Err(DisplayError::Unsupported("SHAPE extension"))
        }
    }
}

fn xid(window: WindowHandle) -> xproto::Window {
    window.0 as xproto::Window
}

fn coord(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// X11 rejects zero-sized drawables.
fn extent(value: u32) -> u16 {
    value.clamp(1, u32::from(u16::MAX)) as u16
}

fn xpoint(point: Point) -> xproto::Point {
    xproto::Point {
        x: coord(point.x),
        y: coord(point.y),
    }
}

fn opacity_value(percent: f64) -> u32 {
    (percent.clamp(0.0, 100.0) / 100.0 * f64::from(u32::MAX)) as u32
}

impl DisplayServer for X11Display {
    fn screen_bounds(&self) -> ScreenBounds {
        self.bounds
    }

    fn create_overlay_window(
        &self,
        rect: Rect,
        background: Color,
    ) -> Result<WindowHandle, DisplayError> {
        let window = self.conn.generate_id().or_request("CreateWindow")?;
        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                window,
                self.root,
                coord(rect.x),
                coord(rect.y),
                extent(rect.width),
                extent(rect.height),
                0,
                WindowClass::INPUT_OUTPUT,
                x11rb::COPY_FROM_PARENT,
                &CreateWindowAux::new()
                    .background_pixel(background.0)
                    .override_redirect(1),
            )
            .or_request("CreateWindow")?
            .check()
            .or_request("CreateWindow")?;
        Ok(WindowHandle(u64::from(window)))
    }

    fn map_window(&self, window: WindowHandle) -> Result<(), DisplayError> {
        self.conn.map_window(xid(window)).or_request("MapWindow")?;
        Ok(())
    }

    fn unmap_window(&self, window: WindowHandle) -> Result<(), DisplayError> {
        self.conn.unmap_window(xid(window)).or_request("UnmapWindow")?;
        Ok(())
    }

    fn destroy_window(&self, window: WindowHandle) -> Result<(), DisplayError> {
        self.conn
            .destroy_window(xid(window))
            .or_request("DestroyWindow")?;
        Ok(())
    }

    fn configure_window(&self, window: WindowHandle, rect: Rect) -> Result<(), DisplayError> {
        self.conn
            .configure_window(
                xid(window),
                &ConfigureWindowAux::new()
                    .x(rect.x)
                    .y(rect.y)
                    .width(u32::from(extent(rect.width)))
                    .height(u32::from(extent(rect.height))),
            )
            .or_request("ConfigureWindow")?;
        Ok(())
    }

    fn set_window_opacity(&self, window: WindowHandle, percent: f64) -> Result<(), DisplayError> {
        self.conn
            .change_property32(
                PropMode::REPLACE,
                xid(window),
                self.opacity_atom,
                AtomEnum::CARDINAL,
                &[opacity_value(percent)],
            )
            .or_request("ChangeProperty")?;
        Ok(())
    }

    fn set_click_through(&self, window: WindowHandle) -> Result<(), DisplayError> {
        if !self.has_xfixes {
            return Err(DisplayError::Unsupported("XFIXES extension"));
        }
        let region = self.conn.generate_id().or_request("XFixesCreateRegion")?;
        self.conn
            .xfixes_create_region(region, &[])
            .or_request("XFixesCreateRegion")?
            .check()
            .or_request("XFixesCreateRegion")?;
        let applied = self
            .conn
            .xfixes_set_window_shape_region(xid(window), shape::SK::INPUT, 0, 0, region)
            .or_request("XFixesSetWindowShapeRegion")
            .and_then(|cookie| cookie.check().or_request("XFixesSetWindowShapeRegion"));
        self.conn
            .xfixes_destroy_region(region)
            .or_request("XFixesDestroyRegion")?;
        applied
    }

    fn query_cursor_position(&self) -> Result<Point, DisplayError> {
        let reply = self
            .conn
            .query_pointer(self.root)
            .or_request("QueryPointer")?
            .reply()
            .or_request("QueryPointer")?;
        Ok(Point::new(i32::from(reply.root_x), i32::from(reply.root_y)))
    }

    fn register_global_hotkey(
        &self,
        hotkey: &Hotkey,
        callback: HotkeyCallback,
    ) -> Result<(), DisplayError> {
        self.hotkeys
            .register(&self.conn, self.root, hotkey, callback)
    }

    fn create_graphics_context(
        &self,
        window: WindowHandle,
        stroke: &Stroke,
    ) -> Result<GcHandle, DisplayError> {
        let gc = self.conn.generate_id().or_request("CreateGC")?;
        self.conn
            .create_gc(
                gc,
                xid(window),
                &CreateGCAux::new()
                    .foreground(stroke.color.0)
                    .line_width(stroke.width)
                    .cap_style(CapStyle::ROUND)
                    .join_style(JoinStyle::ROUND),
            )
            .or_request("CreateGC")?
            .check()
            .or_request("CreateGC")?;
        Ok(GcHandle(u64::from(gc)))
    }

    fn draw_line(
        &self,
        window: WindowHandle,
        gc: GcHandle,
        from: Point,
        to: Point,
    ) -> Result<(), DisplayError> {
        self.conn
            .poly_line(
                CoordMode::ORIGIN,
                xid(window),
                gc.0 as xproto::Gcontext,
                &[xpoint(from), xpoint(to)],
            )
            .or_request("PolyLine")?;
        Ok(())
    }

    fn create_mask_surface(
        &self,
        width: u32,
        height: u32,
        stroke: &Stroke,
        from: Point,
        to: Point,
    ) -> Result<MaskHandle, DisplayError> {
        self.require_shape()?;
        let (width, height) = (extent(width), extent(height));

        let pixmap = self.conn.generate_id().or_request("CreatePixmap")?;
        self.conn
            .create_pixmap(1, pixmap, self.root, width, height)
            .or_request("CreatePixmap")?
            .check()
            .or_request("CreatePixmap")?;

        let gc = self.conn.generate_id().or_request("CreateGC")?;
        let drawn = self
            .conn
            .create_gc(
                gc,
                pixmap,
                &CreateGCAux::new().foreground(0).background(0),
            )
            .or_request("CreateGC")
            .and_then(|cookie| cookie.check().or_request("CreateGC"))
            .and_then(|()| {
                // Clear to transparent, then set only the stroke's pixels.
                self.conn
                    .poly_fill_rectangle(
                        pixmap,
                        gc,
                        &[Rectangle {
                            x: 0,
                            y: 0,
                            width,
                            height,
                        }],
                    )
                    .or_request("PolyFillRectangle")?;
                self.conn
                    .change_gc(
                        gc,
                        &ChangeGCAux::new()
                            .foreground(1)
                            .line_width(stroke.width)
                            .cap_style(CapStyle::ROUND)
                            .join_style(JoinStyle::ROUND),
                    )
                    .or_request("ChangeGC")?;
                self.conn
                    .poly_line(CoordMode::ORIGIN, pixmap, gc, &[xpoint(from), xpoint(to)])
                    .or_request("PolyLine")?;
                self.conn.free_gc(gc).or_request("FreeGC")?;
                Ok(())
            });

        if let Err(err) = drawn {
            let _ = self.conn.free_pixmap(pixmap);
            return Err(err);
        }
        Ok(MaskHandle(u64::from(pixmap)))
    }

    fn apply_shape_mask(
        &self,
        window: WindowHandle,
        mask: MaskHandle,
    ) -> Result<(), DisplayError> {
        let pixmap = mask.0 as xproto::Pixmap;
        let applied = self.require_shape().and_then(|()| {
            self.conn
                .shape_mask(shape::SO::SET, shape::SK::BOUNDING, xid(window), 0, 0, pixmap)
                .or_request("ShapeMask")?;
            Ok(())
        });
        self.conn.free_pixmap(pixmap).or_request("FreePixmap")?;
        applied
    }

    fn free_graphics_context(&self, gc: GcHandle) -> Result<(), DisplayError> {
        self.conn
            .free_gc(gc.0 as xproto::Gcontext)
            .or_request("FreeGC")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), DisplayError> {
        self.conn.flush().or_request("flush")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_spans_the_cardinal_range() {
        assert_eq!(opacity_value(0.0), 0);
        assert_eq!(opacity_value(100.0), u32::MAX);
        assert_eq!(opacity_value(250.0), u32::MAX);
        assert_eq!(opacity_value(50.0), u32::MAX / 2);
    }

    #[test]
    fn coordinates_are_clamped_to_protocol_limits() {
        assert_eq!(coord(-20), -20);
        assert_eq!(coord(70_000), i16::MAX);
        assert_eq!(extent(0), 1);
        assert_eq!(extent(1920), 1920);
        assert_eq!(extent(100_000), u16::MAX);
    }
}
