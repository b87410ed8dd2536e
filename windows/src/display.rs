// Win32 display server built from layered popup windows.
//
// Every overlay is a WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW popup
// owned by the polling thread. Opacity is the layered alpha, click-through
// is WS_EX_TRANSPARENT, and trail shapes are window regions widened from the
// stroke path. The background color lives in GWLP_USERDATA and is painted on
// WM_ERASEBKGND.

use std::cell::RefCell;
use std::ffi::c_void;

use cursor_ruler_shared::hotkey::Hotkey;
use cursor_ruler_shared::{
    Color, DisplayError, DisplayServer, GcHandle, HotkeyCallback, MaskHandle, Point, Rect,
    ScreenBounds, Stroke, WindowHandle,
};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, POINT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPath, CreateCompatibleDC, CreatePen, CreateSolidBrush, DeleteDC, DeleteObject, EndPath,
    FillRect, GetDC, LineTo, MoveToEx, PathToRegion, ReleaseDC, SelectObject, SetWindowRgn,
    WidenPath, HDC, HGDIOBJ, HPEN, HRGN, PS_SOLID,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetClientRect,
    GetCursorPos, GetSystemMetrics, GetWindowLongPtrW, PeekMessageW, RegisterClassW,
    SetLayeredWindowAttributes, SetWindowLongPtrW, SetWindowPos, ShowWindow, TranslateMessage,
    CS_HREDRAW, CS_VREDRAW, GWLP_USERDATA, GWL_EXSTYLE, HWND_TOPMOST, LWA_ALPHA, MSG,
    PM_REMOVE, SM_CXSCREEN, SM_CYSCREEN, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SW_HIDE,
    SW_SHOWNOACTIVATE, WM_ERASEBKGND, WNDCLASSW, WS_EX_LAYERED, WS_EX_NOACTIVATE,
    WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};

use crate::hotkeys::HotkeyThread;

const CLASS_NAME: &str = "CursorRulerOverlay\0";

fn hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as isize as *mut c_void)
}

fn handle(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as isize as u64)
}

/// GDI wants 0x00bbggrr.
fn colorref(color: Color) -> COLORREF {
    COLORREF(
        u32::from(color.red()) | u32::from(color.green()) << 8 | u32::from(color.blue()) << 16,
    )
}

fn alpha(percent: f64) -> u8 {
    (percent.clamp(0.0, 100.0) / 100.0 * 255.0).round() as u8
}

fn extent(value: u32) -> i32 {
    i32::try_from(value.max(1)).unwrap_or(i32::MAX)
}

fn last_error(request: &'static str) -> DisplayError {
    DisplayError::request(request, windows::core::Error::from_win32())
}

/// Paints the client area with the color stored in GWLP_USERDATA.
unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_ERASEBKGND {
        let hdc = HDC(wparam.0 as *mut c_void);
        let color = COLORREF(GetWindowLongPtrW(hwnd, GWLP_USERDATA) as u32);
        let mut rect = RECT::default();
        if GetClientRect(hwnd, &mut rect).is_ok() {
            let brush = CreateSolidBrush(color);
            FillRect(hdc, &rect, brush);
            let _ = DeleteObject(brush.into());
        }
        return LRESULT(1);
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

fn register_class() -> Result<(), DisplayError> {
    unsafe {
        let hinstance = GetModuleHandleW(PCWSTR::null()).map_err(|e| DisplayError::Connection(e.to_string()))?;
        let class_name: Vec<u16> = CLASS_NAME.encode_utf16().collect();

        let wc = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(window_proc),
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };

        if RegisterClassW(&wc) == 0 {
            return Err(DisplayError::Connection(format!(
                "RegisterClassW: {}",
                windows::core::Error::from_win32()
            )));
        }
    }
    Ok(())
}

pub struct Win32Display {
    bounds: ScreenBounds,
    hotkeys: RefCell<Vec<HotkeyThread>>,
}

impl Win32Display {
    /// Register the overlay window class and read the primary screen size.
    pub fn connect() -> Result<Self, DisplayError> {
        register_class()?;
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        if width <= 0 || height <= 0 {
            return Err(DisplayError::Connection("no primary display".into()));
        }
        tracing::debug!(width, height, "Win32 display ready");
        Ok(Self {
            bounds: ScreenBounds::new(width as u32, height as u32),
            hotkeys: RefCell::new(Vec::new()),
        })
    }
}

impl DisplayServer for Win32Display {
    fn screen_bounds(&self) -> ScreenBounds {
        self.bounds
    }

    fn create_overlay_window(
        &self,
        rect: Rect,
        background: Color,
    ) -> Result<WindowHandle, DisplayError> {
        unsafe {
            let hinstance = GetModuleHandleW(PCWSTR::null())
                .map_err(|e| DisplayError::request("GetModuleHandleW", e))?;
            let class_name: Vec<u16> = CLASS_NAME.encode_utf16().collect();

            let hwnd = CreateWindowExW(
                WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE,
                PCWSTR(class_name.as_ptr()),
                PCWSTR::null(),
                WS_POPUP,
                rect.x,
                rect.y,
                extent(rect.width),
                extent(rect.height),
                None,
                None,
                Some(hinstance.into()),
                None,
            )
            .map_err(|e| DisplayError::request("CreateWindowExW", e))?;

            SetWindowLongPtrW(hwnd, GWLP_USERDATA, colorref(background).0 as isize);
            // Layered windows stay invisible until their attributes are set.
            if let Err(e) = SetLayeredWindowAttributes(hwnd, COLORREF(0), 255, LWA_ALPHA) {
                let _ = DestroyWindow(hwnd);
                return Err(DisplayError::request("SetLayeredWindowAttributes", e));
            }
            Ok(handle(hwnd))
        }
    }

    fn map_window(&self, window: WindowHandle) -> Result<(), DisplayError> {
        unsafe {
            let _ = ShowWindow(hwnd(window), SW_SHOWNOACTIVATE);
            SetWindowPos(
                hwnd(window),
                Some(HWND_TOPMOST),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            )
            .map_err(|e| DisplayError::request("SetWindowPos", e))
        }
    }

    fn unmap_window(&self, window: WindowHandle) -> Result<(), DisplayError> {
        unsafe {
            let _ = ShowWindow(hwnd(window), SW_HIDE);
        }
        Ok(())
    }

    fn destroy_window(&self, window: WindowHandle) -> Result<(), DisplayError> {
        unsafe { DestroyWindow(hwnd(window)) }.map_err(|e| DisplayError::request("DestroyWindow", e))
    }

    fn configure_window(&self, window: WindowHandle, rect: Rect) -> Result<(), DisplayError> {
        unsafe {
            SetWindowPos(
                hwnd(window),
                Some(HWND_TOPMOST),
                rect.x,
                rect.y,
                extent(rect.width),
                extent(rect.height),
                SWP_NOACTIVATE,
            )
        }
        .map_err(|e| DisplayError::request("SetWindowPos", e))
    }

    fn set_window_opacity(&self, window: WindowHandle, percent: f64) -> Result<(), DisplayError> {
        unsafe { SetLayeredWindowAttributes(hwnd(window), COLORREF(0), alpha(percent), LWA_ALPHA) }
            .map_err(|e| DisplayError::request("SetLayeredWindowAttributes", e))
    }

    fn set_click_through(&self, window: WindowHandle) -> Result<(), DisplayError> {
        unsafe {
            let style = GetWindowLongPtrW(hwnd(window), GWL_EXSTYLE);
            let transparent = (WS_EX_TRANSPARENT.0 | WS_EX_LAYERED.0) as isize;
            if SetWindowLongPtrW(hwnd(window), GWL_EXSTYLE, style | transparent) == 0 && style != 0 {
                return Err(last_error("SetWindowLongPtrW"));
            }
        }
        Ok(())
    }

    fn query_cursor_position(&self) -> Result<Point, DisplayError> {
        let mut point = POINT::default();
        unsafe { GetCursorPos(&mut point) }.map_err(|e| DisplayError::request("GetCursorPos", e))?;
        Ok(Point::new(point.x, point.y))
    }

    fn register_global_hotkey(
        &self,
        hotkey: &Hotkey,
        callback: HotkeyCallback,
    ) -> Result<(), DisplayError> {
        let thread = HotkeyThread::spawn(hotkey, callback)?;
        self.hotkeys.borrow_mut().push(thread);
        Ok(())
    }

    fn create_graphics_context(
        &self,
        _window: WindowHandle,
        stroke: &Stroke,
    ) -> Result<GcHandle, DisplayError> {
        let pen = unsafe { CreatePen(PS_SOLID, extent(stroke.width), colorref(stroke.color)) };
        if pen.is_invalid() {
            return Err(last_error("CreatePen"));
        }
        Ok(GcHandle(pen.0 as isize as u64))
    }

    fn draw_line(
        &self,
        window: WindowHandle,
        gc: GcHandle,
        from: Point,
        to: Point,
    ) -> Result<(), DisplayError> {
        unsafe {
            let hdc = GetDC(Some(hwnd(window)));
            if hdc.is_invalid() {
                return Err(last_error("GetDC"));
            }
            let previous = SelectObject(hdc, HGDIOBJ(gc.0 as isize as *mut c_void));
            let _ = MoveToEx(hdc, from.x, from.y, None);
            let drawn = LineTo(hdc, to.x, to.y).as_bool();
            SelectObject(hdc, previous);
            ReleaseDC(Some(hwnd(window)), hdc);
            if !drawn {
                return Err(last_error("LineTo"));
            }
        }
        Ok(())
    }

    fn create_mask_surface(
        &self,
        _width: u32,
        _height: u32,
        stroke: &Stroke,
        from: Point,
        to: Point,
    ) -> Result<MaskHandle, DisplayError> {
        unsafe {
            let hdc = CreateCompatibleDC(None);
            if hdc.is_invalid() {
                return Err(last_error("CreateCompatibleDC"));
            }
            let pen: HPEN = CreatePen(PS_SOLID, extent(stroke.width), COLORREF(0));
            let previous = SelectObject(hdc, pen.into());

            // Widening the stroke path yields the region the line covers.
            let _ = BeginPath(hdc);
            let _ = MoveToEx(hdc, from.x, from.y, None);
            let _ = LineTo(hdc, to.x, to.y);
            let _ = EndPath(hdc);
            let widened = WidenPath(hdc).as_bool();
            let region = if widened { PathToRegion(hdc) } else { HRGN::default() };

            SelectObject(hdc, previous);
            let _ = DeleteObject(pen.into());
            let _ = DeleteDC(hdc);

            if region.is_invalid() {
                return Err(last_error("PathToRegion"));
            }
            Ok(MaskHandle(region.0 as isize as u64))
        }
    }

    fn apply_shape_mask(
        &self,
        window: WindowHandle,
        mask: MaskHandle,
    ) -> Result<(), DisplayError> {
        let region = HRGN(mask.0 as isize as *mut c_void);
        // On success the system owns the region.
        if unsafe { SetWindowRgn(hwnd(window), Some(region), true) } == 0 {
            let err = last_error("SetWindowRgn");
            unsafe {
                let _ = DeleteObject(region.into());
            }
            return Err(err);
        }
        Ok(())
    }

    fn free_graphics_context(&self, gc: GcHandle) -> Result<(), DisplayError> {
        if unsafe { DeleteObject(HGDIOBJ(gc.0 as isize as *mut c_void)) }.as_bool() {
            Ok(())
        } else {
            Err(DisplayError::request("DeleteObject", "invalid pen"))
        }
    }

    /// Pump this thread's queue so the overlay windows repaint.
    fn flush(&self) -> Result<(), DisplayError> {
        let mut msg = MSG::default();
        unsafe {
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorref_swaps_to_bgr() {
        assert_eq!(colorref(Color(0xff0000)).0, 0x0000ff);
        assert_eq!(colorref(Color(0x123456)).0, 0x563412);
    }

    #[test]
    fn alpha_scales_percent() {
        assert_eq!(alpha(100.0), 255);
        assert_eq!(alpha(0.0), 0);
        assert_eq!(alpha(94.0), 240);
        assert_eq!(alpha(150.0), 255);
    }
}
