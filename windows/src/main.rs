// cursor-ruler for Windows: layered, click-through topmost windows driven by
// the shared overlay engine.

#[cfg(windows)]
mod display;
#[cfg(windows)]
mod hotkeys;

use std::process::ExitCode;

#[cfg(windows)]
fn main() -> ExitCode {
    cursor_ruler_shared::app::run(display::Win32Display::connect)
}

#[cfg(not(windows))]
fn main() -> ExitCode {
    eprintln!("cursor-ruler-win only runs on Windows; use the cursor-ruler build on X11");
    ExitCode::FAILURE
}
