// cursor-ruler for X11. Needs a compositing manager for translucency and the
// SHAPE and XFIXES extensions for click-through and trail shapes.

mod display;
mod hotkeys;

use std::process::ExitCode;

fn main() -> ExitCode {
    cursor_ruler_shared::app::run(display::X11Display::connect)
}
