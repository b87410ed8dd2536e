// Process entry shared by the platform binaries: parse arguments, load
// settings, start the engine and map failures to exit codes.

use std::process::ExitCode;

use crate::cli::{self, Command};
use crate::config;
use crate::display::DisplayServer;
use crate::engine::Ruler;
use crate::error::DisplayError;
use crate::logging;
use crate::mode::Mode;
use crate::APP_VERSION;

/// Run cursor-ruler on the display server produced by `connect`.
pub fn run<D, F>(connect: F) -> ExitCode
where
    D: DisplayServer,
    F: FnOnce() -> Result<D, DisplayError>,
{
    let args = match cli::parse(std::env::args().skip(1)) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Help) => {
            println!("cursor-ruler {APP_VERSION}\n\n{}", cli::USAGE);
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("{err}\n\n{}", cli::USAGE);
            return ExitCode::from(err.exit_code());
        }
    };

    logging::init(args.verbose);

    let mut settings = config::load_settings();
    if args.trail {
        settings.trail.enabled = true;
    }
    let mode = Mode::from_kind(args.mode, &settings.hide, &settings.ruler);

    let ruler = match Ruler::init(connect, mode, &settings) {
        Ok(ruler) => ruler,
        Err(err) => {
            tracing::error!("startup aborted: {err}");
            return ExitCode::FAILURE;
        }
    };

    match ruler.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
