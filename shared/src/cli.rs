// Command-line parsing. The surface is small enough to walk the arguments by
// hand.

use crate::error::CliError;
use crate::mode::ModeKind;

pub const USAGE: &str = "\
Usage: cursor-ruler [OPTIONS]

Horizontal ruler that follows the mouse cursor.

Options:
  -m, --mode <MODE>  Mode: ruler (default) or hide
      --trail        Draw a fading trail behind the pointer
  -v, --verbose      Debug logging (honours RUST_LOG)
  -h, --help         Print this help

Hotkeys (defaults, see config.json):
  Ctrl+Shift+Space   Toggle the overlay
  Ctrl+Shift+Q       Quit";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub mode: ModeKind,
    pub trail: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(CliArgs),
    Help,
}

/// Parse arguments, excluding the program name.
pub fn parse<I>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter().map(Into::into);

    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--mode=") {
            parsed.mode = value.parse()?;
            continue;
        }
        match arg.as_str() {
            "-m" | "--mode" => {
                let value = args.next().ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                parsed.mode = value.parse()?;
            }
            "--trail" => parsed.trail = true,
            "-v" | "--verbose" => parsed.verbose = true,
            "-h" | "--help" => return Ok(Command::Help),
            _ => return Err(CliError::UnknownOption(arg)),
        }
    }
    Ok(Command::Run(parsed))
}
