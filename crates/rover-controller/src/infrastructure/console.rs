//! Line-oriented operator console.
//!
//! Each line typed on stdin is one operator action:
//!
//! ```text
//! move <x> <y>   steer; both axes in [-1, 1], "move 0 0" stops
//! speed <v>      speed bias in [0, 1]
//! stop           emergency stop (skips anything still queued)
//! help           list commands
//! quit           exit the controller
//! ```

use thiserror::Error;
use tracing::{info, warn};

use crate::application::operator_input::OperatorInput;

/// One parsed console line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    Move { x: f64, y: f64 },
    Speed(f64),
    Stop,
    Help,
    Quit,
}

/// A console line that could not be understood.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown command {0:?} (try \"help\")")]
    UnknownCommand(String),

    #[error("{command} expects {expected} argument(s)")]
    WrongArity {
        command: &'static str,
        expected: usize,
    },

    #[error("{0:?} is not a number")]
    NotANumber(String),
}

/// Usage text printed by `help`.
pub const HELP: &str = "commands: move <x> <y> | speed <v> | stop | help | quit";

/// Parses one console line.  Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns [`ParseError`] for unknown commands, wrong argument counts, or
/// non-numeric arguments.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let parsed = match command.to_ascii_lowercase().as_str() {
        "move" => {
            let [x, y] = expect_args::<2>("move", &args)?;
            ConsoleCommand::Move {
                x: number(x)?,
                y: number(y)?,
            }
        }
        "speed" => {
            let [v] = expect_args::<1>("speed", &args)?;
            ConsoleCommand::Speed(number(v)?)
        }
        "stop" => {
            expect_args::<0>("stop", &args)?;
            ConsoleCommand::Stop
        }
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(parsed))
}

fn expect_args<'a, const N: usize>(
    command: &'static str,
    args: &[&'a str],
) -> Result<[&'a str; N], ParseError> {
    <[&str; N]>::try_from(args).map_err(|_| ParseError::WrongArity {
        command,
        expected: N,
    })
}

fn number(word: &str) -> Result<f64, ParseError> {
    word.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::NotANumber(word.to_string()))
}

/// Applies a parsed command.  Returns `false` when the operator asked to quit.
pub fn apply(command: ConsoleCommand, input: &mut OperatorInput) -> bool {
    let result = match command {
        ConsoleCommand::Move { x, y } => input.steer(x, y),
        ConsoleCommand::Speed(v) => input.set_speed(v).map(|_| ()),
        ConsoleCommand::Stop => {
            input.emergency_stop();
            Ok(())
        }
        ConsoleCommand::Help => {
            info!("{HELP}");
            Ok(())
        }
        ConsoleCommand::Quit => return false,
    };
    if let Err(e) = result {
        warn!("rejected input: {e}");
    }
    true
}

// ── Tests ─────────────────────────────────────────────────────────────────────
