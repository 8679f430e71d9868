//! Console command parsing.
//!
//! ```text
//! q | quit            stop the simulation
//! s | status [ID]     print fleet status, or one elevator
//! up FLOOR            hall call going up
//! down FLOOR          hall call going down
//! go FROM TO          destination request
//! h | help            list commands
//! ```

use elevator_core::{ElevatorError, ElevatorId, ElevatorRequest};

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quit,
    Status(Option<ElevatorId>),
    Request(ElevatorRequest),
    Help,
}

/// Why a console line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command `{0}` (type `h` for help)")]
    Unknown(String),

    #[error("`{command}` expects {expected}")]
    Arity {
        command: &'static str,
        expected: &'static str,
    },

    #[error("`{0}` is not a floor or elevator number")]
    NotANumber(String),

    #[error(transparent)]
    Request(#[from] ElevatorError),
}

pub const HELP: &str = "commands: q (quit), s [ID] (status), up N, down N, go FROM TO, h (help)";

/// Parse one line of console input.
///
/// # Errors
///
/// Returns [`CommandError`] describing the first problem found.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Empty);
    };
    let args: Vec<&str> = words.collect();

    match head.to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => Ok(Command::Quit),
        "h" | "help" | "?" => Ok(Command::Help),
        "s" | "status" => match args.as_slice() {
            [] => Ok(Command::Status(None)),
            [id] => Ok(Command::Status(Some(ElevatorId(number(id)?)))),
            _ => Err(CommandError::Arity {
                command: "status",
                expected: "at most one elevator id",
            }),
        },
        "up" => Ok(Command::Request(ElevatorRequest::up(single_floor("up", &args)?))),
        "down" => Ok(Command::Request(ElevatorRequest::down(single_floor("down", &args)?))),
        "go" => match args.as_slice() {
            [from, to] => Ok(Command::Request(ElevatorRequest::destination(
                number(from)?,
                number(to)?,
            )?)),
            _ => Err(CommandError::Arity {
                command: "go",
                expected: "a start floor and a destination floor",
            }),
        },
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn single_floor(command: &'static str, args: &[&str]) -> Result<u32, CommandError> {
    match args {
        [floor] => number(floor),
        _ => Err(CommandError::Arity {
            command,
            expected: "one floor",
        }),
    }
}

fn number(word: &str) -> Result<u32, CommandError> {
    word.parse()
        .map_err(|_| CommandError::NotANumber(word.to_string()))
}

#[cfg(test)]
mod tests {
    use elevator_core::RequestType;

    use super::*;

    #[test]
    fn test_quit_and_help() {
        assert_eq!(parse("q"), Ok(Command::Quit));
        assert_eq!(parse("  QUIT "), Ok(Command::Quit));
        assert_eq!(parse("h"), Ok(Command::Help));
    }

    #[test]
    fn test_status() {
        assert_eq!(parse("s"), Ok(Command::Status(None)));
        assert_eq!(parse("status 3"), Ok(Command::Status(Some(ElevatorId(3)))));
        assert!(matches!(parse("s 1 2"), Err(CommandError::Arity { .. })));
    }

    #[test]
    fn test_hall_calls() {
        let Ok(Command::Request(request)) = parse("up 4") else {
            panic!("expected a request");
        };
        assert_eq!(request.floor(), 4);
        assert_eq!(request.request_type(), RequestType::Up);

        let Ok(Command::Request(request)) = parse("down 9") else {
            panic!("expected a request");
        };
        assert_eq!(request.request_type(), RequestType::Down);
    }

    #[test]
    fn test_destination_request() {
        let Ok(Command::Request(request)) = parse("go 2 8") else {
            panic!("expected a request");
        };
        assert_eq!(request.floor(), 2);
        assert_eq!(request.destination_floor(), Some(8));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("   "), Err(CommandError::Empty));
        assert_eq!(parse("fly 3"), Err(CommandError::Unknown("fly".to_string())));
        assert_eq!(parse("up x"), Err(CommandError::NotANumber("x".to_string())));
        assert!(matches!(parse("up"), Err(CommandError::Arity { command: "up", .. })));
        assert_eq!(
            parse("go 5 5"),
            Err(CommandError::Request(ElevatorError::SameFloorDestination(5)))
        );
    }
}
