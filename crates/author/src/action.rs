use karel_common::Cell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// World-builder tool applied when a cell is tapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// Tapping moves Karel.
    #[default]
    None,
    AddBeeper,
    RemoveBeeper,
    AddObstacle,
    RemoveObstacle,
}

impl Tool {
    fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::AddBeeper => "add_beeper",
            Self::RemoveBeeper => "remove_beeper",
            Self::AddObstacle => "add_obstacle",
            Self::RemoveObstacle => "remove_obstacle",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "add_beeper" => Ok(Self::AddBeeper),
            "remove_beeper" => Ok(Self::RemoveBeeper),
            "add_obstacle" => Ok(Self::AddObstacle),
            "remove_obstacle" => Ok(Self::RemoveObstacle),
            other => Err(ParseActionError::UnknownTool(other.to_owned())),
        }
    }
}

/// A high-level user action. Front-ends produce these; the session consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Move,
    TurnLeft,
    TurnRight,
    TurnAround,
    PutBeeper,
    PickBeeper,
    SelectTool(Tool),
    /// Apply the active tool to a cell.
    Tap(Cell),
    /// Remove every beeper and obstacle.
    Clear,
    Resize { rows: u32, cols: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseActionError {
    #[error("unknown action {0:?}")]
    UnknownAction(String),
    #[error("unknown tool {0:?}")]
    UnknownTool(String),
    #[error("malformed argument {arg:?} for {action}")]
    BadArgument { action: &'static str, arg: String },
}

impl FromStr for Action {
    type Err = ParseActionError;

    /// Parses `move`, `turn_left`, `tool:add_beeper`, `tap:2,3`, `resize:4x6`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (head, arg) = match s.split_once(':') {
            Some((head, arg)) => (head, Some(arg.trim())),
            None => (s, None),
        };
        match (head, arg) {
            ("move", None) => Ok(Self::Move),
            ("turn_left", None) => Ok(Self::TurnLeft),
            ("turn_right", None) => Ok(Self::TurnRight),
            ("turn_around", None) => Ok(Self::TurnAround),
            ("put_beeper", None) => Ok(Self::PutBeeper),
            ("pick_beeper", None) => Ok(Self::PickBeeper),
            ("clear", None) => Ok(Self::Clear),
            ("tool", Some(arg)) => arg.parse().map(Self::SelectTool),
            ("tap", Some(arg)) => {
                let (row, col) = parse_pair(arg, ',').ok_or_else(|| ParseActionError::BadArgument {
                    action: "tap",
                    arg: arg.to_owned(),
                })?;
                Ok(Self::Tap(Cell::new(row, col)))
            }
            ("resize", Some(arg)) => {
                let (rows, cols) = parse_pair(arg, 'x').ok_or_else(|| ParseActionError::BadArgument {
                    action: "resize",
                    arg: arg.to_owned(),
                })?;
                Ok(Self::Resize { rows, cols })
            }
            _ => Err(ParseActionError::UnknownAction(s.to_owned())),
        }
    }
}

fn parse_pair<T: FromStr>(arg: &str, sep: char) -> Option<(T, T)> {
    let (a, b) = arg.split_once(sep)?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_karel_commands() {
        assert_eq!("move".parse(), Ok(Action::Move));
        assert_eq!("turn_left".parse(), Ok(Action::TurnLeft));
        assert_eq!("turn_right".parse(), Ok(Action::TurnRight));
        assert_eq!(" turn_around ".parse(), Ok(Action::TurnAround));
        assert_eq!("put_beeper".parse(), Ok(Action::PutBeeper));
        assert_eq!("pick_beeper".parse(), Ok(Action::PickBeeper));
        assert_eq!("clear".parse(), Ok(Action::Clear));
    }

    #[test]
    fn parse_tool_selection() {
        assert_eq!(
            "tool:add_obstacle".parse(),
            Ok(Action::SelectTool(Tool::AddObstacle))
        );
        assert_eq!("tool:none".parse(), Ok(Action::SelectTool(Tool::None)));
        assert!(matches!(
            "tool:hammer".parse::<Action>(),
            Err(ParseActionError::UnknownTool(_))
        ));
    }

    #[test]
    fn parse_tap_and_resize() {
        assert_eq!("tap:2,3".parse(), Ok(Action::Tap(Cell::new(2, 3))));
        assert_eq!("tap: 0 , 4".parse(), Ok(Action::Tap(Cell::new(0, 4))));
        assert_eq!(
            "resize:4x6".parse(),
            Ok(Action::Resize { rows: 4, cols: 6 })
        );
        assert!(matches!(
            "tap:2".parse::<Action>(),
            Err(ParseActionError::BadArgument { action: "tap", .. })
        ));
        assert!(matches!(
            "resize:-1x3".parse::<Action>(),
            Err(ParseActionError::BadArgument { .. })
        ));
    }

    #[test]
    fn unknown_or_misplaced_arguments_rejected() {
        assert!("jump".parse::<Action>().is_err());
        assert!("move:3".parse::<Action>().is_err());
        assert!("tap".parse::<Action>().is_err());
    }

    #[test]
    fn tool_display_parses_back() {
        for tool in [
            Tool::None,
            Tool::AddBeeper,
            Tool::RemoveBeeper,
            Tool::AddObstacle,
            Tool::RemoveObstacle,
        ] {
            assert_eq!(tool.to_string().parse::<Tool>(), Ok(tool));
        }
    }
}
