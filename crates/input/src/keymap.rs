use std::fmt;
use std::str::FromStr;

use crate::action::{Action, AgentAction};

/// Key symbols the viewer reacts to, plus a catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    H,
    O,
    Up,
    Down,
    Left,
    Right,
    Other(char),
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognised key {0:?}")]
pub struct ParseKeyError(pub String);

impl FromStr for Key {
    type Err = ParseKeyError;

    /// Accepts single characters (case-insensitive) and arrow names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let key = match lower.as_str() {
            "w" => Self::W,
            "a" => Self::A,
            "s" => Self::S,
            "d" => Self::D,
            "h" => Self::H,
            "o" => Self::O,
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Other(c),
                    _ => return Err(ParseKeyError(s.to_owned())),
                }
            }
        };
        Ok(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::W => f.write_str("W"),
            Self::A => f.write_str("A"),
            Self::S => f.write_str("S"),
            Self::D => f.write_str("D"),
            Self::H => f.write_str("H"),
            Self::O => f.write_str("O"),
            Self::Up => f.write_str("Up"),
            Self::Down => f.write_str("Down"),
            Self::Left => f.write_str("Left"),
            Self::Right => f.write_str("Right"),
            Self::Other(c) => write!(f, "{}", c.to_ascii_uppercase()),
        }
    }
}

/// Every bound key, in display order.
pub const BINDINGS: &[(Key, Action)] = &[
    (Key::W, Action::Agent(AgentAction::MoveForward)),
    (Key::S, Action::Agent(AgentAction::MoveBackward)),
    (Key::Up, Action::Agent(AgentAction::LookUp)),
    (Key::Down, Action::Agent(AgentAction::LookDown)),
    (Key::Right, Action::Agent(AgentAction::TurnRight)),
    (Key::D, Action::Agent(AgentAction::TurnRight)),
    (Key::Left, Action::Agent(AgentAction::TurnLeft)),
    (Key::A, Action::Agent(AgentAction::TurnLeft)),
    (Key::H, Action::Agent(AgentAction::GrabRelease)),
    (Key::O, Action::SpawnObject),
];

/// Look up the action bound to `key`.
pub fn dispatch(key: Key) -> Action {
    BINDINGS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, action)| *action)
        .unwrap_or(Action::Noop)
}
