use std::fmt;

/// A discrete action from the agent's default action space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentAction {
    MoveForward,
    MoveBackward,
    TurnLeft,
    TurnRight,
    LookUp,
    LookDown,
    GrabRelease,
}

impl AgentAction {
    pub const ALL: [AgentAction; 7] = [
        Self::MoveForward,
        Self::MoveBackward,
        Self::TurnLeft,
        Self::TurnRight,
        Self::LookUp,
        Self::LookDown,
        Self::GrabRelease,
    ];

    /// Name of the action in the agent's action space.
    pub fn name(self) -> &'static str {
        match self {
            Self::MoveForward => "move_forward",
            Self::MoveBackward => "move_backward",
            Self::TurnLeft => "turn_left",
            Self::TurnRight => "turn_right",
            Self::LookUp => "look_up",
            Self::LookDown => "look_down",
            Self::GrabRelease => "grab_release_object",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

/// What a key press asks the front end to do.
///
/// Front ends consume actions, never raw input events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Step the default agent with a named action.
    Agent(AgentAction),
    /// Add an object just in front of the agent.
    SpawnObject,
    /// Key is not bound.
    Noop,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent(a) => f.write_str(a.name()),
            Self::SpawnObject => f.write_str("spawn_object"),
            Self::Noop => f.write_str("noop"),
        }
    }
}
