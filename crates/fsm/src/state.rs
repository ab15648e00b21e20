//! State identifiers: a state name paired with one of five substates.

use std::fmt;

/// Name of a state. States are declared statically by the owning type.
pub type StateName = &'static str;

/// The resting state every tool and widget starts in and resets to.
pub const MAIN: StateName = "main";

/// Role a registered handler plays for its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Substate {
    /// Per-tick body of the state. Required for a state to be handled.
    Main,
    /// Guard run before entering the state; may veto the transition.
    CanEnter,
    /// Guard run before leaving the state; may veto the transition.
    CanExit,
    /// Hook run after the state becomes current.
    Enter,
    /// Hook run before the state stops being current.
    Exit,
}

impl Substate {
    /// Human-readable label used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Substate::Main => "main",
            Substate::CanEnter => "can enter",
            Substate::CanExit => "can exit",
            Substate::Enter => "enter",
            Substate::Exit => "exit",
        }
    }
}

impl fmt::Display for Substate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A `(state, substate)` pair keying the handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId {
    pub state: StateName,
    pub substate: Substate,
}

impl StateId {
    pub fn new(state: StateName, substate: Substate) -> Self {
        Self { state, substate }
    }

    /// The `main` substate of `state`.
    pub fn main(state: StateName) -> Self {
        Self::new(state, Substate::Main)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}__{}", self.state, self.substate)
    }
}
