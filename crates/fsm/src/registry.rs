//! Construction-time handler registry.
//!
//! An owner type declares its states, guards, hooks, event callbacks and
//! exception handlers once by filling a [`CallbackRegistry`]. Shared behaviour
//! is composed by calling another registration helper on the same registry,
//! so a "mixin" is just a function taking `&mut CallbackRegistry<O, C>`.
//!
//! Handlers are plain function pointers. Non-capturing closures coerce to
//! them, so both `Self::method` and `|owner, cx| { .. }` can be registered.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::{ConfigError, HandlerResult};
use crate::outcome::{Outcome, Signal};
use crate::recovery::Fault;
use crate::state::{StateId, StateName, Substate};

/// Body of a state: runs once per update while the state is current.
pub type MainFn<O, C> = fn(&mut O, &mut C) -> HandlerResult<Outcome>;
/// `can enter` / `can exit` guard. Returning `false` vetoes the transition.
pub type GuardFn<O, C> = fn(&mut O, &mut C) -> HandlerResult<bool>;
/// `enter` / `exit` hook.
pub type HookFn<O, C> = fn(&mut O, &mut C) -> HandlerResult<()>;
/// Event callback; results of every callback for an event are collected.
pub type CallbackFn<O, C> = fn(&mut O, &mut C) -> HandlerResult<Option<Signal>>;
/// Owner-level exception handler.
pub type ExceptionFn<O> = fn(&mut O, &Fault) -> HandlerResult<()>;

/// Event buckets callbacks are registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Controller construction.
    Init,
    /// Tool (re)selected, undo/redo.
    Reset,
    /// Periodic timer wake-up.
    Timer,
    /// The edited target changed (selection or geometry).
    TargetChange,
    /// The view changed.
    ViewChange,
    /// The pointer moved this tick.
    MouseMove,
    /// First still tick after the pointer moved.
    MouseStop,
    /// A new frame token arrived; deferred work is flushed here.
    FrameStart,
    /// The host stopped navigating.
    NavigationEnd,
    /// A widget committed an interaction.
    Action,
    /// A widget interaction is in progress.
    Actioning,
    /// Owner-defined event.
    Custom(&'static str),
}

impl Event {
    pub fn name(self) -> &'static str {
        match self {
            Event::Init => "init",
            Event::Reset => "reset",
            Event::Timer => "timer",
            Event::TargetChange => "target change",
            Event::ViewChange => "view change",
            Event::MouseMove => "mouse move",
            Event::MouseStop => "mouse stop",
            Event::FrameStart => "frame start",
            Event::NavigationEnd => "navigation end",
            Event::Action => "action",
            Event::Actioning => "actioning",
            Event::Custom(name) => name,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A handler together with the name it is logged under.
#[derive(Clone, Copy)]
pub struct Named<F> {
    pub name: &'static str,
    pub f: F,
}

impl<F> fmt::Debug for Named<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Named").field(&self.name).finish()
    }
}

/// Handler table for owner type `O` running with context `C`.
pub struct CallbackRegistry<O, C> {
    owner: &'static str,
    mains: HashMap<StateName, MainFn<O, C>>,
    guards: HashMap<StateId, GuardFn<O, C>>,
    hooks: HashMap<StateId, HookFn<O, C>>,
    /// Registration order of every state entry.
    order: Vec<StateId>,
    events: HashMap<Event, Vec<Named<CallbackFn<O, C>>>>,
    exceptions: Vec<Named<ExceptionFn<O>>>,
}

impl<O, C> fmt::Debug for CallbackRegistry<O, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let callback_count: usize = self.events.values().map(Vec::len).sum();
        f.debug_struct("CallbackRegistry")
            .field("owner", &self.owner)
            .field("states", &self.mains.len())
            .field("guards", &self.guards.len())
            .field("hooks", &self.hooks.len())
            .field("callbacks", &callback_count)
            .field("exception_handlers", &self.exceptions.len())
            .finish()
    }
}

impl<O, C> CallbackRegistry<O, C> {
    /// Create an empty registry. `owner` labels every log line and error.
    pub fn new(owner: &'static str) -> Self {
        Self {
            owner,
            mains: HashMap::new(),
            guards: HashMap::new(),
            hooks: HashMap::new(),
            order: Vec::new(),
            events: HashMap::new(),
            exceptions: Vec::new(),
        }
    }

    pub fn owner(&self) -> &'static str {
        self.owner
    }

    fn claim(&mut self, id: StateId) -> Result<(), ConfigError> {
        if self.order.contains(&id) {
            return Err(ConfigError::DuplicateState {
                owner: self.owner,
                id,
            });
        }
        debug!("{}: registered {}", self.owner, id);
        self.order.push(id);
        Ok(())
    }

    /// Register the `main` handler of `state`, making it a handled state.
    pub fn state(&mut self, state: StateName, f: MainFn<O, C>) -> Result<&mut Self, ConfigError> {
        self.claim(StateId::main(state))?;
        self.mains.insert(state, f);
        Ok(self)
    }

    pub fn can_enter(&mut self, state: StateName, f: GuardFn<O, C>) -> Result<&mut Self, ConfigError> {
        self.guard(StateId::new(state, Substate::CanEnter), f)
    }

    pub fn can_exit(&mut self, state: StateName, f: GuardFn<O, C>) -> Result<&mut Self, ConfigError> {
        self.guard(StateId::new(state, Substate::CanExit), f)
    }

    pub fn enter(&mut self, state: StateName, f: HookFn<O, C>) -> Result<&mut Self, ConfigError> {
        self.hook(StateId::new(state, Substate::Enter), f)
    }

    pub fn exit(&mut self, state: StateName, f: HookFn<O, C>) -> Result<&mut Self, ConfigError> {
        self.hook(StateId::new(state, Substate::Exit), f)
    }

    fn guard(&mut self, id: StateId, f: GuardFn<O, C>) -> Result<&mut Self, ConfigError> {
        self.claim(id)?;
        self.guards.insert(id, f);
        Ok(self)
    }

    fn hook(&mut self, id: StateId, f: HookFn<O, C>) -> Result<&mut Self, ConfigError> {
        self.claim(id)?;
        self.hooks.insert(id, f);
        Ok(self)
    }

    /// Append a callback to the `event` bucket. Callbacks run in registration order.
    pub fn on(
        &mut self,
        event: Event,
        name: &'static str,
        f: CallbackFn<O, C>,
    ) -> Result<&mut Self, ConfigError> {
        let bucket = self.events.entry(event).or_default();
        if bucket.iter().any(|cb| cb.name == name) {
            return Err(ConfigError::DuplicateCallback {
                owner: self.owner,
                event,
                name,
            });
        }
        bucket.push(Named { name, f });
        debug!("{}: registered `{}` for event `{}`", self.owner, name, event);
        Ok(self)
    }

    /// Register an owner-level exception handler.
    pub fn on_exception(&mut self, name: &'static str, f: ExceptionFn<O>) -> Result<&mut Self, ConfigError> {
        if self.exceptions.iter().any(|cb| cb.name == name) {
            return Err(ConfigError::DuplicateCallback {
                owner: self.owner,
                event: Event::Custom("exception"),
                name,
            });
        }
        self.exceptions.push(Named { name, f });
        Ok(self)
    }

    /// Check that every guard and hook belongs to a handled state.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self
            .order
            .iter()
            .find(|id| id.substate != Substate::Main && !self.mains.contains_key(id.state))
        {
            Some(id) => Err(ConfigError::OrphanHandler {
                owner: self.owner,
                id: *id,
            }),
            None => Ok(()),
        }
    }

    pub fn is_state(&self, state: &str) -> bool {
        self.mains.contains_key(state)
    }

    /// The registered spelling of `state`, if it is handled.
    pub fn handled_name(&self, state: &str) -> Option<StateName> {
        self.mains.get_key_value(state).map(|(name, _)| *name)
    }

    /// Handled states in registration order.
    pub fn handled_states(&self) -> impl Iterator<Item = StateName> + '_ {
        self.order
            .iter()
            .filter(|id| id.substate == Substate::Main)
            .map(|id| id.state)
    }

    pub fn main_handler(&self, state: &str) -> Option<MainFn<O, C>> {
        self.mains.get(state).copied()
    }

    pub fn guard_handler(&self, id: StateId) -> Option<GuardFn<O, C>> {
        self.guards.get(&id).copied()
    }

    pub fn hook_handler(&self, id: StateId) -> Option<HookFn<O, C>> {
        self.hooks.get(&id).copied()
    }

    /// Callbacks registered for `event`, in registration order.
    pub fn callbacks(&self, event: Event) -> &[Named<CallbackFn<O, C>>] {
        self.events.get(&event).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn exception_handlers(&self) -> &[Named<ExceptionFn<O>>] {
        &self.exceptions
    }
}
