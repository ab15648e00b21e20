//! Error types for the state machine runtime.
//!
//! [`ConfigError`] and [`FsmError`] are programming errors the host treats as
//! fatal. [`HandlerError`] is the recoverable class: it never escapes an
//! `update()` or `dispatch()` call.

use std::any::Any;

use thiserror::Error;

use crate::registry::Event;
use crate::state::{StateId, StateName};

/// Invalid handler registration or state configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{owner}: duplicate handler registered for {id}")]
    DuplicateState { owner: &'static str, id: StateId },
    #[error("{owner}: duplicate callback `{name}` registered for event `{event}`")]
    DuplicateCallback {
        owner: &'static str,
        event: Event,
        name: &'static str,
    },
    #[error("{owner}: {role} state `{state}` has no main handler")]
    UnknownState {
        owner: &'static str,
        role: &'static str,
        state: String,
    },
    #[error("{owner}: handler {id} registered for a state with no main handler")]
    OrphanHandler { owner: &'static str, id: StateId },
    #[error("{owner}: duplicate {kind} `{name}`")]
    DuplicateName {
        owner: &'static str,
        kind: &'static str,
        name: &'static str,
    },
}

/// Fatal error returned from a state machine update.
#[derive(Debug, Error)]
pub enum FsmError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{owner}: outcome of state `{state}` names several handled states: {names:?}")]
    AmbiguousOutcome {
        owner: &'static str,
        state: StateName,
        names: Vec<StateName>,
    },
}

/// Failure raised inside a handler, guard, hook or callback.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Source(#[from] Box<dyn std::error::Error + Send + Sync>),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Message(message.into())
    }

    pub fn from_error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HandlerError::Source(Box::new(error))
    }

    /// Convert a payload caught by `catch_unwind` into an error value.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic payload".to_string()
        };
        HandlerError::Panicked(message)
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, HandlerError::Panicked(_))
    }
}

/// Result type returned by every registered handler.
pub type HandlerResult<T> = Result<T, HandlerError>;
