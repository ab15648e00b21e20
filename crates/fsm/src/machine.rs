//! The state machine engine.
//!
//! A [`StateMachine`] owns the handler table of one owner type and drives it
//! through the transition protocol once per [`update`](StateMachine::update):
//!
//! 1. If a different state is pending, run `can exit` of the current state and
//!    `can enter` of the pending one; either returning `false` drops the
//!    request.
//! 2. Run `exit` of the current state, switch, run `enter` of the new one.
//! 3. Run `main` of the current state and interpret its [`Outcome`].
//!
//! Every handler call goes through a panic boundary. A failing handler is
//! reported to the exception chain and the machine is forced back to its
//! reset state; the caller only sees an empty result.

use std::collections::HashSet;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, error, warn};

use crate::error::{ConfigError, FsmError, HandlerError, HandlerResult};
use crate::outcome::{Outcome, Signal, Token};
use crate::recovery::{ExceptionChain, ExceptionHub, Fault, FaultSite};
use crate::registry::{CallbackRegistry, Event};
use crate::state::{StateId, StateName, Substate};

/// Whether a transition step let the update continue.
enum Step {
    Continue,
    Halt,
}

/// Hierarchical state machine for owner `O` running with context `C`.
pub struct StateMachine<O, C> {
    registry: CallbackRegistry<O, C>,
    current: Option<StateName>,
    pending: Option<StateName>,
    reset_state: StateName,
    chain: ExceptionChain<O>,
    fault_count: u64,
    recovering: bool,
}

impl<O, C> fmt::Debug for StateMachine<O, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("owner", &self.registry.owner())
            .field("current", &self.current)
            .field("pending", &self.pending)
            .field("reset_state", &self.reset_state)
            .field("fault_count", &self.fault_count)
            .finish()
    }
}

impl<O, C> StateMachine<O, C> {
    /// Build a machine with a private exception hub.
    pub fn new(
        registry: CallbackRegistry<O, C>,
        start: &str,
        reset: &str,
    ) -> Result<Self, ConfigError> {
        Self::with_hub(registry, start, reset, ExceptionHub::default())
    }

    /// Build a machine whose universal exception handlers live in `hub`.
    ///
    /// Fails if `start` or `reset` is not a handled state, or if a guard or
    /// hook was registered for a state without a `main` handler.
    pub fn with_hub(
        registry: CallbackRegistry<O, C>,
        start: &str,
        reset: &str,
        hub: ExceptionHub,
    ) -> Result<Self, ConfigError> {
        registry.validate()?;
        let owner = registry.owner();
        let start = registry
            .handled_name(start)
            .ok_or_else(|| ConfigError::UnknownState {
                owner,
                role: "start",
                state: start.to_string(),
            })?;
        let reset_state = registry
            .handled_name(reset)
            .ok_or_else(|| ConfigError::UnknownState {
                owner,
                role: "reset",
                state: reset.to_string(),
            })?;
        let chain = ExceptionChain::new(hub, registry.exception_handlers().to_vec());
        debug!(
            "{}: state machine ready (start `{}`, reset `{}`)",
            owner, start, reset_state
        );
        Ok(Self {
            registry,
            current: None,
            pending: Some(start),
            reset_state,
            chain,
            fault_count: 0,
            recovering: false,
        })
    }

    pub fn owner(&self) -> &'static str {
        self.registry.owner()
    }

    /// Current state; `None` until the first update entered the start state.
    pub fn state(&self) -> Option<StateName> {
        self.current
    }

    pub fn pending(&self) -> Option<StateName> {
        self.pending
    }

    pub fn reset_state(&self) -> StateName {
        self.reset_state
    }

    pub fn is_state(&self, state: &str) -> bool {
        self.registry.is_state(state)
    }

    /// Whether the current state is `state`.
    pub fn in_state(&self, state: &str) -> bool {
        self.current == Some(state)
    }

    pub fn handled_states(&self) -> HashSet<StateName> {
        self.registry.handled_states().collect()
    }

    pub fn registry(&self) -> &CallbackRegistry<O, C> {
        &self.registry
    }

    /// Number of faults caught since construction.
    pub fn fault_count(&self) -> u64 {
        self.fault_count
    }

    pub fn hub(&self) -> &ExceptionHub {
        self.chain.hub()
    }

    /// Add an exception handler to this machine, or to the shared hub when
    /// `universal` is set.
    pub fn add_exception_callback<F>(&mut self, name: &'static str, callback: F, universal: bool)
    where
        F: FnMut(&Fault) -> HandlerResult<()> + 'static,
    {
        self.chain.add_callback(name, callback, universal);
    }

    /// Request a transition to `state` on the next update. Returns `false`
    /// and leaves the request untouched if the state is not handled.
    pub fn request(&mut self, state: &str) -> bool {
        match self.registry.handled_name(state) {
            Some(name) => {
                self.pending = Some(name);
                true
            }
            None => false,
        }
    }

    /// Apply a signal produced elsewhere (e.g. by a nested machine) to this
    /// machine: a single token naming a handled state becomes the pending
    /// transition and the remaining tokens are returned.
    pub fn interpret(&mut self, signal: Signal) -> Result<Option<Signal>, FsmError> {
        let origin = self.current.unwrap_or(self.reset_state);
        let (target, rest) = self.partition(origin, signal.into_tokens())?;
        if let Some(target) = target {
            self.pending = Some(target);
        }
        Ok(rest)
    }

    /// Run one tick of the transition protocol.
    ///
    /// Handler failures are recovered internally and yield `Ok(None)`.
    /// `Err` is reserved for programming errors.
    pub fn update(&mut self, owner: &mut O, cx: &mut C) -> Result<Option<Signal>, FsmError> {
        if let Some(next) = self.pending {
            if self.current != Some(next) {
                if let Step::Halt = self.transition(owner, cx, next) {
                    return Ok(None);
                }
            }
        }

        let Some(state) = self.current else {
            return Ok(None);
        };
        let main = self
            .registry
            .main_handler(state)
            .ok_or_else(|| ConfigError::UnknownState {
                owner: self.owner(),
                role: "current",
                state: state.to_string(),
            })?;

        let Some(outcome) = self.guarded(owner, cx, FaultSite::State(StateId::main(state)), main)
        else {
            return Ok(None);
        };
        self.settle(state, outcome)
    }

    fn transition(&mut self, owner: &mut O, cx: &mut C, next: StateName) -> Step {
        if let Some(current) = self.current {
            match self.run_guard(owner, cx, StateId::new(current, Substate::CanExit)) {
                Some(true) => {}
                Some(false) => {
                    debug!("{}: cannot exit `{}`", self.owner(), current);
                    self.pending = None;
                    return Step::Halt;
                }
                None => return Step::Halt,
            }
        }
        match self.run_guard(owner, cx, StateId::new(next, Substate::CanEnter)) {
            Some(true) => {}
            Some(false) => {
                debug!("{}: cannot enter `{}`", self.owner(), next);
                // The start state is retried until it can be entered.
                if self.current.is_some() {
                    self.pending = None;
                }
                return Step::Halt;
            }
            None => return Step::Halt,
        }

        if let Some(current) = self.current {
            if !self.run_hook(owner, cx, StateId::new(current, Substate::Exit)) {
                return Step::Halt;
            }
        }
        debug!(
            "{}: {} -> {}",
            self.owner(),
            self.current.unwrap_or("<none>"),
            next
        );
        self.current = Some(next);
        if !self.run_hook(owner, cx, StateId::new(next, Substate::Enter)) {
            return Step::Halt;
        }
        Step::Continue
    }

    fn settle(&mut self, state: StateName, outcome: Outcome) -> Result<Option<Signal>, FsmError> {
        match self.partition(state, outcome.into_tokens()) {
            Ok((target, rest)) => {
                if let Some(target) = target {
                    if target != state {
                        debug!("{}: `{}` requested `{}`", self.owner(), state, target);
                    }
                }
                self.pending = target;
                Ok(rest)
            }
            Err(err) => {
                self.pending = None;
                Err(err)
            }
        }
    }

    /// Split tokens into at most one handled state and the remaining signal.
    fn partition(
        &self,
        state: StateName,
        tokens: Vec<Token>,
    ) -> Result<(Option<StateName>, Option<Signal>), FsmError> {
        let mut targets: Vec<StateName> = Vec::new();
        let mut rest = Signal::new();
        for token in tokens {
            match self.registry.handled_name(&token) {
                Some(name) => {
                    if !targets.contains(&name) {
                        targets.push(name);
                    }
                }
                None => rest.push(token),
            }
        }
        match targets.as_slice() {
            [] => Ok((None, rest.non_empty())),
            [target] => Ok((Some(*target), rest.non_empty())),
            _ => Err(FsmError::AmbiguousOutcome {
                owner: self.owner(),
                state,
                names: targets,
            }),
        }
    }

    /// Set the current state without running guards; clears any pending
    /// transition.
    pub fn force_set_state(
        &mut self,
        owner: &mut O,
        cx: &mut C,
        state: &str,
        call_exit: bool,
        call_enter: bool,
    ) -> Result<(), ConfigError> {
        let name = self
            .registry
            .handled_name(state)
            .ok_or_else(|| ConfigError::UnknownState {
                owner: self.owner(),
                role: "forced",
                state: state.to_string(),
            })?;
        self.apply_state(owner, cx, name, call_exit, call_enter);
        Ok(())
    }

    /// Force the reset state, running its `enter` hook.
    pub fn force_reset(&mut self, owner: &mut O, cx: &mut C) {
        self.apply_state(owner, cx, self.reset_state, false, true);
    }

    fn apply_state(
        &mut self,
        owner: &mut O,
        cx: &mut C,
        state: StateName,
        call_exit: bool,
        call_enter: bool,
    ) {
        if call_exit {
            if let Some(current) = self.current {
                if !self.run_hook(owner, cx, StateId::new(current, Substate::Exit)) {
                    return;
                }
            }
        }
        self.current = Some(state);
        self.pending = None;
        if call_enter {
            self.run_hook(owner, cx, StateId::new(state, Substate::Enter));
        }
    }

    /// Run every callback registered for `event` in order and collect their
    /// results. A failing callback contributes `None`.
    pub fn dispatch(&mut self, event: Event, owner: &mut O, cx: &mut C) -> Vec<Option<Signal>> {
        let callbacks = self.registry.callbacks(event).to_vec();
        let mut results = Vec::with_capacity(callbacks.len());
        for callback in callbacks {
            let site = FaultSite::Callback {
                event,
                name: callback.name,
            };
            results.push(self.guarded(owner, cx, site, callback.f).flatten());
        }
        results
    }

    /// Run `f` only while the current state is one of `states`; otherwise
    /// return `default`. Failures are recovered and also yield `default`.
    pub fn only_in<R>(
        &mut self,
        states: &[&str],
        name: &'static str,
        owner: &mut O,
        cx: &mut C,
        default: R,
        f: impl FnOnce(&mut O, &mut C) -> HandlerResult<R>,
    ) -> R {
        match self.current {
            Some(current) if states.contains(&current) => {}
            _ => return default,
        }
        self.guarded(owner, cx, FaultSite::Call(name), f)
            .unwrap_or(default)
    }

    /// Run `f` behind this machine's panic boundary and recovery policy.
    pub fn call<R>(
        &mut self,
        name: &'static str,
        owner: &mut O,
        cx: &mut C,
        f: impl FnOnce(&mut O, &mut C) -> HandlerResult<R>,
    ) -> Option<R> {
        self.guarded(owner, cx, FaultSite::Call(name), f)
    }

    fn run_guard(&mut self, owner: &mut O, cx: &mut C, id: StateId) -> Option<bool> {
        match self.registry.guard_handler(id) {
            Some(guard) => self.guarded(owner, cx, FaultSite::State(id), guard),
            None => Some(true),
        }
    }

    /// Returns `false` if the hook failed.
    fn run_hook(&mut self, owner: &mut O, cx: &mut C, id: StateId) -> bool {
        match self.registry.hook_handler(id) {
            Some(hook) => self.guarded(owner, cx, FaultSite::State(id), hook).is_some(),
            None => true,
        }
    }

    fn guarded<R>(
        &mut self,
        owner: &mut O,
        cx: &mut C,
        site: FaultSite,
        f: impl FnOnce(&mut O, &mut C) -> HandlerResult<R>,
    ) -> Option<R> {
        let outcome = catch_unwind(AssertUnwindSafe(|| f(owner, cx)));
        let error = match outcome {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(err)) => err,
            Err(payload) => HandlerError::from_panic(payload),
        };
        let fault = Fault {
            owner: self.owner(),
            site,
            error,
        };
        self.recover(owner, cx, fault);
        None
    }

    fn recover(&mut self, owner: &mut O, cx: &mut C, fault: Fault) {
        self.fault_count += 1;
        if self.recovering {
            warn!("error raised while recovering, ignored: {}", fault);
            return;
        }
        error!("caught error in {}", fault);
        self.recovering = true;
        self.chain.notify(owner, &fault);
        self.pending = None;
        self.apply_state(owner, cx, self.reset_state, false, true);
        self.recovering = false;
        debug!("{}: recovered to `{}`", self.owner(), self.reset_state);
    }
}
