//! Press-drag-release handle.
//!
//! Pressing the start action enters `drag`; every following tick fires
//! `actioning`; releasing fires `action` once and returns to `main`. The
//! cancel action returns to `main` without firing `action`.

use std::marker::PhantomData;

use glam::Vec2;
use retopo_fsm::{CallbackRegistry, ConfigError, Event, HandlerResult, MAIN, Outcome, Signal};

use crate::context::{ActionPhase, WidgetCx};
use crate::widget::Widget;

/// State the widget is in while the pointer is dragging.
pub const DRAG: &str = "drag";

/// Default action starting a drag
pub const DEFAULT_START_ACTION: &str = "select";

/// Default action cancelling a drag
pub const DEFAULT_CANCEL_ACTION: &str = "cancel";

pub struct DragWidget<P: ?Sized = ()> {
    name: &'static str,
    start_action: String,
    cancel_action: String,
    /// Pointer position when the drag started
    anchor: Vec2,
    /// Latest pointer position during the drag
    pointer: Vec2,
    _canvas: PhantomData<fn(&mut P)>,
}

impl<P: ?Sized> std::fmt::Debug for DragWidget<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragWidget")
            .field("name", &self.name)
            .field("start_action", &self.start_action)
            .field("cancel_action", &self.cancel_action)
            .field("anchor", &self.anchor)
            .field("pointer", &self.pointer)
            .finish()
    }
}

impl<P: ?Sized> DragWidget<P> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start_action: DEFAULT_START_ACTION.to_string(),
            cancel_action: DEFAULT_CANCEL_ACTION.to_string(),
            anchor: Vec2::ZERO,
            pointer: Vec2::ZERO,
            _canvas: PhantomData,
        }
    }

    pub fn start_action(mut self, action: impl Into<String>) -> Self {
        self.start_action = action.into();
        self
    }

    pub fn cancel_action(mut self, action: impl Into<String>) -> Self {
        self.cancel_action = action.into();
        self
    }

    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }

    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn delta(&self) -> Vec2 {
        self.pointer - self.anchor
    }

    fn rest(&mut self, cx: &mut WidgetCx) -> HandlerResult<Outcome> {
        if cx.input.pressed(&self.start_action) {
            self.anchor = cx.input.pointer();
            return Ok(Outcome::Goto(DRAG));
        }
        Ok(Outcome::Stay)
    }

    fn drag(&mut self, cx: &mut WidgetCx) -> HandlerResult<Outcome> {
        self.pointer = cx.input.pointer();
        if cx.input.pressed(&self.cancel_action) {
            return Ok(Outcome::Goto(MAIN));
        }
        // A press and release in the same tick only shows up as not held.
        if cx.input.released(&self.start_action) || !cx.input.held(&self.start_action) {
            cx.fire(ActionPhase::Action, self.anchor);
            return Ok(Outcome::Goto(MAIN));
        }
        cx.fire(ActionPhase::Actioning, self.anchor);
        Ok(Outcome::Stay)
    }

    fn begin(&mut self, _cx: &mut WidgetCx) -> HandlerResult<()> {
        self.pointer = self.anchor;
        Ok(())
    }

    fn clear(&mut self, _cx: &mut WidgetCx) -> HandlerResult<Option<Signal>> {
        self.anchor = Vec2::ZERO;
        self.pointer = Vec2::ZERO;
        Ok(None)
    }
}

impl<P: ?Sized + 'static> Widget for DragWidget<P> {
    type Canvas = P;

    fn name(&self) -> &'static str {
        self.name
    }

    fn register(registry: &mut CallbackRegistry<Self, WidgetCx>) -> Result<(), ConfigError> {
        registry
            .state(MAIN, Self::rest)?
            .state(DRAG, Self::drag)?
            .enter(DRAG, Self::begin)?
            .on(Event::Reset, "clear", Self::clear)?;
        Ok(())
    }
}
