//! Per-tick contexts handed to tool and widget handlers.
//!
//! Both are owned values refreshed from the [`HostFrame`] every tick, so
//! handlers never hold borrows of host data across calls.

use std::ops::{Deref, DerefMut};
use std::time::Instant;

use glam::Vec2;
use retopo_fsm::Event;

use crate::frame::{DirtySink, FrameToken, HostFrame};
use crate::input::InputState;

/// Which widget callback class an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    /// Interaction in progress, fired every tick.
    Actioning,
    /// Interaction committed, fired once.
    Action,
}

impl ActionPhase {
    /// Tool event bucket receiving this phase.
    pub fn event(self) -> Event {
        match self {
            ActionPhase::Actioning => Event::Actioning,
            ActionPhase::Action => Event::Action,
        }
    }
}

/// A widget interaction reported to the owning tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetAction {
    pub widget: &'static str,
    pub phase: ActionPhase,
    /// Where the interaction started
    pub anchor: Vec2,
    /// Pointer position when the action fired
    pub pointer: Vec2,
}

impl WidgetAction {
    pub fn delta(&self) -> Vec2 {
        self.pointer - self.anchor
    }
}

/// Context passed to tool handlers.
#[derive(Debug, Clone)]
pub struct Cx {
    pub input: InputState,
    pub frame: FrameToken,
    pub navigating: bool,
    pub now: Instant,
    pub dirty: DirtySink,
    /// Set while the tool's `action`/`actioning` callbacks run
    pub action: Option<WidgetAction>,
}

impl Default for Cx {
    fn default() -> Self {
        Self::new(DirtySink::default())
    }
}

impl Cx {
    pub fn new(dirty: DirtySink) -> Self {
        Self {
            input: InputState::default(),
            frame: FrameToken::default(),
            navigating: false,
            now: Instant::now(),
            dirty,
            action: None,
        }
    }

    /// Load the host's view of this tick.
    pub fn refresh(&mut self, frame: &HostFrame) {
        self.input = frame.input.clone();
        self.frame = frame.token;
        self.navigating = frame.navigating;
        self.now = frame.now;
        self.action = None;
    }

    pub fn mark_dirty(&self) {
        self.dirty.mark();
    }
}

/// Context passed to widget handlers: the tool's [`Cx`] plus the actions
/// the widget fired this tick.
#[derive(Debug)]
pub struct WidgetCx {
    cx: Cx,
    widget: &'static str,
    fired: Vec<WidgetAction>,
}

impl Deref for WidgetCx {
    type Target = Cx;

    fn deref(&self) -> &Cx {
        &self.cx
    }
}

impl DerefMut for WidgetCx {
    fn deref_mut(&mut self) -> &mut Cx {
        &mut self.cx
    }
}

impl WidgetCx {
    /// Borrow the tool's context for one widget call. Presses consumed by
    /// the widget stay consumed once [`leave`](Self::leave) hands it back.
    pub fn enter(cx: &mut Cx, widget: &'static str) -> Self {
        Self {
            cx: std::mem::take(cx),
            widget,
            fired: Vec::new(),
        }
    }

    /// Return the context to the tool along with the fired actions.
    pub fn leave(self, cx: &mut Cx) -> Vec<WidgetAction> {
        *cx = self.cx;
        self.fired
    }

    pub fn widget(&self) -> &'static str {
        self.widget
    }

    /// Report an interaction to the owning tool.
    pub fn fire(&mut self, phase: ActionPhase, anchor: Vec2) {
        let action = WidgetAction {
            widget: self.widget,
            phase,
            anchor,
            pointer: self.cx.input.pointer(),
        };
        self.fired.push(action);
    }

    pub fn fired(&self) -> &[WidgetAction] {
        &self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_consumption_reaches_tool() {
        let mut input = InputState::new();
        input.press("select");
        input.move_pointer(Vec2::new(4.0, 2.0));
        let mut cx = Cx::default();
        cx.refresh(&HostFrame::new(FrameToken(3), input));

        let mut wcx = WidgetCx::enter(&mut cx, "handle");
        assert_eq!(wcx.frame, FrameToken(3));
        assert!(wcx.input.pressed("select"));
        wcx.fire(ActionPhase::Action, Vec2::ZERO);
        let fired = wcx.leave(&mut cx);

        assert!(!cx.input.is_pressed("select"));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].widget, "handle");
        assert_eq!(fired[0].delta(), Vec2::new(4.0, 2.0));
    }

    #[test]
    fn test_refresh_clears_action() {
        let mut cx = Cx::default();
        cx.action = Some(WidgetAction {
            widget: "handle",
            phase: ActionPhase::Actioning,
            anchor: Vec2::ZERO,
            pointer: Vec2::ONE,
        });
        cx.refresh(&HostFrame::new(FrameToken(1), InputState::new()).navigating(true));
        assert!(cx.action.is_none());
        assert!(cx.navigating);
    }
}
