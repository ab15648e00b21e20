//! Per-tick input snapshot consumed by tools and widgets.
//!
//! The host feeds raw events through [`InputState::press`],
//! [`InputState::release`] and [`InputState::move_pointer`], hands a copy to
//! the tool set every tick and then calls [`InputState::begin_tick`].

use std::collections::HashSet;

use glam::Vec2;

/// Named actions pressed, released or held, plus the pointer.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pressed: HashSet<String>,
    released: HashSet<String>,
    held: HashSet<String>,
    /// Pointer position in region coordinates
    pointer: Vec2,
    /// Pointer position at the start of this tick
    pointer_prev: Vec2,
    mouse_moved: bool,
    mouse_moved_prev: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an action pressed this tick.
    pub fn press(&mut self, action: impl Into<String>) {
        let action = action.into();
        self.held.insert(action.clone());
        self.pressed.insert(action);
    }

    /// Record an action released this tick.
    pub fn release(&mut self, action: impl Into<String>) {
        let action = action.into();
        self.held.remove(&action);
        self.released.insert(action);
    }

    pub fn move_pointer(&mut self, position: Vec2) {
        if position != self.pointer {
            self.pointer = position;
            self.mouse_moved = true;
        }
    }

    /// Roll the snapshot over to the next tick: presses and releases are
    /// forgotten, held actions and the pointer carry over.
    pub fn begin_tick(&mut self) {
        self.pressed.clear();
        self.released.clear();
        self.pointer_prev = self.pointer;
        self.mouse_moved_prev = self.mouse_moved;
        self.mouse_moved = false;
    }

    /// Whether `action` was pressed this tick. A `true` answer consumes the
    /// press, so later readers in the same tick no longer see it.
    pub fn pressed(&mut self, action: &str) -> bool {
        self.pressed.remove(action)
    }

    /// Whether `action` was pressed this tick, without consuming it.
    pub fn is_pressed(&self, action: &str) -> bool {
        self.pressed.contains(action)
    }

    /// Consume a press without acting on it.
    pub fn unpress(&mut self, action: &str) -> bool {
        self.pressed.remove(action)
    }

    pub fn released(&self, action: &str) -> bool {
        self.released.contains(action)
    }

    pub fn held(&self, action: &str) -> bool {
        self.held.contains(action)
    }

    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn pointer_delta(&self) -> Vec2 {
        self.pointer - self.pointer_prev
    }

    pub fn mouse_moved(&self) -> bool {
        self.mouse_moved
    }

    /// First still tick after the pointer moved.
    pub fn mouse_stopped(&self) -> bool {
        !self.mouse_moved && self.mouse_moved_prev
    }
}
