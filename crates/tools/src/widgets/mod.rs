//! Reusable widgets.

pub mod drag;

pub use drag::DragWidget;
