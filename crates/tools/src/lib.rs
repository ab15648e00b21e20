//! Tool and widget runtime for Retopo.
//!
//! A [`ToolSet`] holds every tool of a session. Each tool is a
//! [`ToolController`] wrapping a [`Tool`] implementation, its state machine
//! and an ordered table of widgets. The host drives the set once per tick
//! with a [`HostFrame`] and draws through the three [`DrawPass`] hook points.

pub mod context;
pub mod draw;
pub mod frame;
pub mod input;
pub mod schedule;
pub mod timer;
pub mod tool;
pub mod toolset;
pub mod widget;
pub mod widgets;

pub use context::{ActionPhase, Cx, WidgetAction, WidgetCx};
pub use draw::{DrawCallbacks, DrawFn, DrawPass};
pub use frame::{DirtyGuard, DirtySink, FrameToken, HostFrame, dirty_when_done};
pub use input::InputState;
pub use schedule::{FrameCoalescer, NavigationDeferral};
pub use timer::TimerHandler;
pub use tool::{DynTool, Tool, ToolController};
pub use toolset::ToolSet;
pub use widget::{DynWidget, Widget, WidgetController, WidgetTick};
