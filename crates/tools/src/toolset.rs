//! Session-level table of tools.

use retopo_config::RuntimeConfig;
use retopo_fsm::{ConfigError, Event, ExceptionHub, FsmError, Signal, StateName};
use tracing::{info, warn};

use crate::draw::DrawPass;
use crate::frame::{DirtySink, HostFrame};
use crate::timer::TimerHandler;
use crate::tool::{DynTool, Tool, ToolController};

/// Every tool of a session, in registration order, with the shared dirty
/// sink, exception hub and timer.
pub struct ToolSet<P: ?Sized + 'static> {
    tools: Vec<Box<dyn DynTool<P>>>,
    active: Option<usize>,
    dirty: DirtySink,
    hub: ExceptionHub,
    timer: TimerHandler,
    start_tool: Option<String>,
}

impl<P: ?Sized + 'static> std::fmt::Debug for ToolSet<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.tool_names())
            .field("active", &self.current_tool())
            .field("timer", &self.timer)
            .finish()
    }
}

impl<P: ?Sized + 'static> Default for ToolSet<P> {
    fn default() -> Self {
        Self::new(&RuntimeConfig::default())
    }
}

impl<P: ?Sized + 'static> ToolSet<P> {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            tools: Vec::new(),
            active: None,
            dirty: DirtySink::new(),
            hub: ExceptionHub::new(),
            timer: TimerHandler::from_config(&config.timer),
            start_tool: config.start_tool.clone(),
        }
    }

    pub fn dirty(&self) -> &DirtySink {
        &self.dirty
    }

    /// Universal exception handlers shared by every tool and widget.
    pub fn hub(&self) -> &ExceptionHub {
        &self.hub
    }

    pub fn timer(&self) -> &TimerHandler {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut TimerHandler {
        &mut self.timer
    }

    /// Build a controller wired to this session's hub and dirty sink.
    pub fn controller<T>(&self, tool: T) -> Result<ToolController<T>, ConfigError>
    where
        T: Tool<Canvas = P>,
    {
        ToolController::new(tool, self.hub.clone(), self.dirty.clone())
    }

    pub fn add_tool<T>(&mut self, tool: T) -> Result<(), ConfigError>
    where
        T: Tool<Canvas = P>,
    {
        let controller = self.controller(tool)?;
        self.insert(controller)
    }

    /// Add a controller built with [`controller`](Self::controller), e.g.
    /// after adding widgets to it.
    pub fn insert<T>(&mut self, controller: ToolController<T>) -> Result<(), ConfigError>
    where
        T: Tool<Canvas = P>,
    {
        if self.tools.iter().any(|tool| tool.name() == T::NAME) {
            return Err(ConfigError::DuplicateName {
                owner: "tool set",
                kind: "tool",
                name: T::NAME,
            });
        }
        self.tools.push(Box::new(controller));
        Ok(())
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// Select the configured start tool, or the first registered one.
    pub fn activate_default(&mut self) -> bool {
        if let Some(name) = self.start_tool.clone() {
            if self.select_tool(&name) {
                return true;
            }
        }
        match self.tools.first().map(|tool| tool.name()) {
            Some(name) => self.select_tool(name),
            None => false,
        }
    }

    /// Make `name` the active tool and reset it. Unknown names are ignored.
    pub fn select_tool(&mut self, name: &str) -> bool {
        let Some(index) = self.tools.iter().position(|tool| tool.name() == name) else {
            warn!("no tool named `{}`", name);
            return false;
        };
        self.active = Some(index);
        self.tools[index].reset();
        self.dirty.mark();
        info!("tool `{}` selected", name);
        true
    }

    /// Restart the active tool and its widgets after the host undid or redid
    /// an edit.
    pub fn undo_redo(&mut self) {
        if let Some(tool) = self.active_tool_mut() {
            info!("resetting `{}` after undo/redo", tool.name());
            tool.reset();
        }
    }

    pub fn current_tool(&self) -> Option<&'static str> {
        self.active.map(|index| self.tools[index].name())
    }

    pub fn current_widget(&self) -> Option<&'static str> {
        self.active
            .and_then(|index| self.tools[index].widget_name())
    }

    pub fn current_state(&self) -> Option<StateName> {
        self.active.and_then(|index| self.tools[index].state())
    }

    fn active_tool_mut(&mut self) -> Option<&mut Box<dyn DynTool<P>>> {
        let index = self.active?;
        self.tools.get_mut(index)
    }

    /// Select a widget of the active tool.
    pub fn select_widget(&mut self, name: &str) -> bool {
        match self.active_tool_mut() {
            Some(tool) => tool.select_widget(name),
            None => false,
        }
    }

    /// Dispatch `event` to the active tool.
    pub fn dispatch(&mut self, event: Event) -> Vec<Option<Signal>> {
        match self.active_tool_mut() {
            Some(tool) => tool.dispatch(event),
            None => Vec::new(),
        }
    }

    /// Run one host tick on the active tool, raising `timer` first if due.
    /// The timer is only polled while a tool is active.
    pub fn tick(&mut self, frame: &HostFrame) -> Result<Option<Signal>, FsmError> {
        let Some(index) = self.active else {
            return Ok(None);
        };
        let tool = &mut self.tools[index];
        if self.timer.poll(frame.now) {
            tool.dispatch(Event::Timer);
        }
        tool.tick(frame)
    }

    pub fn draw(&mut self, pass: DrawPass, canvas: &mut P) {
        if let Some(tool) = self.active_tool_mut() {
            tool.draw(pass, canvas);
        }
    }

    /// The controller of tool type `T`, if registered.
    pub fn get<T>(&self) -> Option<&ToolController<T>>
    where
        T: Tool<Canvas = P>,
    {
        self.tools
            .iter()
            .find_map(|tool| tool.as_any().downcast_ref::<ToolController<T>>())
    }

    pub fn get_mut<T>(&mut self) -> Option<&mut ToolController<T>>
    where
        T: Tool<Canvas = P>,
    {
        self.tools
            .iter_mut()
            .find_map(|tool| tool.as_any_mut().downcast_mut::<ToolController<T>>())
    }
}
