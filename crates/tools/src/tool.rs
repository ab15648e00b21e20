//! Tool controllers: a modal interaction owning one state machine and an
//! ordered table of widgets.
//!
//! Each tick the active widget runs first. While it is mid-interaction the
//! tool's own `main` handler is suspended; once it rests in `main` again the
//! tool's state machine updates as usual.

use std::any::Any;

use retopo_fsm::{
    CallbackRegistry, ConfigError, Event, ExceptionHub, FsmError, HandlerResult, MAIN, Signal,
    StateMachine, StateName,
};
use tracing::{debug, info, warn};

use crate::context::Cx;
use crate::draw::{DrawCallbacks, DrawPass};
use crate::frame::{DirtySink, FrameToken, HostFrame};
use crate::widget::{DynWidget, SESSION_EVENTS, Widget, WidgetController};

/// A modal mode of interaction.
pub trait Tool: Sized + 'static {
    const NAME: &'static str;
    const START: StateName = MAIN;
    const RESET: StateName = MAIN;

    /// Canvas the tool and its widgets draw onto.
    type Canvas: ?Sized + 'static;

    fn register(registry: &mut CallbackRegistry<Self, Cx>) -> Result<(), ConfigError>;

    fn register_draw(_draw: &mut DrawCallbacks<Self, Self::Canvas>) {}
}

pub struct ToolController<T: Tool> {
    tool: T,
    fsm: StateMachine<T, Cx>,
    cx: Cx,
    widgets: Vec<Box<dyn DynWidget<T::Canvas>>>,
    selected: Option<usize>,
    draw: DrawCallbacks<T, T::Canvas>,
    hub: ExceptionHub,
    last_frame: Option<FrameToken>,
    was_navigating: bool,
}

impl<T: Tool> std::fmt::Debug for ToolController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolController")
            .field("fsm", &self.fsm)
            .field("widgets", &self.widget_names())
            .field("selected", &self.widget_name())
            .finish()
    }
}

impl<T: Tool> ToolController<T> {
    /// Build the tool's state machine, dispatch `init` and reset it.
    pub fn new(tool: T, hub: ExceptionHub, dirty: DirtySink) -> Result<Self, ConfigError> {
        let mut registry = CallbackRegistry::new(T::NAME);
        T::register(&mut registry)?;
        let fsm = StateMachine::with_hub(registry, T::START, T::RESET, hub.clone())?;
        let mut draw = DrawCallbacks::new(T::NAME);
        T::register_draw(&mut draw);
        debug!("tool `{}` ready with states {:?}", T::NAME, fsm.handled_states());

        let mut controller = Self {
            tool,
            fsm,
            cx: Cx::new(dirty),
            widgets: Vec::new(),
            selected: None,
            draw,
            hub,
            last_frame: None,
            was_navigating: false,
        };
        controller.dispatch(Event::Init);
        controller.reset();
        Ok(controller)
    }

    /// Append a widget to the table. Names must be unique within the tool.
    pub fn add_widget<W>(&mut self, widget: W) -> Result<&mut Self, ConfigError>
    where
        W: Widget<Canvas = T::Canvas>,
    {
        let name = widget.name();
        if self.widget_index(name).is_some() {
            return Err(ConfigError::DuplicateName {
                owner: T::NAME,
                kind: "widget",
                name,
            });
        }
        let mut controller = WidgetController::new(widget, self.hub.clone(), &mut self.cx)?;
        controller.reset(&mut self.cx);
        self.widgets.push(Box::new(controller));
        Ok(self)
    }

    pub fn with_widget<W>(mut self, widget: W) -> Result<Self, ConfigError>
    where
        W: Widget<Canvas = T::Canvas>,
    {
        self.add_widget(widget)?;
        Ok(self)
    }

    pub fn name(&self) -> &'static str {
        T::NAME
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    pub fn tool_mut(&mut self) -> &mut T {
        &mut self.tool
    }

    pub fn fsm(&self) -> &StateMachine<T, Cx> {
        &self.fsm
    }

    pub fn cx(&self) -> &Cx {
        &self.cx
    }

    pub fn state(&self) -> Option<StateName> {
        self.fsm.state()
    }

    pub fn widget_names(&self) -> Vec<&'static str> {
        self.widgets.iter().map(|w| w.name()).collect()
    }

    /// Name of the active widget, for cursor and UI highlighting.
    pub fn widget_name(&self) -> Option<&'static str> {
        self.selected.map(|index| self.widgets[index].name())
    }

    pub fn widget_state(&self) -> Option<StateName> {
        self.selected.and_then(|index| self.widgets[index].state())
    }

    fn widget_index(&self, name: &str) -> Option<usize> {
        self.widgets.iter().position(|w| w.name() == name)
    }

    /// Make `name` the active widget. Unknown names are ignored. Switching
    /// to a different widget resets it.
    pub fn select_widget(&mut self, name: &str) -> bool {
        let Some(index) = self.widget_index(name) else {
            warn!("{}: no widget named `{}`", T::NAME, name);
            return false;
        };
        if self.selected != Some(index) {
            self.widgets[index].reset(&mut self.cx);
            self.selected = Some(index);
            info!("{}: widget `{}` selected", T::NAME, name);
        }
        true
    }

    pub fn deselect_widget(&mut self) {
        if let Some(index) = self.selected.take() {
            self.widgets[index].reset(&mut self.cx);
        }
    }

    /// Run every callback registered for `event`, in registration order.
    ///
    /// `timer`, `target change` and `view change` also reach the active
    /// widget afterwards; only the tool's results are returned.
    pub fn dispatch(&mut self, event: Event) -> Vec<Option<Signal>> {
        let faults = self.fsm.fault_count();
        let results = self.fsm.dispatch(event, &mut self.tool, &mut self.cx);
        self.abandon_widget_after_fault(faults);
        if SESSION_EVENTS.contains(&event) {
            if let Some(index) = self.selected {
                self.widgets[index].dispatch(event, &mut self.cx);
            }
        }
        results
    }

    /// Force the tool back to its reset state and replay the session events.
    pub fn reset(&mut self) {
        self.fsm.force_reset(&mut self.tool, &mut self.cx);
        self.fsm.dispatch(Event::Reset, &mut self.tool, &mut self.cx);
        for event in SESSION_EVENTS {
            self.fsm.dispatch(event, &mut self.tool, &mut self.cx);
        }
        for widget in &mut self.widgets {
            widget.reset(&mut self.cx);
        }
    }

    /// Run one host tick.
    pub fn tick(&mut self, frame: &HostFrame) -> Result<Option<Signal>, FsmError> {
        self.cx.refresh(frame);
        let faults = self.fsm.fault_count();

        if self.last_frame != Some(frame.token) {
            self.last_frame = Some(frame.token);
            self.fsm.dispatch(Event::FrameStart, &mut self.tool, &mut self.cx);
        }
        if self.was_navigating && !frame.navigating {
            self.fsm.dispatch(Event::NavigationEnd, &mut self.tool, &mut self.cx);
        }
        self.was_navigating = frame.navigating;
        if self.cx.input.mouse_moved() {
            self.fsm.dispatch(Event::MouseMove, &mut self.tool, &mut self.cx);
        } else if self.cx.input.mouse_stopped() {
            self.fsm.dispatch(Event::MouseStop, &mut self.tool, &mut self.cx);
        }

        let result = self.tick_fsms();
        self.abandon_widget_after_fault(faults);
        result
    }

    fn tick_fsms(&mut self) -> Result<Option<Signal>, FsmError> {
        let mut signal = None;
        if let Some(index) = self.selected {
            let widget = &mut self.widgets[index];
            let tick = widget.update(&mut self.cx)?;
            let resting = widget.is_resting();

            for action in tick.fired {
                self.cx.action = Some(action);
                for result in self
                    .fsm
                    .dispatch(action.phase.event(), &mut self.tool, &mut self.cx)
                {
                    if let Some(result) = result {
                        signal = merge(signal, self.fsm.interpret(result)?);
                    }
                }
            }
            self.cx.action = None;
            if let Some(widget_signal) = tick.signal {
                signal = merge(signal, self.fsm.interpret(widget_signal)?);
            }
            if !resting {
                return Ok(signal);
            }
        }
        let own = self.fsm.update(&mut self.tool, &mut self.cx)?;
        Ok(merge(signal, own))
    }

    fn abandon_widget_after_fault(&mut self, faults_before: u64) {
        if self.fsm.fault_count() == faults_before {
            return;
        }
        if let Some(index) = self.selected {
            debug!(
                "{}: abandoning widget `{}` after tool fault",
                T::NAME,
                self.widgets[index].name()
            );
            self.widgets[index].reset(&mut self.cx);
        }
    }

    /// Run `f` behind the tool's recovery policy, marking the host dirty
    /// afterwards whatever happens.
    pub fn dirty_when_done<R>(
        &mut self,
        name: &'static str,
        f: impl FnOnce(&mut T, &mut Cx) -> HandlerResult<R>,
    ) -> Option<R> {
        let _guard = self.cx.dirty.guard();
        let faults = self.fsm.fault_count();
        let result = self.fsm.call(name, &mut self.tool, &mut self.cx, f);
        self.abandon_widget_after_fault(faults);
        result
    }

    /// Run `f` only while the tool is in one of `states`.
    pub fn only_in<R>(
        &mut self,
        states: &[&str],
        name: &'static str,
        default: R,
        f: impl FnOnce(&mut T, &mut Cx) -> HandlerResult<R>,
    ) -> R {
        let faults = self.fsm.fault_count();
        let result = self
            .fsm
            .only_in(states, name, &mut self.tool, &mut self.cx, default, f);
        self.abandon_widget_after_fault(faults);
        result
    }

    /// Draw the tool's callbacks for `pass`, then the active widget's.
    pub fn draw(&mut self, pass: DrawPass, canvas: &mut T::Canvas) {
        self.draw.run(pass, self.cx.frame, &self.tool, canvas);
        if let Some(index) = self.selected {
            self.widgets[index].draw(pass, &self.cx, canvas);
        }
    }
}

fn merge(a: Option<Signal>, b: Option<Signal>) -> Option<Signal> {
    match (a, b) {
        (Some(mut a), Some(b)) => {
            a.extend(b);
            Some(a)
        }
        (a, None) => a,
        (None, b) => b,
    }
}

/// Object-safe view of a [`ToolController`] for the tool set.
pub trait DynTool<P: ?Sized> {
    fn name(&self) -> &'static str;
    fn state(&self) -> Option<StateName>;
    fn widget_name(&self) -> Option<&'static str>;
    fn select_widget(&mut self, name: &str) -> bool;
    fn dispatch(&mut self, event: Event) -> Vec<Option<Signal>>;
    fn reset(&mut self);
    fn tick(&mut self, frame: &HostFrame) -> Result<Option<Signal>, FsmError>;
    fn draw(&mut self, pass: DrawPass, canvas: &mut P);
    fn fault_count(&self) -> u64;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Tool> DynTool<T::Canvas> for ToolController<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn state(&self) -> Option<StateName> {
        ToolController::state(self)
    }

    fn widget_name(&self) -> Option<&'static str> {
        ToolController::widget_name(self)
    }

    fn select_widget(&mut self, name: &str) -> bool {
        ToolController::select_widget(self, name)
    }

    fn dispatch(&mut self, event: Event) -> Vec<Option<Signal>> {
        ToolController::dispatch(self, event)
    }

    fn reset(&mut self) {
        ToolController::reset(self)
    }

    fn tick(&mut self, frame: &HostFrame) -> Result<Option<Signal>, FsmError> {
        ToolController::tick(self, frame)
    }

    fn draw(&mut self, pass: DrawPass, canvas: &mut T::Canvas) {
        ToolController::draw(self, pass, canvas)
    }

    fn fault_count(&self) -> u64 {
        self.fsm.fault_count()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
