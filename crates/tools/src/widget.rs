//! Widget controllers: one on-screen interactive handle with its own state
//! machine, nested inside a tool.

use retopo_fsm::{
    CallbackRegistry, ConfigError, Event, ExceptionHub, FsmError, MAIN, Signal, StateMachine,
    StateName,
};
use tracing::debug;

use crate::context::{Cx, WidgetAction, WidgetCx};
use crate::draw::{DrawCallbacks, DrawPass};

/// An interactive handle driven by its own state machine.
///
/// A widget rests in `main`. Leaving `main` starts an interaction, during
/// which the owning tool's own `main` handler is suspended. The widget
/// reports progress with [`WidgetCx::fire`].
pub trait Widget: Sized + 'static {
    /// Canvas the widget draws onto; must match the owning tool's.
    type Canvas: ?Sized + 'static;

    fn name(&self) -> &'static str;

    fn register(registry: &mut CallbackRegistry<Self, WidgetCx>) -> Result<(), ConfigError>;

    fn register_draw(_draw: &mut DrawCallbacks<Self, Self::Canvas>) {}
}

/// Events a widget hears from its tool besides its own ticks, replayed in
/// this order whenever it resets.
pub(crate) const SESSION_EVENTS: [Event; 3] =
    [Event::Timer, Event::TargetChange, Event::ViewChange];

/// Result of one widget tick.
#[derive(Debug, Default)]
pub struct WidgetTick {
    /// Signal for the owning tool's state machine
    pub signal: Option<Signal>,
    /// Actions fired this tick, in order
    pub fired: Vec<WidgetAction>,
}

/// Object-safe view of a [`WidgetController`] so a tool can hold widgets of
/// different types.
pub trait DynWidget<P: ?Sized> {
    fn name(&self) -> &'static str;
    fn state(&self) -> Option<StateName>;
    /// Not in the middle of an interaction.
    fn is_resting(&self) -> bool;
    fn update(&mut self, cx: &mut Cx) -> Result<WidgetTick, FsmError>;
    fn reset(&mut self, cx: &mut Cx);
    /// Run the widget's callbacks for `event` with the tool's context.
    fn dispatch(&mut self, event: Event, cx: &mut Cx) -> Vec<Option<Signal>>;
    fn draw(&mut self, pass: DrawPass, cx: &Cx, canvas: &mut P);
    fn fault_count(&self) -> u64;
}

pub struct WidgetController<W: Widget> {
    widget: W,
    name: &'static str,
    fsm: StateMachine<W, WidgetCx>,
    draw: DrawCallbacks<W, W::Canvas>,
}

impl<W: Widget> std::fmt::Debug for WidgetController<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetController")
            .field("name", &self.name)
            .field("fsm", &self.fsm)
            .field("draw", &self.draw)
            .finish()
    }
}

impl<W: Widget> WidgetController<W> {
    /// Build the widget's state machine, starting and resetting to `main`,
    /// and dispatch `init`.
    pub fn new(widget: W, hub: ExceptionHub, cx: &mut Cx) -> Result<Self, ConfigError> {
        let name = widget.name();
        let mut registry = CallbackRegistry::new(name);
        W::register(&mut registry)?;
        let fsm = StateMachine::with_hub(registry, MAIN, MAIN, hub)?;
        let mut draw = DrawCallbacks::new(name);
        W::register_draw(&mut draw);
        debug!("widget `{}` ready with states {:?}", name, fsm.handled_states());
        let mut controller = Self {
            widget,
            name,
            fsm,
            draw,
        };
        controller.dispatch(Event::Init, cx);
        Ok(controller)
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn fsm(&self) -> &StateMachine<W, WidgetCx> {
        &self.fsm
    }
}

impl<W: Widget> DynWidget<W::Canvas> for WidgetController<W> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn state(&self) -> Option<StateName> {
        self.fsm.state()
    }

    fn is_resting(&self) -> bool {
        self.fsm.state().is_none_or(|state| state == MAIN)
    }

    fn update(&mut self, cx: &mut Cx) -> Result<WidgetTick, FsmError> {
        let mut wcx = WidgetCx::enter(cx, self.name);
        let result = self.fsm.update(&mut self.widget, &mut wcx);
        let fired = wcx.leave(cx);
        Ok(WidgetTick {
            signal: result?,
            fired,
        })
    }

    fn reset(&mut self, cx: &mut Cx) {
        let mut wcx = WidgetCx::enter(cx, self.name);
        self.fsm.force_reset(&mut self.widget, &mut wcx);
        self.fsm.dispatch(Event::Reset, &mut self.widget, &mut wcx);
        for event in SESSION_EVENTS {
            self.fsm.dispatch(event, &mut self.widget, &mut wcx);
        }
        // Actions fired while resetting are dropped; an interaction being
        // abandoned never commits.
        wcx.leave(cx);
    }

    fn dispatch(&mut self, event: Event, cx: &mut Cx) -> Vec<Option<Signal>> {
        let mut wcx = WidgetCx::enter(cx, self.name);
        let results = self.fsm.dispatch(event, &mut self.widget, &mut wcx);
        wcx.leave(cx);
        results
    }

    fn draw(&mut self, pass: DrawPass, cx: &Cx, canvas: &mut W::Canvas) {
        self.draw.run(pass, cx.frame, &self.widget, canvas);
    }

    fn fault_count(&self) -> u64 {
        self.fsm.fault_count()
    }
}
