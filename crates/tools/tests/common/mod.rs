//! Tools and widgets shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use retopo_fsm::{CallbackRegistry, ConfigError, Event, HandlerError, HandlerResult, MAIN, Outcome, Signal};
use retopo_tools::{
    ActionPhase, Cx, DrawCallbacks, DrawPass, FrameCoalescer, FrameToken, HostFrame, InputState,
    NavigationDeferral, Tool, Widget, WidgetCx,
};

pub type Canvas = Vec<String>;

pub const CUTTING: &str = "cutting";
pub const BOX_SELECT: &str = "box-select";

/// Tool logging every handler it runs.
#[derive(Debug, Default)]
pub struct Knife {
    pub log: Vec<String>,
    pub recomputed: Vec<Vec2>,
    pub coalescer: FrameCoalescer<Vec2>,
    pub view_changes: u32,
    pub view_updates: Vec<u32>,
    pub navigation: NavigationDeferral<u32>,
    pub fail_actioning: bool,
}

impl Knife {
    pub fn count(&self, entry: &str) -> usize {
        self.log.iter().filter(|e| *e == entry).count()
    }

    fn main(&mut self, cx: &mut Cx) -> HandlerResult<Outcome> {
        self.log.push("main".to_string());
        if cx.input.pressed("cut") {
            return Ok(Outcome::Goto(CUTTING));
        }
        if cx.input.pressed("escape") {
            return Ok(Outcome::Goto("quit"));
        }
        Ok(Outcome::Stay)
    }

    fn cutting(&mut self, cx: &mut Cx) -> HandlerResult<Outcome> {
        self.log.push("cutting".to_string());
        if cx.input.pressed("fail") {
            return Err(HandlerError::msg("cut failed"));
        }
        if cx.input.released("cut") {
            return Ok(Outcome::Goto(MAIN));
        }
        Ok(Outcome::Stay)
    }

    fn mouse_move(&mut self, cx: &mut Cx) -> HandlerResult<Option<Signal>> {
        if let Some(pointer) = self.coalescer.admit(cx.frame, cx.input.pointer(), &cx.dirty) {
            self.recomputed.push(pointer);
        }
        Ok(None)
    }

    fn mouse_stop(&mut self, _cx: &mut Cx) -> HandlerResult<Option<Signal>> {
        self.log.push("mouse stop".to_string());
        Ok(None)
    }

    fn frame_start(&mut self, cx: &mut Cx) -> HandlerResult<Option<Signal>> {
        if let Some(pointer) = self.coalescer.take_due(cx.frame) {
            self.recomputed.push(pointer);
        }
        Ok(None)
    }

    fn view_change(&mut self, cx: &mut Cx) -> HandlerResult<Option<Signal>> {
        self.view_changes += 1;
        if let Some(update) = self.navigation.admit(cx.navigating, self.view_changes) {
            self.view_updates.push(update);
        }
        Ok(None)
    }

    fn navigation_end(&mut self, cx: &mut Cx) -> HandlerResult<Option<Signal>> {
        if let Some(update) = self.navigation.take_ready(cx.navigating) {
            self.view_updates.push(update);
        }
        Ok(None)
    }

    fn action(&mut self, cx: &mut Cx) -> HandlerResult<Option<Signal>> {
        let Some(action) = cx.action else {
            return Err(HandlerError::msg("action callback without an action"));
        };
        self.log.push(format!("action {}", action.widget));
        Ok(None)
    }

    fn actioning(&mut self, cx: &mut Cx) -> HandlerResult<Option<Signal>> {
        let Some(action) = cx.action else {
            return Err(HandlerError::msg("actioning callback without an action"));
        };
        if self.fail_actioning {
            return Err(HandlerError::msg("preview failed"));
        }
        self.log.push(format!("actioning {}", action.widget));
        Ok(None)
    }
}

impl Tool for Knife {
    const NAME: &'static str = "knife";
    type Canvas = Canvas;

    fn register(registry: &mut CallbackRegistry<Self, Cx>) -> Result<(), ConfigError> {
        registry
            .state(MAIN, Self::main)?
            .state(CUTTING, Self::cutting)?
            .on(Event::MouseMove, "recompute", Self::mouse_move)?
            .on(Event::MouseStop, "settle", Self::mouse_stop)?
            .on(Event::FrameStart, "flush", Self::frame_start)?
            .on(Event::ViewChange, "view", Self::view_change)?
            .on(Event::NavigationEnd, "view", Self::navigation_end)?
            .on(Event::Action, "commit", Self::action)?
            .on(Event::Actioning, "preview", Self::actioning)?
            .on(Event::TargetChange, "first", |knife, _| {
                knife.log.push("target first".to_string());
                Ok(Some(Signal::from("retarget")))
            })?
            .on(Event::TargetChange, "second", |knife, _| {
                knife.log.push("target second".to_string());
                Ok(None)
            })?
            .on(Event::Timer, "tick", |knife, _| {
                knife.log.push("timer".to_string());
                Ok(None)
            })?;
        Ok(())
    }

    fn register_draw(draw: &mut DrawCallbacks<Self, Canvas>) {
        draw.on(DrawPass::Post2d, "hud", |_, canvas| {
            canvas.push("knife hud".to_string());
            Ok(())
        });
    }
}

/// Minimal second tool.
#[derive(Debug, Default)]
pub struct Ruler {
    pub timers: u32,
    pub resets: u32,
}

impl Tool for Ruler {
    const NAME: &'static str = "ruler";
    type Canvas = Canvas;

    fn register(registry: &mut CallbackRegistry<Self, Cx>) -> Result<(), ConfigError> {
        registry
            .state(MAIN, |_, _| Ok(Outcome::Stay))?
            .on(Event::Timer, "count", |ruler, _| {
                ruler.timers += 1;
                Ok(None)
            })?
            .on(Event::Reset, "count", |ruler, _| {
                ruler.resets += 1;
                Ok(None)
            })?;
        Ok(())
    }
}

/// Rubber-band selection widget.
#[derive(Debug, Default)]
pub struct BoxSelect {
    pub ticks: u32,
}

impl Widget for BoxSelect {
    type Canvas = Canvas;

    fn name(&self) -> &'static str {
        "box"
    }

    fn register(registry: &mut CallbackRegistry<Self, WidgetCx>) -> Result<(), ConfigError> {
        registry
            .state(MAIN, |_, cx| {
                Ok(if cx.input.pressed("select") {
                    Outcome::Goto(BOX_SELECT)
                } else {
                    Outcome::Stay
                })
            })?
            .state(BOX_SELECT, |widget, cx| {
                widget.ticks += 1;
                if cx.input.released("select") {
                    cx.fire(ActionPhase::Action, Vec2::ZERO);
                    return Ok(Outcome::Goto(MAIN));
                }
                Ok(Outcome::Stay)
            })?;
        Ok(())
    }

    fn register_draw(draw: &mut DrawCallbacks<Self, Canvas>) {
        draw.on(DrawPass::Post2d, "outline", |_, canvas| {
            canvas.push("box outline".to_string());
            Ok(())
        });
    }
}

/// Widget recording the session events it hears into a log shared with the
/// test.
#[derive(Debug, Default)]
pub struct Watcher {
    pub heard: Rc<RefCell<Vec<&'static str>>>,
}

impl Watcher {
    fn hear(&mut self, event: &'static str) -> HandlerResult<Option<Signal>> {
        self.heard.borrow_mut().push(event);
        Ok(None)
    }
}

impl Widget for Watcher {
    type Canvas = Canvas;

    fn name(&self) -> &'static str {
        "watch"
    }

    fn register(registry: &mut CallbackRegistry<Self, WidgetCx>) -> Result<(), ConfigError> {
        registry
            .state(MAIN, |_, _| Ok(Outcome::Stay))?
            .on(Event::Init, "init", |w, _| w.hear("init"))?
            .on(Event::Reset, "reset", |w, _| w.hear("reset"))?
            .on(Event::Timer, "timer", |w, _| w.hear("timer"))?
            .on(Event::TargetChange, "target", |w, _| w.hear("target"))?
            .on(Event::ViewChange, "view", |w, _| w.hear("view"))?;
        Ok(())
    }
}

/// Host-side driver feeding ticks with a persistent input snapshot.
pub struct Host {
    pub input: InputState,
    pub token: FrameToken,
    pub navigating: bool,
}

impl Default for Host {
    fn default() -> Self {
        Self {
            input: InputState::new(),
            token: FrameToken(1),
            navigating: false,
        }
    }
}

impl Host {
    /// Snapshot for the current tick, then roll the input over.
    pub fn frame(&mut self) -> HostFrame {
        let frame = HostFrame::new(self.token, self.input.clone()).navigating(self.navigating);
        self.input.begin_tick();
        frame
    }

    /// Snapshot and advance to the next display frame.
    pub fn next_frame(&mut self) -> HostFrame {
        let frame = self.frame();
        self.token = self.token.next();
        frame
    }
}
