mod common;

use std::rc::Rc;

use glam::Vec2;
use retopo_fsm::{ConfigError, Event, ExceptionHub, MAIN, Signal};
use retopo_tools::widgets::DragWidget;
use retopo_tools::widgets::drag::DRAG;
use retopo_tools::{DirtySink, DrawPass, ToolController};

use common::{BOX_SELECT, BoxSelect, CUTTING, Canvas, Host, Knife, Watcher};

fn knife() -> ToolController<Knife> {
    ToolController::new(Knife::default(), ExceptionHub::new(), DirtySink::new()).unwrap()
}

#[test]
fn test_construction_dispatches_session_events() {
    let controller = knife();
    assert_eq!(controller.state(), Some(MAIN));
    assert_eq!(controller.tool().count("timer"), 1);
    assert_eq!(controller.tool().count("target first"), 1);
    assert_eq!(controller.tool().view_updates, [1]);
}

#[test]
fn test_widget_interaction_suspends_tool_main() {
    let mut controller = knife().with_widget(BoxSelect::default()).unwrap();
    assert!(controller.select_widget("box"));
    let mut host = Host::default();

    host.input.press("select");
    controller.tick(&host.next_frame()).unwrap();
    // The resting widget consumed the press; the tool still ran.
    assert_eq!(controller.tool().count("main"), 1);
    assert_eq!(controller.widget_state(), Some(MAIN));

    controller.tick(&host.next_frame()).unwrap();
    controller.tick(&host.next_frame()).unwrap();
    assert_eq!(controller.widget_state(), Some(BOX_SELECT));
    assert_eq!(controller.tool().count("main"), 1);

    host.input.release("select");
    controller.tick(&host.next_frame()).unwrap();
    assert_eq!(controller.tool().count("action box"), 1);
    assert_eq!(controller.tool().count("main"), 1);

    controller.tick(&host.next_frame()).unwrap();
    assert_eq!(controller.widget_state(), Some(MAIN));
    assert_eq!(controller.tool().count("main"), 2);
}

#[test]
fn test_dispatch_target_change_runs_both_in_order() {
    let mut controller = knife();
    controller.tool_mut().log.clear();

    let results = controller.dispatch(Event::TargetChange);
    assert_eq!(results, [Some(Signal::from("retarget")), None]);
    assert_eq!(controller.tool().log, ["target first", "target second"]);
}

#[test]
fn test_unhandled_goto_reaches_host() {
    let mut controller = knife();
    let mut host = Host::default();
    host.input.press("escape");
    let signal = controller.tick(&host.next_frame()).unwrap();
    assert_eq!(signal, Some(Signal::from("quit")));
    assert_eq!(controller.state(), Some(MAIN));
}

#[test]
fn test_drag_fires_actioning_before_action() {
    let mut controller = knife().with_widget(DragWidget::new("slide")).unwrap();
    controller.select_widget("slide");
    let mut host = Host::default();

    host.input.press("select");
    controller.tick(&host.next_frame()).unwrap();
    host.input.move_pointer(Vec2::new(5.0, 0.0));
    controller.tick(&host.next_frame()).unwrap();
    controller.tick(&host.next_frame()).unwrap();
    host.input.release("select");
    controller.tick(&host.next_frame()).unwrap();

    let widget_log: Vec<&str> = controller
        .tool()
        .log
        .iter()
        .map(String::as_str)
        .filter(|entry| entry.ends_with("slide"))
        .collect();
    assert_eq!(widget_log, ["actioning slide", "actioning slide", "action slide"]);
}

#[test]
fn test_click_within_one_tick_commits_drag() {
    let mut controller = knife().with_widget(DragWidget::new("slide")).unwrap();
    controller.select_widget("slide");
    let mut host = Host::default();

    host.input.press("select");
    host.input.release("select");
    controller.tick(&host.next_frame()).unwrap();
    for _ in 0..5 {
        controller.tick(&host.next_frame()).unwrap();
    }

    assert_eq!(controller.widget_state(), Some(MAIN));
    assert_eq!(controller.tool().count("action slide"), 1);
    assert_eq!(controller.tool().count("actioning slide"), 0);
    assert!(controller.tool().count("main") > 1);
}

#[test]
fn test_widget_hears_session_events() {
    let watcher = Watcher::default();
    let heard = Rc::clone(&watcher.heard);
    let mut controller = knife().with_widget(watcher).unwrap();
    assert_eq!(*heard.borrow(), ["init", "reset", "timer", "target", "view"]);

    // Not selected yet: only the tool hears dispatched events.
    heard.borrow_mut().clear();
    controller.dispatch(Event::Timer);
    assert!(heard.borrow().is_empty());

    controller.select_widget("watch");
    assert_eq!(*heard.borrow(), ["reset", "timer", "target", "view"]);

    heard.borrow_mut().clear();
    let results = controller.dispatch(Event::TargetChange);
    controller.dispatch(Event::Timer);
    controller.dispatch(Event::FrameStart);
    assert_eq!(results, [Some(Signal::from("retarget")), None]);
    assert_eq!(*heard.borrow(), ["target", "timer"]);

    heard.borrow_mut().clear();
    controller.reset();
    assert_eq!(*heard.borrow(), ["reset", "timer", "target", "view"]);
}

#[test]
fn test_drag_cancel_fires_no_action() {
    let mut controller = knife().with_widget(DragWidget::new("slide")).unwrap();
    controller.select_widget("slide");
    let mut host = Host::default();

    host.input.press("select");
    controller.tick(&host.next_frame()).unwrap();
    controller.tick(&host.next_frame()).unwrap();
    assert_eq!(controller.widget_state(), Some(DRAG));

    host.input.press("cancel");
    controller.tick(&host.next_frame()).unwrap();
    controller.tick(&host.next_frame()).unwrap();
    assert_eq!(controller.widget_state(), Some(MAIN));
    assert_eq!(controller.tool().count("action slide"), 0);
}

#[test]
fn test_tool_fault_abandons_widget_interaction() {
    let mut controller = knife().with_widget(DragWidget::new("slide")).unwrap();
    controller.select_widget("slide");
    controller.tool_mut().fail_actioning = true;
    let mut host = Host::default();

    host.input.press("select");
    controller.tick(&host.next_frame()).unwrap();
    let signal = controller.tick(&host.next_frame()).unwrap();

    assert_eq!(signal, None);
    assert_eq!(controller.fsm().fault_count(), 1);
    assert_eq!(controller.state(), Some(MAIN));
    assert_eq!(controller.widget_state(), Some(MAIN));
}

#[test]
fn test_failing_tool_state_recovers_to_reset() {
    let mut controller = knife();
    let mut host = Host::default();

    host.input.press("cut");
    controller.tick(&host.next_frame()).unwrap();
    controller.tick(&host.next_frame()).unwrap();
    assert_eq!(controller.state(), Some(CUTTING));

    host.input.press("fail");
    assert_eq!(controller.tick(&host.next_frame()).unwrap(), None);
    assert_eq!(controller.state(), Some(MAIN));
    assert_eq!(controller.fsm().fault_count(), 1);
}

#[test]
fn test_mouse_moves_coalesce_per_frame() {
    let dirty = DirtySink::new();
    let mut controller =
        ToolController::new(Knife::default(), ExceptionHub::new(), dirty.clone()).unwrap();
    let mut host = Host::default();

    for x in [1.0, 2.0, 3.0] {
        host.input.move_pointer(Vec2::new(x, 0.0));
        controller.tick(&host.frame()).unwrap();
    }
    assert_eq!(controller.tool().recomputed, [Vec2::new(1.0, 0.0)]);
    assert_eq!(dirty.take(), 2);

    host.token = host.token.next();
    controller.tick(&host.frame()).unwrap();
    assert_eq!(
        controller.tool().recomputed,
        [Vec2::new(1.0, 0.0), Vec2::new(3.0, 0.0)]
    );
    assert_eq!(controller.tool().count("mouse stop"), 1);

    controller.tick(&host.next_frame()).unwrap();
    assert_eq!(controller.tool().recomputed.len(), 2);
    assert_eq!(controller.tool().count("mouse stop"), 1);
}

#[test]
fn test_view_updates_wait_for_navigation_end() {
    let mut controller = knife();
    let mut host = Host::default();

    host.navigating = true;
    controller.tick(&host.next_frame()).unwrap();
    for _ in 0..3 {
        controller.dispatch(Event::ViewChange);
    }
    assert_eq!(controller.tool().view_updates, [1]);

    controller.tick(&host.next_frame()).unwrap();
    assert_eq!(controller.tool().view_updates, [1]);

    host.navigating = false;
    controller.tick(&host.next_frame()).unwrap();
    assert_eq!(controller.tool().view_updates, [1, 4]);

    controller.tick(&host.next_frame()).unwrap();
    assert_eq!(controller.tool().view_updates, [1, 4]);
}

#[test]
fn test_select_widget_and_draw_order() {
    let mut controller = knife().with_widget(BoxSelect::default()).unwrap();
    assert!(!controller.select_widget("lasso"));
    assert_eq!(controller.widget_name(), None);

    assert!(controller.select_widget("box"));
    assert_eq!(controller.widget_name(), Some("box"));

    let mut canvas = Canvas::new();
    controller.draw(DrawPass::Post3d, &mut canvas);
    assert!(canvas.is_empty());
    controller.draw(DrawPass::Post2d, &mut canvas);
    assert_eq!(canvas, ["knife hud", "box outline"]);
}

#[test]
fn test_duplicate_widget_rejected() {
    let controller = knife().with_widget(BoxSelect::default()).unwrap();
    let err = controller.with_widget(BoxSelect::default()).unwrap_err();
    assert_eq!(
        err,
        ConfigError::DuplicateName {
            owner: "knife",
            kind: "widget",
            name: "box",
        }
    );
}

#[test]
fn test_dirty_when_done_marks_even_on_failure() {
    let dirty = DirtySink::new();
    let mut controller =
        ToolController::new(Knife::default(), ExceptionHub::new(), dirty.clone()).unwrap();

    let value = controller.dirty_when_done("insert", |_, _| Ok(3));
    assert_eq!(value, Some(3));
    assert_eq!(dirty.take(), 1);

    let value: Option<u32> = controller.dirty_when_done("insert", |_, _| {
        Err(retopo_fsm::HandlerError::msg("insert failed"))
    });
    assert_eq!(value, None);
    assert_eq!(dirty.take(), 1);
    assert_eq!(controller.fsm().fault_count(), 1);
}

#[test]
fn test_only_in_cutting() {
    let mut controller = knife();
    let ran = controller.only_in(&[CUTTING], "preview", false, |_, _| Ok(true));
    assert!(!ran);
    let ran = controller.only_in(&[MAIN, CUTTING], "preview", false, |_, _| Ok(true));
    assert!(ran);
}
