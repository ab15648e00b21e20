//! Frame clock and redraw signalling shared with the host.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use crate::input::InputState;

/// Monotonic display-frame counter supplied by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameToken(pub u64);

impl FrameToken {
    pub fn next(self) -> Self {
        FrameToken(self.0 + 1)
    }
}

/// Everything the host reports for one tick.
#[derive(Debug, Clone)]
pub struct HostFrame {
    pub token: FrameToken,
    /// The host is navigating the view (orbit, pan, zoom)
    pub navigating: bool,
    pub input: InputState,
    pub now: Instant,
}

impl HostFrame {
    pub fn new(token: FrameToken, input: InputState) -> Self {
        Self {
            token,
            navigating: false,
            input,
            now: Instant::now(),
        }
    }

    pub fn navigating(mut self, navigating: bool) -> Self {
        self.navigating = navigating;
        self
    }

    pub fn at(mut self, now: Instant) -> Self {
        self.now = now;
        self
    }
}

/// "Mark dirty" sink: counts redraw requests until the host takes them.
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct DirtySink {
    requests: Rc<Cell<u64>>,
}

impl DirtySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self) {
        self.requests.set(self.requests.get() + 1);
    }

    pub fn is_dirty(&self) -> bool {
        self.requests.get() > 0
    }

    /// Number of requests since the last take, resetting the counter.
    pub fn take(&self) -> u64 {
        self.requests.replace(0)
    }

    /// Guard that marks the sink when dropped.
    pub fn guard(&self) -> DirtyGuard {
        DirtyGuard { sink: self.clone() }
    }
}

/// Marks its sink dirty on drop, including during unwinding.
#[must_use = "the sink is marked when the guard is dropped"]
#[derive(Debug)]
pub struct DirtyGuard {
    sink: DirtySink,
}

impl Drop for DirtyGuard {
    fn drop(&mut self) {
        self.sink.mark();
    }
}

/// Run `f`, then mark `sink` dirty whether or not `f` returned normally.
pub fn dirty_when_done<R>(sink: &DirtySink, f: impl FnOnce() -> R) -> R {
    let _guard = sink.guard();
    f()
}
