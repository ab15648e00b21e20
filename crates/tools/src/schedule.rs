//! Per-call scheduling filters.
//!
//! Each filter is a plain field on the tool or widget that owns the wrapped
//! call. The owner asks the filter whether to run now (`admit`) and flushes
//! deferred arguments from the matching event callback (`take_due` from
//! `frame start`, `take_ready` from `navigation end`).

use crate::frame::{DirtySink, FrameToken};

/// Runs a call at most once per frame; later calls in the same frame are
/// deferred to the next frame's flush.
///
/// The flush is the owner's job: register a `frame start` callback that runs
/// the call with [`take_due`](Self::take_due). Without one, deferred
/// arguments stay stored until the next [`admit`](Self::admit) replaces them.
#[derive(Debug, Clone)]
pub struct FrameCoalescer<A> {
    last_run: Option<FrameToken>,
    deferred: Option<A>,
}

impl<A> Default for FrameCoalescer<A> {
    fn default() -> Self {
        Self {
            last_run: None,
            deferred: None,
        }
    }
}

impl<A> FrameCoalescer<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the arguments back if the call may run now. Otherwise stores
    /// them (replacing earlier deferred arguments) and asks for a redraw so
    /// the next frame comes.
    pub fn admit(&mut self, frame: FrameToken, args: A, dirty: &DirtySink) -> Option<A> {
        if self.last_run == Some(frame) {
            self.deferred = Some(args);
            dirty.mark();
            return None;
        }
        self.last_run = Some(frame);
        self.deferred = None;
        Some(args)
    }

    /// Deferred arguments due at the start of `frame`, if any.
    pub fn take_due(&mut self, frame: FrameToken) -> Option<A> {
        if self.last_run == Some(frame) {
            return None;
        }
        let args = self.deferred.take()?;
        self.last_run = Some(frame);
        Some(args)
    }

    pub fn has_deferred(&self) -> bool {
        self.deferred.is_some()
    }

    pub fn clear(&mut self) {
        self.last_run = None;
        self.deferred = None;
    }
}

/// Holds calls back while the host is navigating; the latest one runs when
/// navigation ends.
#[derive(Debug, Clone)]
pub struct NavigationDeferral<A> {
    pending: Option<A>,
}

impl<A> Default for NavigationDeferral<A> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<A> NavigationDeferral<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, navigating: bool, args: A) -> Option<A> {
        if navigating {
            self.pending = Some(args);
            None
        } else {
            self.pending = None;
            Some(args)
        }
    }

    /// The stored call, once navigation is over.
    pub fn take_ready(&mut self, navigating: bool) -> Option<A> {
        if navigating { None } else { self.pending.take() }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
