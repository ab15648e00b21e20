//! Draw hook points for tools and widgets.
//!
//! The runtime only guarantees which callbacks fire and in what order; what
//! a callback does with the canvas is up to the host.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use retopo_fsm::{HandlerError, HandlerResult, Named};
use tracing::warn;

use crate::frame::FrameToken;

pub type DrawFn<O, P> = fn(&O, &mut P) -> HandlerResult<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawPass {
    Pre3d,
    Post3d,
    Post2d,
}

impl DrawPass {
    pub const ALL: [DrawPass; 3] = [DrawPass::Pre3d, DrawPass::Post3d, DrawPass::Post2d];

    pub fn name(self) -> &'static str {
        match self {
            DrawPass::Pre3d => "pre3d",
            DrawPass::Post3d => "post3d",
            DrawPass::Post2d => "post2d",
        }
    }

    fn index(self) -> usize {
        match self {
            DrawPass::Pre3d => 0,
            DrawPass::Post3d => 1,
            DrawPass::Post2d => 2,
        }
    }
}

impl fmt::Display for DrawPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Draw callbacks of one owner, drawing onto canvas type `P`.
pub struct DrawCallbacks<O, P: ?Sized> {
    owner: &'static str,
    pre: Vec<Named<DrawFn<O, P>>>,
    passes: [Vec<Named<DrawFn<O, P>>>; 3],
    /// Redraw the `pre` callbacks last ran for
    pre_frame: Option<FrameToken>,
}

impl<O, P: ?Sized> fmt::Debug for DrawCallbacks<O, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawCallbacks")
            .field("owner", &self.owner)
            .field("pre", &self.pre.len())
            .field("pre3d", &self.passes[0].len())
            .field("post3d", &self.passes[1].len())
            .field("post2d", &self.passes[2].len())
            .finish()
    }
}

impl<O, P: ?Sized> DrawCallbacks<O, P> {
    pub fn new(owner: &'static str) -> Self {
        Self {
            owner,
            pre: Vec::new(),
            passes: [Vec::new(), Vec::new(), Vec::new()],
            pre_frame: None,
        }
    }

    /// Add a callback run once per redraw, before the first pass.
    pub fn pre(&mut self, name: &'static str, f: DrawFn<O, P>) -> &mut Self {
        self.pre.push(Named { name, f });
        self
    }

    pub fn on(&mut self, pass: DrawPass, name: &'static str, f: DrawFn<O, P>) -> &mut Self {
        self.passes[pass.index()].push(Named { name, f });
        self
    }

    pub fn len(&self) -> usize {
        self.pre.len() + self.passes.iter().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the callbacks for `pass` of redraw `frame`. Failures are logged
    /// and skipped; the owner's state machine is left alone. Returns the
    /// number of callbacks that completed.
    pub fn run(&mut self, pass: DrawPass, frame: FrameToken, owner: &O, canvas: &mut P) -> usize {
        let mut completed = 0;
        if self.pre_frame != Some(frame) {
            self.pre_frame = Some(frame);
            for callback in &self.pre {
                if run_one(self.owner, "pre", callback, owner, canvas) {
                    completed += 1;
                }
            }
        }
        for callback in &self.passes[pass.index()] {
            if run_one(self.owner, pass.name(), callback, owner, canvas) {
                completed += 1;
            }
        }
        completed
    }
}

fn run_one<O, P: ?Sized>(
    owner_label: &'static str,
    pass: &'static str,
    callback: &Named<DrawFn<O, P>>,
    owner: &O,
    canvas: &mut P,
) -> bool {
    let f = callback.f;
    let outcome = catch_unwind(AssertUnwindSafe(|| f(owner, canvas)));
    let err = match outcome {
        Ok(Ok(())) => return true,
        Ok(Err(err)) => err,
        Err(payload) => HandlerError::from_panic(payload),
    };
    warn!(
        "{}: draw callback `{}` ({}) failed: {}",
        owner_label, callback.name, pass, err
    );
    false
}
