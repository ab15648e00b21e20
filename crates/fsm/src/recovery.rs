//! Exception-handler chain run whenever a handler fails.
//!
//! Universal handlers live in an [`ExceptionHub`] that a host shares
//! explicitly between every machine of a session. Scoped handlers belong to a
//! single machine. Both run for every fault that machine catches; an error
//! raised by an exception handler is logged and swallowed.

use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use tracing::{error, warn};

use crate::error::{HandlerError, HandlerResult};
use crate::registry::{Event, ExceptionFn, Named};
use crate::state::StateId;

/// Where a caught failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSite {
    /// A state handler, guard or hook.
    State(StateId),
    /// A callback registered for an event.
    Callback { event: Event, name: &'static str },
    /// A guarded call made through the machine by its controller.
    Call(&'static str),
}

impl fmt::Display for FaultSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultSite::State(id) => write!(f, "state {}", id),
            FaultSite::Callback { event, name } => write!(f, "callback `{}` ({})", name, event),
            FaultSite::Call(name) => write!(f, "call `{}`", name),
        }
    }
}

/// A caught handler failure, as seen by exception handlers.
#[derive(Debug)]
pub struct Fault {
    pub owner: &'static str,
    pub site: FaultSite,
    pub error: HandlerError,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.owner, self.site, self.error)
    }
}

/// Boxed exception handler added at runtime.
pub type ExceptionCallback = Box<dyn FnMut(&Fault) -> HandlerResult<()>>;

struct Entry {
    name: &'static str,
    callback: ExceptionCallback,
}

fn run_callback(name: &'static str, callback: &mut ExceptionCallback, fault: &Fault) {
    let outcome = catch_unwind(AssertUnwindSafe(|| callback(fault)));
    let err = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(err)) => err,
        Err(payload) => HandlerError::from_panic(payload),
    };
    error!(
        "exception handler `{}` failed while handling ({}): {}",
        name, fault, err
    );
}

/// Universal exception handlers shared by every machine holding a clone.
#[derive(Clone, Default)]
pub struct ExceptionHub {
    universal: Rc<RefCell<Vec<Entry>>>,
}

impl fmt::Debug for ExceptionHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionHub")
            .field("universal", &self.len())
            .finish()
    }
}

impl ExceptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&self, name: &'static str, callback: F)
    where
        F: FnMut(&Fault) -> HandlerResult<()> + 'static,
    {
        match self.universal.try_borrow_mut() {
            Ok(mut universal) => universal.push(Entry {
                name,
                callback: Box::new(callback),
            }),
            Err(_) => warn!(
                "exception handler `{}` not added: hub is busy handling a fault",
                name
            ),
        }
    }

    /// Remove every universal handler registered under `name`.
    pub fn remove(&self, name: &str) -> bool {
        let Ok(mut universal) = self.universal.try_borrow_mut() else {
            return false;
        };
        let before = universal.len();
        universal.retain(|entry| entry.name != name);
        universal.len() != before
    }

    pub fn clear(&self) {
        if let Ok(mut universal) = self.universal.try_borrow_mut() {
            universal.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.universal.try_borrow().map(|u| u.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn notify(&self, fault: &Fault) {
        let Ok(mut universal) = self.universal.try_borrow_mut() else {
            warn!("universal exception handlers skipped for nested fault ({})", fault);
            return;
        };
        for entry in universal.iter_mut() {
            run_callback(entry.name, &mut entry.callback, fault);
        }
    }
}

/// Per-machine chain: universal handlers, then the owner's registered
/// handlers, then scoped handlers added at runtime.
pub struct ExceptionChain<O> {
    hub: ExceptionHub,
    owner_handlers: Vec<Named<ExceptionFn<O>>>,
    scoped: Vec<Entry>,
}

impl<O> fmt::Debug for ExceptionChain<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionChain")
            .field("hub", &self.hub)
            .field("owner_handlers", &self.owner_handlers.len())
            .field("scoped", &self.scoped.len())
            .finish()
    }
}

impl<O> ExceptionChain<O> {
    pub fn new(hub: ExceptionHub, owner_handlers: Vec<Named<ExceptionFn<O>>>) -> Self {
        Self {
            hub,
            owner_handlers,
            scoped: Vec::new(),
        }
    }

    pub fn hub(&self) -> &ExceptionHub {
        &self.hub
    }

    /// Add a handler; `universal` ones go to the shared hub.
    pub fn add_callback<F>(&mut self, name: &'static str, callback: F, universal: bool)
    where
        F: FnMut(&Fault) -> HandlerResult<()> + 'static,
    {
        if universal {
            self.hub.add(name, callback);
        } else {
            self.scoped.push(Entry {
                name,
                callback: Box::new(callback),
            });
        }
    }

    /// Run every handler for `fault`. Never fails.
    pub fn notify(&mut self, owner: &mut O, fault: &Fault) {
        self.hub.notify(fault);
        for handler in &self.owner_handlers {
            let f = handler.f;
            let outcome = catch_unwind(AssertUnwindSafe(|| f(owner, fault)));
            let err = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(payload) => HandlerError::from_panic(payload),
            };
            error!(
                "exception handler `{}` failed while handling ({}): {}",
                handler.name, fault, err
            );
        }
        for entry in self.scoped.iter_mut() {
            run_callback(entry.name, &mut entry.callback, fault);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fault() -> Fault {
        Fault {
            owner: "probe",
            site: FaultSite::Call("test"),
            error: HandlerError::msg("boom"),
        }
    }

    #[test]
    fn test_chain_order_universal_owner_scoped() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let hub = ExceptionHub::new();

        let seen = Rc::clone(&order);
        hub.add("universal", move |_| {
            seen.borrow_mut().push("universal");
            Ok(())
        });

        let owner_handlers = vec![Named {
            name: "owner",
            f: (|owner: &mut Vec<&'static str>, _: &Fault| {
                owner.push("owner");
                Ok(())
            }) as ExceptionFn<Vec<&'static str>>,
        }];
        let mut chain = ExceptionChain::new(hub.clone(), owner_handlers);

        let seen = Rc::clone(&order);
        chain.add_callback(
            "scoped",
            move |_| {
                seen.borrow_mut().push("scoped");
                Ok(())
            },
            false,
        );

        let mut owner = Vec::new();
        chain.notify(&mut owner, &fault());
        assert_eq!(*order.borrow(), ["universal", "scoped"]);
        assert_eq!(owner, ["owner"]);
    }

    #[test]
    fn test_failing_handler_does_not_stop_chain() {
        let hub = ExceptionHub::new();
        hub.add("fails", |_| Err(HandlerError::msg("handler failed")));
        hub.add("panics", |_| panic!("handler panicked"));
        let reached = Rc::new(Cell::new(false));
        let flag = Rc::clone(&reached);
        hub.add("last", move |_| {
            flag.set(true);
            Ok(())
        });

        let mut chain: ExceptionChain<()> = ExceptionChain::new(hub, Vec::new());
        chain.notify(&mut (), &fault());
        assert!(reached.get());
    }

    #[test]
    fn test_universal_handlers_shared_between_chains() {
        let hub = ExceptionHub::new();
        let count = Rc::new(Cell::new(0));
        let mut a: ExceptionChain<()> = ExceptionChain::new(hub.clone(), Vec::new());
        let mut b: ExceptionChain<()> = ExceptionChain::new(hub.clone(), Vec::new());

        let counter = Rc::clone(&count);
        a.add_callback(
            "count",
            move |_| {
                counter.set(counter.get() + 1);
                Ok(())
            },
            true,
        );

        b.notify(&mut (), &fault());
        a.notify(&mut (), &fault());
        assert_eq!(count.get(), 2);
        assert_eq!(hub.len(), 1);
        assert!(hub.remove("count"));
        assert!(hub.is_empty());
    }
}
