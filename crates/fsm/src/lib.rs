//! Hierarchical state machine runtime for interactive tools.
//!
//! An owner type registers plain function handlers in a
//! [`CallbackRegistry`]: one `main` handler per state plus optional
//! `can enter`/`can exit` guards, `enter`/`exit` hooks, event callbacks and
//! exception handlers. A [`StateMachine`] drives that table once per tick.
//!
//! Handlers receive the owner and a per-tick context as separate `&mut`
//! arguments so the machine itself never borrows the owner.
//!
//! ```
//! use retopo_fsm::{CallbackRegistry, Outcome, StateMachine};
//!
//! #[derive(Default)]
//! struct Knife {
//!     cuts: u32,
//! }
//!
//! let mut registry = CallbackRegistry::<Knife, bool>::new("knife");
//! registry
//!     .state("main", |_, pressed| {
//!         Ok(if *pressed { Outcome::Goto("cut") } else { Outcome::Stay })
//!     })
//!     .unwrap()
//!     .state("cut", |knife, _| {
//!         knife.cuts += 1;
//!         Ok(Outcome::Goto("main"))
//!     })
//!     .unwrap();
//!
//! let mut fsm = StateMachine::new(registry, "main", "main").unwrap();
//! let mut knife = Knife::default();
//! fsm.update(&mut knife, &mut true).unwrap();
//! fsm.update(&mut knife, &mut false).unwrap();
//! assert_eq!(fsm.state(), Some("cut"));
//! assert_eq!(knife.cuts, 1);
//! ```

pub mod error;
pub mod machine;
pub mod outcome;
pub mod recovery;
pub mod registry;
pub mod state;

pub use error::{ConfigError, FsmError, HandlerError, HandlerResult};
pub use machine::StateMachine;
pub use outcome::{Outcome, Signal, Token};
pub use recovery::{ExceptionCallback, ExceptionChain, ExceptionHub, Fault, FaultSite};
pub use registry::{
    CallbackFn, CallbackRegistry, Event, ExceptionFn, GuardFn, HookFn, MainFn, Named,
};
pub use state::{MAIN, StateId, StateName, Substate};
