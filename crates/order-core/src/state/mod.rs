//! State machine for the order lifecycle.
//!
//! The transition table and action registry are built once and shared
//! read-only. A machine instance binds them to one order and its status.

pub mod actions;
pub mod machine;
pub mod transitions;

pub use actions::{
	ActionError, ActionRegistry, ActionRegistryBuilder, CancelOrderAction, PaySuccessAction,
	RegistryError, ThirdPartiesReturnFailAction, ThirdPartiesReturnSuccessAction,
	TransitionAction, TransitionContext,
};
pub use machine::{OrderStateMachine, TransitionError};
pub use transitions::{ActionKind, TableError, TransitionRule, TransitionTable};
