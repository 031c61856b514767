//! Core of the order lifecycle system.
//!
//! This crate holds the order state machine and everything needed to drive
//! it: the transition table, the action registry, state persistence through
//! the order record and the dispatcher that ties them together. Lifecycle
//! notifications are published on an [`EventBus`] after each dispatch.

pub mod builder;
pub mod dispatcher;
pub mod event_bus;
pub mod persistence;
pub mod state;

pub use builder::{BuilderError, DispatcherBuilder};
pub use dispatcher::{DispatchError, Dispatcher};
pub use event_bus::EventBus;
pub use persistence::{
	restore_status, PersistenceAdapter, PersistenceError, StatusStore, StorageStatusStore,
};
pub use state::{
	ActionError, ActionKind, ActionRegistry, OrderStateMachine, TransitionAction,
	TransitionContext, TransitionError, TransitionTable,
};
