//! Side-effecting actions run on a successful transition.
//!
//! Every [`ActionKind`] referenced by a transition table must be bound to a
//! [`TransitionAction`] before the registry can be built, so a missing
//! binding fails at startup rather than on the first event that needs it.

use super::transitions::{ActionKind, TransitionTable};
use order_types::{truncate_id, Order, OrderEvent, OrderStatus};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Error returned by an action. Fails the whole transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
	#[error("Action failed: {0}")]
	Failed(String),
	#[error("Notification failed: {0}")]
	Notification(String),
}

/// Errors raised while building an [`ActionRegistry`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
	#[error("No action registered for '{0}'")]
	MissingAction(ActionKind),
}

/// Everything an action gets to see about the transition it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
	pub machine_id: &'a str,
	pub order_id: &'a str,
	pub source: OrderStatus,
	pub target: OrderStatus,
	pub event: OrderEvent,
	pub payload: Option<&'a Order>,
}

/// A callback bound to one or more transition rules.
///
/// The source and target are fixed before the action runs; an action can
/// only veto the transition by returning an error.
pub trait TransitionAction: Send + Sync {
	/// Execute the action
	fn execute(&self, ctx: &TransitionContext<'_>) -> Result<(), ActionError>;

	/// Get a description of this action for logging
	fn description(&self) -> &'static str {
		"custom transition action"
	}
}

impl<F> TransitionAction for F
where
	F: Fn(&TransitionContext<'_>) -> Result<(), ActionError> + Send + Sync,
{
	fn execute(&self, ctx: &TransitionContext<'_>) -> Result<(), ActionError> {
		self(ctx)
	}
}

/// Logs that payment was received and the order awaits the third party.
pub struct PaySuccessAction;

impl TransitionAction for PaySuccessAction {
	fn execute(&self, ctx: &TransitionContext<'_>) -> Result<(), ActionError> {
		tracing::info!(
			machine = ctx.machine_id,
			order_id = %truncate_id(ctx.order_id),
			"Payment successful, order is processing"
		);
		Ok(())
	}

	fn description(&self) -> &'static str {
		"Record successful payment"
	}
}

/// Logs the third party's confirmation.
pub struct ThirdPartiesReturnSuccessAction;

impl TransitionAction for ThirdPartiesReturnSuccessAction {
	fn execute(&self, ctx: &TransitionContext<'_>) -> Result<(), ActionError> {
		tracing::info!(
			machine = ctx.machine_id,
			order_id = %truncate_id(ctx.order_id),
			"Third party returned success, order succeeded"
		);
		Ok(())
	}

	fn description(&self) -> &'static str {
		"Record third-party success"
	}
}

/// Logs the third party's rejection along with the order payload.
pub struct ThirdPartiesReturnFailAction;

impl TransitionAction for ThirdPartiesReturnFailAction {
	fn execute(&self, ctx: &TransitionContext<'_>) -> Result<(), ActionError> {
		match ctx.payload {
			Some(order) => tracing::warn!(
				machine = ctx.machine_id,
				order_id = %truncate_id(ctx.order_id),
				%order,
				"Third party returned failure, order failed"
			),
			None => tracing::warn!(
				machine = ctx.machine_id,
				order_id = %truncate_id(ctx.order_id),
				"Third party returned failure, order failed"
			),
		}
		Ok(())
	}

	fn description(&self) -> &'static str {
		"Record third-party failure"
	}
}

/// Logs a cancellation with its source and target.
pub struct CancelOrderAction;

impl TransitionAction for CancelOrderAction {
	fn execute(&self, ctx: &TransitionContext<'_>) -> Result<(), ActionError> {
		tracing::info!(
			machine = ctx.machine_id,
			order_id = %truncate_id(ctx.order_id),
			source = %ctx.source,
			target = %ctx.target,
			"Order cancelled"
		);
		Ok(())
	}

	fn description(&self) -> &'static str {
		"Cancel order"
	}
}

/// Immutable mapping from action kind to callback.
#[derive(Clone)]
pub struct ActionRegistry {
	actions: HashMap<ActionKind, Arc<dyn TransitionAction>>,
}

impl std::fmt::Debug for ActionRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut kinds: Vec<_> = self.actions.keys().collect();
		kinds.sort();
		f.debug_struct("ActionRegistry")
			.field("actions", &kinds)
			.finish()
	}
}

impl ActionRegistry {
	/// Starts an empty registry builder.
	pub fn builder() -> ActionRegistryBuilder {
		ActionRegistryBuilder::default()
	}

	/// Registry with the default logging action for every kind.
	pub fn logging() -> Self {
		ActionRegistry {
			actions: Self::logging_builder().actions,
		}
	}

	/// Builder pre-populated with the default logging actions, so callers
	/// can override individual kinds.
	pub fn logging_builder() -> ActionRegistryBuilder {
		Self::builder()
			.register(ActionKind::PaySuccess, PaySuccessAction)
			.register(
				ActionKind::ThirdPartiesReturnSuccess,
				ThirdPartiesReturnSuccessAction,
			)
			.register(
				ActionKind::ThirdPartiesReturnFail,
				ThirdPartiesReturnFailAction,
			)
			.register(ActionKind::CancelOrder, CancelOrderAction)
	}

	/// Returns the action bound to `kind`.
	pub fn get(&self, kind: ActionKind) -> Option<&Arc<dyn TransitionAction>> {
		self.actions.get(&kind)
	}
}

/// Collects action bindings and checks them against a transition table.
#[derive(Default)]
pub struct ActionRegistryBuilder {
	actions: HashMap<ActionKind, Arc<dyn TransitionAction>>,
}

impl ActionRegistryBuilder {
	/// Binds `action` to `kind`, replacing any earlier binding.
	pub fn register(mut self, kind: ActionKind, action: impl TransitionAction + 'static) -> Self {
		self.actions.insert(kind, Arc::new(action));
		self
	}

	/// Finishes the registry, failing if `table` references an unbound action.
	pub fn build(self, table: &TransitionTable) -> Result<ActionRegistry, RegistryError> {
		if let Some(missing) = table
			.actions()
			.into_iter()
			.find(|kind| !self.actions.contains_key(kind))
		{
			return Err(RegistryError::MissingAction(missing));
		}
		Ok(ActionRegistry {
			actions: self.actions,
		})
	}
}
