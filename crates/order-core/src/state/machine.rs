//! Order state machine instance.
//!
//! An [`OrderStateMachine`] binds the shared transition table and action
//! registry to one order id and its current status. Instances are cheap and
//! short-lived: the dispatcher builds one per event from the persisted
//! status and drops it afterwards.

use super::actions::{ActionError, ActionRegistry, TransitionContext};
use super::transitions::{ActionKind, TransitionTable};
use order_types::{Order, OrderEvent, OrderStatus};
use std::sync::Arc;
use thiserror::Error;

/// Errors produced when applying an event to a machine instance.
///
/// In both cases the instance keeps the status it had before the event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
	#[error("Event {event} is not supported in state {state}")]
	Unsupported {
		state: OrderStatus,
		event: OrderEvent,
	},
	#[error("Action '{action}' failed: {cause}")]
	ActionFailed {
		action: ActionKind,
		#[source]
		cause: ActionError,
	},
}

/// A state machine instance bound to a single order.
pub struct OrderStateMachine {
	machine_id: String,
	order_id: String,
	state: OrderStatus,
	table: Arc<TransitionTable>,
	actions: Arc<ActionRegistry>,
}

impl OrderStateMachine {
	pub fn new(
		machine_id: impl Into<String>,
		order_id: impl Into<String>,
		state: OrderStatus,
		table: Arc<TransitionTable>,
		actions: Arc<ActionRegistry>,
	) -> Self {
		Self {
			machine_id: machine_id.into(),
			order_id: order_id.into(),
			state,
			table,
			actions,
		}
	}

	/// Current status of the order.
	pub fn state(&self) -> OrderStatus {
		self.state
	}

	/// Applies `event`, running the bound action, and returns the new status.
	///
	/// The status only changes once the action has returned `Ok`.
	pub fn apply(
		&mut self,
		event: OrderEvent,
		payload: Option<&Order>,
	) -> Result<OrderStatus, TransitionError> {
		let rule = *self
			.table
			.resolve(self.state, event)
			.ok_or(TransitionError::Unsupported {
				state: self.state,
				event,
			})?;

		// A registry built against this table always binds the rule's action
		let action = self
			.actions
			.get(rule.action)
			.ok_or_else(|| TransitionError::ActionFailed {
				action: rule.action,
				cause: ActionError::Failed("no action registered".into()),
			})?;

		tracing::debug!(
			action = %rule.action,
			description = action.description(),
			"Running transition action"
		);
		let ctx = TransitionContext {
			machine_id: &self.machine_id,
			order_id: &self.order_id,
			source: rule.source,
			target: rule.target,
			event,
			payload,
		};
		action
			.execute(&ctx)
			.map_err(|cause| TransitionError::ActionFailed {
				action: rule.action,
				cause,
			})?;

		self.state = rule.target;
		Ok(self.state)
	}
}

impl std::fmt::Debug for OrderStateMachine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OrderStateMachine")
			.field("machine_id", &self.machine_id)
			.field("order_id", &self.order_id)
			.field("state", &self.state)
			.finish()
	}
}
