//! Transition table for the order lifecycle.
//!
//! The table maps a (status, event) pair to at most one [`TransitionRule`].
//! The standard order lifecycle is built once on first use and shared
//! read-only for the life of the process:
//!
//! ```text
//! CREATED    --PAYMENT_SUCCESSFUL-----------> PROCESSING  (paySuccess)
//! PROCESSING --THIRD_PARTIES_RETURN_SUCCESS-> SUCCESS     (thirdPartiesReturnSuccess)
//! PROCESSING --THIRD_PARTIES_RETURN_FAILED--> FAILURE     (thirdPartiesReturnFail)
//! CREATED    --CANCEL-----------------------> CANCEL      (cancelOrder)
//! PROCESSING --CANCEL-----------------------> CANCEL      (cancelOrder)
//! ```

use once_cell::sync::Lazy;
use order_types::{OrderEvent, OrderStatus};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

/// Identifies the action bound to a transition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
	PaySuccess,
	ThirdPartiesReturnSuccess,
	ThirdPartiesReturnFail,
	CancelOrder,
}

impl ActionKind {
	/// Name of the action as it appears in logs.
	pub fn name(&self) -> &'static str {
		match self {
			Self::PaySuccess => "paySuccess",
			Self::ThirdPartiesReturnSuccess => "thirdPartiesReturnSuccess",
			Self::ThirdPartiesReturnFail => "thirdPartiesReturnFail",
			Self::CancelOrder => "cancelOrder",
		}
	}

	/// Returns an iterator over all action kinds.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::PaySuccess,
			Self::ThirdPartiesReturnSuccess,
			Self::ThirdPartiesReturnFail,
			Self::CancelOrder,
		]
		.into_iter()
	}
}

impl fmt::Display for ActionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// A single immutable rule: `source --event--> target`, running `action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
	pub source: OrderStatus,
	pub event: OrderEvent,
	pub target: OrderStatus,
	pub action: ActionKind,
}

impl TransitionRule {
	pub const fn new(
		source: OrderStatus,
		event: OrderEvent,
		target: OrderStatus,
		action: ActionKind,
	) -> Self {
		Self {
			source,
			event,
			target,
			action,
		}
	}
}

/// Errors raised while building a transition table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
	#[error("Duplicate rule for {state} on {event}")]
	DuplicateRule {
		state: OrderStatus,
		event: OrderEvent,
	},
}

const ORDER_LIFECYCLE_RULES: [TransitionRule; 5] = [
	TransitionRule::new(
		OrderStatus::Created,
		OrderEvent::PaymentSuccessful,
		OrderStatus::Processing,
		ActionKind::PaySuccess,
	),
	TransitionRule::new(
		OrderStatus::Processing,
		OrderEvent::ThirdPartiesReturnSuccess,
		OrderStatus::Success,
		ActionKind::ThirdPartiesReturnSuccess,
	),
	TransitionRule::new(
		OrderStatus::Processing,
		OrderEvent::ThirdPartiesReturnFailed,
		OrderStatus::Failure,
		ActionKind::ThirdPartiesReturnFail,
	),
	TransitionRule::new(
		OrderStatus::Created,
		OrderEvent::Cancel,
		OrderStatus::Cancel,
		ActionKind::CancelOrder,
	),
	TransitionRule::new(
		OrderStatus::Processing,
		OrderEvent::Cancel,
		OrderStatus::Cancel,
		ActionKind::CancelOrder,
	),
];

static ORDER_LIFECYCLE: Lazy<TransitionTable> = Lazy::new(|| TransitionTable {
	rules: ORDER_LIFECYCLE_RULES
		.iter()
		.map(|rule| ((rule.source, rule.event), *rule))
		.collect(),
});

/// Deterministic (status, event) -> rule lookup.
#[derive(Debug, Clone)]
pub struct TransitionTable {
	rules: HashMap<(OrderStatus, OrderEvent), TransitionRule>,
}

impl TransitionTable {
	/// The standard order lifecycle table.
	pub fn order_lifecycle() -> &'static TransitionTable {
		&ORDER_LIFECYCLE
	}

	/// Builds a table from arbitrary rules, rejecting duplicate keys.
	pub fn from_rules(
		rules: impl IntoIterator<Item = TransitionRule>,
	) -> Result<Self, TableError> {
		let mut map = HashMap::new();
		for rule in rules {
			if map.insert((rule.source, rule.event), rule).is_some() {
				return Err(TableError::DuplicateRule {
					state: rule.source,
					event: rule.event,
				});
			}
		}
		Ok(Self { rules: map })
	}

	/// Returns the rule for `(state, event)`, or `None` if the event is not
	/// accepted from that state.
	pub fn resolve(&self, state: OrderStatus, event: OrderEvent) -> Option<&TransitionRule> {
		self.rules.get(&(state, event))
	}

	/// All rules, in no particular order.
	pub fn rules(&self) -> impl Iterator<Item = &TransitionRule> {
		self.rules.values()
	}

	/// Events accepted from `state`.
	pub fn events_from(&self, state: OrderStatus) -> Vec<OrderEvent> {
		OrderEvent::all()
			.filter(|event| self.rules.contains_key(&(state, *event)))
			.collect()
	}

	/// The distinct actions referenced by the table.
	pub fn actions(&self) -> BTreeSet<ActionKind> {
		self.rules.values().map(|rule| rule.action).collect()
	}
}
