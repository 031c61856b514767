//! Event types for the order lifecycle.
//!
//! [`OrderEvent`] is the closed set of signals that request a status change.
//! [`LifecycleEvent`] is what the dispatcher publishes on the event bus once
//! a dispatch has finished, so that follow-up work never runs before the new
//! status is durable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{OrderStatus, ParseVocabularyError};

/// Signals that can trigger an order status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
	/// The customer's payment went through.
	PaymentSuccessful,
	/// The third-party service accepted the order.
	ThirdPartiesReturnSuccess,
	/// The third-party service rejected the order.
	ThirdPartiesReturnFailed,
	/// Cancellation was requested.
	Cancel,
}

impl OrderEvent {
	/// Returns the string form of the event.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::PaymentSuccessful => "PAYMENT_SUCCESSFUL",
			Self::ThirdPartiesReturnSuccess => "THIRD_PARTIES_RETURN_SUCCESS",
			Self::ThirdPartiesReturnFailed => "THIRD_PARTIES_RETURN_FAILED",
			Self::Cancel => "CANCEL",
		}
	}

	/// Returns an iterator over all events.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::PaymentSuccessful,
			Self::ThirdPartiesReturnSuccess,
			Self::ThirdPartiesReturnFailed,
			Self::Cancel,
		]
		.into_iter()
	}
}

impl fmt::Display for OrderEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderEvent {
	type Err = ParseVocabularyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"PAYMENT_SUCCESSFUL" => Ok(Self::PaymentSuccessful),
			"THIRD_PARTIES_RETURN_SUCCESS" => Ok(Self::ThirdPartiesReturnSuccess),
			"THIRD_PARTIES_RETURN_FAILED" => Ok(Self::ThirdPartiesReturnFailed),
			"CANCEL" => Ok(Self::Cancel),
			_ => Err(ParseVocabularyError {
				kind: "order event",
				value: s.to_string(),
			}),
		}
	}
}

/// Notifications published after a dispatch completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
	/// A transition was applied and persisted.
	Transitioned {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
		event: OrderEvent,
	},
	/// The event had no rule from the current status, or its action failed.
	Rejected {
		order_id: String,
		status: OrderStatus,
		event: OrderEvent,
		reason: String,
	},
	/// The transition was applied in memory but could not be persisted.
	PersistFailed {
		order_id: String,
		status: OrderStatus,
		error: String,
	},
}

impl LifecycleEvent {
	/// Returns the order the notification refers to.
	pub fn order_id(&self) -> &str {
		match self {
			Self::Transitioned { order_id, .. }
			| Self::Rejected { order_id, .. }
			| Self::PersistFailed { order_id, .. } => order_id,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_event_string_conversion() {
		for event in OrderEvent::all() {
			assert_eq!(event.as_str().parse::<OrderEvent>(), Ok(event));
		}
		assert!("cancel".parse::<OrderEvent>().is_err());
		assert!("PAYMENT_FAILED".parse::<OrderEvent>().is_err());
	}

	#[test]
	fn test_event_serde() {
		let json = serde_json::to_string(&OrderEvent::ThirdPartiesReturnFailed).unwrap();
		assert_eq!(json, "\"THIRD_PARTIES_RETURN_FAILED\"");

		let parsed: OrderEvent = serde_json::from_str("\"PAYMENT_SUCCESSFUL\"").unwrap();
		assert_eq!(parsed, OrderEvent::PaymentSuccessful);
	}

	#[test]
	fn test_lifecycle_event_order_id() {
		let event = LifecycleEvent::Rejected {
			order_id: "123".into(),
			status: OrderStatus::Failure,
			event: OrderEvent::Cancel,
			reason: "unsupported".into(),
		};
		assert_eq!(event.order_id(), "123");
	}
}
