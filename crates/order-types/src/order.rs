//! Order record and lifecycle status types.
//!
//! The order record is owned by the surrounding application. The state
//! machine only reads its `status` field to restore itself and writes the
//! field back after a successful transition.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::current_timestamp;

/// Error returned when a string does not name a known status or event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value:?}")]
pub struct ParseVocabularyError {
	/// What was being parsed ("order status" or "order event").
	pub kind: &'static str,
	/// The rejected input.
	pub value: String,
}

/// Lifecycle status of an order.
///
/// `Created` is the only initial status. `Success`, `Failure` and `Cancel`
/// are terminal: no event moves an order out of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	/// Order exists but has not been paid.
	#[default]
	Created,
	/// Payment received, waiting on the third party.
	Processing,
	/// Third party confirmed the order.
	Success,
	/// Third party rejected the order.
	Failure,
	/// Order was cancelled before completion.
	Cancel,
}

impl OrderStatus {
	/// Returns the persisted string form of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Created => "CREATED",
			Self::Processing => "PROCESSING",
			Self::Success => "SUCCESS",
			Self::Failure => "FAILURE",
			Self::Cancel => "CANCEL",
		}
	}

	/// Check if this is a terminal state (no further transitions allowed)
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Success | Self::Failure | Self::Cancel)
	}

	/// Returns an iterator over all statuses.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Created,
			Self::Processing,
			Self::Success,
			Self::Failure,
			Self::Cancel,
		]
		.into_iter()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = ParseVocabularyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"CREATED" => Ok(Self::Created),
			"PROCESSING" => Ok(Self::Processing),
			"SUCCESS" => Ok(Self::Success),
			"FAILURE" => Ok(Self::Failure),
			"CANCEL" => Ok(Self::Cancel),
			_ => Err(ParseVocabularyError {
				kind: "order status",
				value: s.to_string(),
			}),
		}
	}
}

/// An order as stored by the surrounding application.
///
/// `status` is kept as the raw stored string so that a record holding a
/// value outside the known statuses can still be loaded and reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier for this order.
	pub id: String,
	/// Last persisted status, `None` for an order that was never transitioned.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	/// Timestamp when this order was created.
	pub created_at: u64,
	/// Timestamp when this order was last updated.
	pub updated_at: u64,
}

impl Order {
	/// Creates a new order record with no recorded status.
	pub fn new(id: impl Into<String>) -> Self {
		let now = current_timestamp();
		Self {
			id: id.into(),
			status: None,
			created_at: now,
			updated_at: now,
		}
	}

	/// Creates an order record already holding the given status.
	pub fn with_status(id: impl Into<String>, status: OrderStatus) -> Self {
		Self {
			status: Some(status.to_string()),
			..Self::new(id)
		}
	}
}

impl fmt::Display for Order {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"Order(id={}, status={})",
			self.id,
			self.status.as_deref().unwrap_or("<none>")
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_terminal_statuses() {
		assert!(OrderStatus::Success.is_terminal());
		assert!(OrderStatus::Failure.is_terminal());
		assert!(OrderStatus::Cancel.is_terminal());
		assert!(!OrderStatus::Created.is_terminal());
		assert!(!OrderStatus::Processing.is_terminal());
	}

	#[test]
	fn test_status_string_conversion() {
		for status in OrderStatus::all() {
			assert_eq!(status.to_string().parse::<OrderStatus>(), Ok(status));
		}
		assert_eq!(OrderStatus::Processing.to_string(), "PROCESSING");
	}

	#[test]
	fn test_status_parse_is_exact() {
		assert!("processing".parse::<OrderStatus>().is_err());
		assert!(" PROCESSING".parse::<OrderStatus>().is_err());
		assert!("".parse::<OrderStatus>().is_err());

		let err = "DONE".parse::<OrderStatus>().unwrap_err();
		assert_eq!(err.value, "DONE");
	}

	#[test]
	fn test_status_serde_matches_display() {
		let json = serde_json::to_string(&OrderStatus::Cancel).unwrap();
		assert_eq!(json, "\"CANCEL\"");
	}

	#[test]
	fn test_default_status_is_created() {
		assert_eq!(OrderStatus::default(), OrderStatus::Created);
	}

	#[test]
	fn test_new_order_has_no_status() {
		let order = Order::new("123");
		assert_eq!(order.status, None);
		assert_eq!(order.created_at, order.updated_at);

		let json = serde_json::to_value(&order).unwrap();
		assert!(json.get("status").is_none());

		let order = Order::with_status("123", OrderStatus::Processing);
		assert_eq!(order.status.as_deref(), Some("PROCESSING"));
	}
}
