//! Subcommand implementations for `orderctl`.
//!
//! Each command runs against the storage and dispatcher built from the
//! loaded configuration. The lifecycle listener logs every notification the
//! dispatcher publishes until the dispatcher is dropped.

use order_core::{DispatchError, Dispatcher, EventBus, PersistenceError};
use order_storage::{StorageError, StorageService};
use order_types::{truncate_id, LifecycleEvent, Order, OrderEvent, OrderStatus, StorageKey};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Errors surfaced by subcommands.
#[derive(Debug, Error)]
pub enum CommandError {
	#[error("Order {0} already exists")]
	AlreadyExists(String),
	#[error("Dispatch for order {order_id} timed out after {seconds}s")]
	Timeout { order_id: String, seconds: u64 },
	#[error(transparent)]
	Dispatch(#[from] DispatchError),
	#[error(transparent)]
	Persistence(#[from] PersistenceError),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// Everything a subcommand needs.
pub struct App {
	pub dispatcher: Arc<Dispatcher>,
	pub storage: Arc<StorageService>,
	pub timeout: Duration,
}

impl App {
	/// Stores a fresh order record with no status.
	pub async fn create_order(&self, order_id: Option<String>) -> Result<Order, CommandError> {
		let order_id = order_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
		if self
			.storage
			.exists(StorageKey::Orders.as_str(), &order_id)
			.await?
		{
			return Err(CommandError::AlreadyExists(order_id));
		}

		let order = Order::new(order_id);
		self.storage
			.store(StorageKey::Orders.as_str(), &order.id, &order)
			.await?;
		tracing::info!(order_id = %truncate_id(&order.id), "Created order");
		Ok(order)
	}

	/// Dispatches `event` under the configured deadline.
	///
	/// The stored record is passed along as the event payload. It is read
	/// before the dispatcher takes the order's lock, so actions see a
	/// best-effort snapshot that a concurrent dispatch may already have
	/// superseded. The status the machine acts on is always restored under
	/// the lock.
	pub async fn dispatch(
		&self,
		order_id: &str,
		event: OrderEvent,
	) -> Result<OrderStatus, CommandError> {
		let payload = self.payload(order_id).await;

		match tokio::time::timeout(
			self.timeout,
			self.dispatcher.dispatch(order_id, event, payload.as_ref()),
		)
		.await
		{
			Ok(result) => Ok(result?),
			Err(_) => {
				tracing::error!(
					order_id = %truncate_id(order_id),
					event = %event,
					"Dispatch timed out"
				);
				Err(CommandError::Timeout {
					order_id: order_id.to_string(),
					seconds: self.timeout.as_secs(),
				})
			},
		}
	}

	async fn payload(&self, order_id: &str) -> Option<Order> {
		match self
			.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
		{
			Ok(order) => Some(order),
			Err(e) => {
				tracing::debug!(
					order_id = %truncate_id(order_id),
					error = %e,
					"Dispatching without order payload"
				);
				None
			},
		}
	}

	/// Current status of the order.
	pub async fn status(&self, order_id: &str) -> Result<OrderStatus, CommandError> {
		Ok(self.dispatcher.current_status(order_id).await?)
	}

	/// Replays the sample run: order `123` is failed by the third party after
	/// being paid, order `456` is cancelled before payment.
	///
	/// Rejected events are logged and the run continues. Returns the final
	/// status of both orders. Fails without writing anything if either order
	/// already exists in the configured storage.
	pub async fn demo(&self) -> Result<Vec<(String, OrderStatus)>, CommandError> {
		for order_id in ["123", "456"] {
			if self
				.storage
				.exists(StorageKey::Orders.as_str(), order_id)
				.await?
			{
				return Err(CommandError::AlreadyExists(order_id.to_string()));
			}
		}

		let paid = Order::with_status("123", OrderStatus::Processing);
		self.storage
			.store(StorageKey::Orders.as_str(), &paid.id, &paid)
			.await?;
		let fresh = Order::new("456");
		self.storage
			.store(StorageKey::Orders.as_str(), &fresh.id, &fresh)
			.await?;

		let steps = [
			("123", OrderEvent::PaymentSuccessful),
			("123", OrderEvent::ThirdPartiesReturnFailed),
			("123", OrderEvent::ThirdPartiesReturnSuccess),
			("456", OrderEvent::Cancel),
		];

		for (order_id, event) in steps {
			match self.dispatch(order_id, event).await {
				Ok(status) => println!("{} {} -> {}", order_id, event, status),
				Err(CommandError::Dispatch(DispatchError::Transition(e))) => {
					println!("{} {} rejected: {}", order_id, event, e)
				},
				Err(e) => return Err(e),
			}
		}

		let mut result = Vec::new();
		for order_id in ["123", "456"] {
			result.push((order_id.to_string(), self.status(order_id).await?));
		}
		Ok(result)
	}
}

/// Spawns a task logging every lifecycle notification on `bus`.
///
/// The task ends once every sender is gone and returns how many
/// notifications it saw.
pub fn spawn_listener(bus: &EventBus) -> JoinHandle<usize> {
	let mut receiver = bus.subscribe();
	tokio::spawn(async move {
		let mut seen = 0;
		loop {
			match receiver.recv().await {
				Ok(event) => {
					seen += 1;
					log_notice(&event);
				},
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "Lifecycle listener lagged");
				},
				Err(RecvError::Closed) => break,
			}
		}
		seen
	})
}

fn log_notice(event: &LifecycleEvent) {
	let order_id = truncate_id(event.order_id());
	match event {
		LifecycleEvent::Transitioned { to, .. } => {
			let notice = match to {
				OrderStatus::Processing => "Order paid, waiting on third party",
				OrderStatus::Success => "Third party confirmed order",
				OrderStatus::Failure => "Third party rejected order",
				OrderStatus::Cancel => "Order cancelled",
				OrderStatus::Created => "Order reset",
			};
			tracing::info!(order_id = %order_id, status = %to, "{}", notice);
		},
		LifecycleEvent::Rejected { status, event, .. } => {
			tracing::debug!(
				order_id = %order_id,
				status = %status,
				event = %event,
				"Event rejected"
			);
		},
		LifecycleEvent::PersistFailed { status, .. } => {
			tracing::error!(
				order_id = %order_id,
				status = %status,
				"Order status may be stale"
			);
		},
	}
}
