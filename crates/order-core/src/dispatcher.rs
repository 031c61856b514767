//! Entry point for delivering events to orders.
//!
//! A dispatch holds the order's lock for the whole restore, apply and
//! persist sequence, so two events for the same order never interleave.
//! Events for different orders run fully concurrently. Once the lock is
//! released and nobody else is waiting on it, its entry is evicted from the
//! lock map.

use crate::event_bus::EventBus;
use crate::persistence::{PersistenceAdapter, PersistenceError};
use crate::state::{ActionRegistry, OrderStateMachine, TransitionError, TransitionTable};
use dashmap::DashMap;
use order_types::{truncate_id, LifecycleEvent, Order, OrderEvent, OrderStatus};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::instrument;

/// Errors returned by [`Dispatcher::dispatch`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
	/// The event was rejected; nothing was persisted.
	#[error(transparent)]
	Transition(#[from] TransitionError),
	/// The stored status could not be read or decoded; nothing was applied.
	#[error("Failed to restore order state: {0}")]
	Restore(#[source] PersistenceError),
	/// The transition ran but its result is not durable.
	#[error("Order {order_id} moved to {status} but could not be persisted: {source}")]
	PersistFailed {
		order_id: String,
		status: OrderStatus,
		#[source]
		source: PersistenceError,
	},
}

/// Per-order lock held for one dispatch.
///
/// Dropping it releases the order and evicts the map entry if no other
/// dispatch holds or waits on it. Runs on cancellation too.
struct OrderLock<'a> {
	locks: &'a DashMap<String, Arc<Mutex<()>>>,
	order_id: &'a str,
	guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OrderLock<'_> {
	fn drop(&mut self) {
		drop(self.guard.take());
		self.locks
			.remove_if(self.order_id, |_, lock| Arc::strong_count(lock) == 1);
	}
}

/// Serializes, restores, applies, persists and publishes order events.
pub struct Dispatcher {
	machine_id: String,
	table: Arc<TransitionTable>,
	actions: Arc<ActionRegistry>,
	persistence: PersistenceAdapter,
	locks: DashMap<String, Arc<Mutex<()>>>,
	event_bus: EventBus,
}

impl Dispatcher {
	pub fn new(
		machine_id: impl Into<String>,
		table: Arc<TransitionTable>,
		actions: Arc<ActionRegistry>,
		persistence: PersistenceAdapter,
		event_bus: EventBus,
	) -> Self {
		Self {
			machine_id: machine_id.into(),
			table,
			actions,
			persistence,
			locks: DashMap::new(),
			event_bus,
		}
	}

	pub fn machine_id(&self) -> &str {
		&self.machine_id
	}

	/// Bus carrying a notification for every completed dispatch.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	async fn lock_order<'a>(&'a self, order_id: &'a str) -> OrderLock<'a> {
		let lock = self.locks.entry(order_id.to_string()).or_default().clone();
		let guard = lock.lock_owned().await;
		OrderLock {
			locks: &self.locks,
			order_id,
			guard: Some(guard),
		}
	}

	/// Delivers `event` to the order and returns its new status.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), event = %event))]
	pub async fn dispatch(
		&self,
		order_id: &str,
		event: OrderEvent,
		payload: Option<&Order>,
	) -> Result<OrderStatus, DispatchError> {
		let _lock = self.lock_order(order_id).await;

		let from = self.persistence.restore(order_id).await.map_err(|e| {
			tracing::warn!(error = %e, "Failed to restore order state");
			DispatchError::Restore(e)
		})?;

		let mut machine = OrderStateMachine::new(
			self.machine_id.as_str(),
			order_id,
			from,
			self.table.clone(),
			self.actions.clone(),
		);

		let to = match machine.apply(event, payload) {
			Ok(to) => to,
			Err(e) => {
				tracing::warn!(state = %from, error = %e, "Event rejected");
				self.event_bus
					.publish(LifecycleEvent::Rejected {
						order_id: order_id.to_string(),
						status: from,
						event,
						reason: e.to_string(),
					})
					.ok();
				return Err(e.into());
			},
		};

		if let Err(e) = self.persistence.persist(order_id, to).await {
			tracing::error!(
				from = %from,
				to = %to,
				error = %e,
				"Transition applied but not persisted, stored status is stale"
			);
			self.event_bus
				.publish(LifecycleEvent::PersistFailed {
					order_id: order_id.to_string(),
					status: to,
					error: e.to_string(),
				})
				.ok();
			return Err(DispatchError::PersistFailed {
				order_id: order_id.to_string(),
				status: to,
				source: e,
			});
		}

		tracing::info!(from = %from, to = %to, "Order transitioned");
		self.event_bus
			.publish(LifecycleEvent::Transitioned {
				order_id: order_id.to_string(),
				from,
				to,
				event,
			})
			.ok();

		Ok(to)
	}

	/// Restores the order's status without applying anything.
	pub async fn current_status(&self, order_id: &str) -> Result<OrderStatus, PersistenceError> {
		self.persistence.restore(order_id).await
	}
}
