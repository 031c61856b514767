//! Event bus for lifecycle notifications.
//!
//! Thin wrapper around a tokio broadcast channel. The dispatcher publishes a
//! [`LifecycleEvent`] after each dispatch completes; any number of listeners
//! can subscribe. Publishing with no subscribers is not an error for callers
//! that ignore the result.

use order_types::LifecycleEvent;
use tokio::sync::broadcast;

/// Broadcast channel carrying [`LifecycleEvent`]s.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per slow receiver.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Subscribes to all events published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event, returning the number of receivers it reached.
	pub fn publish(
		&self,
		event: LifecycleEvent,
	) -> Result<usize, broadcast::error::SendError<LifecycleEvent>> {
		self.sender.send(event)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use order_types::{OrderEvent, OrderStatus};

	fn transitioned(order_id: &str) -> LifecycleEvent {
		LifecycleEvent::Transitioned {
			order_id: order_id.to_string(),
			from: OrderStatus::Created,
			to: OrderStatus::Processing,
			event: OrderEvent::PaymentSuccessful,
		}
	}

	#[tokio::test]
	async fn test_publish_reaches_all_subscribers() {
		let bus = EventBus::new(8);
		let mut first = bus.subscribe();
		let mut second = bus.clone().subscribe();

		assert_eq!(bus.publish(transitioned("123")).unwrap(), 2);
		assert_eq!(first.recv().await.unwrap(), transitioned("123"));
		assert_eq!(second.recv().await.unwrap(), transitioned("123"));
	}

	#[test]
	fn test_publish_without_subscribers() {
		let bus = EventBus::new(8);
		assert!(bus.publish(transitioned("123")).is_err());

		// Dropped subscribers no longer count
		let receiver = bus.subscribe();
		assert_eq!(bus.publish(transitioned("123")).unwrap(), 1);
		drop(receiver);
		assert!(bus.publish(transitioned("123")).is_err());
	}
}
