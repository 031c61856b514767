//! Restoring and persisting machine state through the order record.
//!
//! The order record is the only durable copy of an order's status. The
//! [`StatusStore`] trait is the seam to whatever holds those records; the
//! [`PersistenceAdapter`] turns the raw stored string into an
//! [`OrderStatus`] and back.

use async_trait::async_trait;
use order_storage::{StorageError, StorageService};
use order_types::{current_timestamp, Order, OrderStatus, StorageKey};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while reading or writing an order's status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
	#[error("Order not found: {0}")]
	OrderNotFound(String),
	#[error("Order {order_id} holds unknown status {value:?}")]
	CorruptStatus { order_id: String, value: String },
	#[error("Storage error: {0}")]
	Storage(String),
}

/// Outbound contract to the store holding order records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusStore: Send + Sync {
	/// Returns the raw stored status, `None` if the order never had one.
	async fn read_status(&self, order_id: &str) -> Result<Option<String>, PersistenceError>;

	/// Overwrites the stored status.
	async fn write_status(&self, order_id: &str, status: &str) -> Result<(), PersistenceError>;
}

/// [`StatusStore`] backed by a [`StorageService`], keeping full [`Order`]
/// records under the orders namespace.
pub struct StorageStatusStore {
	storage: Arc<StorageService>,
}

impl StorageStatusStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	async fn load(&self, order_id: &str) -> Result<Order, PersistenceError> {
		self.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => PersistenceError::OrderNotFound(order_id.to_string()),
				other => PersistenceError::Storage(other.to_string()),
			})
	}
}

#[async_trait]
impl StatusStore for StorageStatusStore {
	async fn read_status(&self, order_id: &str) -> Result<Option<String>, PersistenceError> {
		Ok(self.load(order_id).await?.status)
	}

	async fn write_status(&self, order_id: &str, status: &str) -> Result<(), PersistenceError> {
		let mut order = self.load(order_id).await?;
		order.status = Some(status.to_string());
		order.updated_at = current_timestamp();

		self.storage
			.update(StorageKey::Orders.as_str(), order_id, &order)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => PersistenceError::OrderNotFound(order_id.to_string()),
				other => PersistenceError::Storage(other.to_string()),
			})
	}
}

/// Decodes a stored status.
///
/// Absent or empty means the order was never transitioned and is `CREATED`.
/// Any other value must be an exact status name.
pub fn restore_status(raw: Option<&str>) -> Result<OrderStatus, String> {
	match raw {
		None | Some("") => Ok(OrderStatus::Created),
		Some(value) => value.parse().map_err(|_| value.to_string()),
	}
}

/// Restores and persists machine state for an order id.
#[derive(Clone)]
pub struct PersistenceAdapter {
	store: Arc<dyn StatusStore>,
}

impl PersistenceAdapter {
	pub fn new(store: Arc<dyn StatusStore>) -> Self {
		Self { store }
	}

	/// Reads the stored status and decodes it.
	pub async fn restore(&self, order_id: &str) -> Result<OrderStatus, PersistenceError> {
		let raw = self.store.read_status(order_id).await?;
		restore_status(raw.as_deref()).map_err(|value| PersistenceError::CorruptStatus {
			order_id: order_id.to_string(),
			value,
		})
	}

	/// Writes the status name back to the order record.
	pub async fn persist(&self, order_id: &str, status: OrderStatus) -> Result<(), PersistenceError> {
		self.store.write_status(order_id, status.as_str()).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use order_storage::implementations::memory::MemoryStorage;

	async fn storage_with(orders: &[Order]) -> Arc<StorageService> {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		for order in orders {
			storage
				.store(StorageKey::Orders.as_str(), &order.id, order)
				.await
				.unwrap();
		}
		storage
	}

	#[test]
	fn test_restore_status_rules() {
		assert_eq!(restore_status(None), Ok(OrderStatus::Created));
		assert_eq!(restore_status(Some("")), Ok(OrderStatus::Created));
		assert_eq!(restore_status(Some("PROCESSING")), Ok(OrderStatus::Processing));
		assert_eq!(restore_status(Some("CANCEL")), Ok(OrderStatus::Cancel));
		assert_eq!(restore_status(Some("processing")), Err("processing".to_string()));
		assert_eq!(restore_status(Some(" SUCCESS")), Err(" SUCCESS".to_string()));
	}

	#[tokio::test]
	async fn test_restore_is_idempotent() {
		let storage = storage_with(&[Order::with_status("123", OrderStatus::Processing)]).await;
		let adapter = PersistenceAdapter::new(Arc::new(StorageStatusStore::new(storage)));

		let first = adapter.restore("123").await.unwrap();
		let second = adapter.restore("123").await.unwrap();
		assert_eq!(first, OrderStatus::Processing);
		assert_eq!(first, second);
	}

	#[tokio::test]
	async fn test_restore_defaults_to_created() {
		let storage = storage_with(&[Order::new("123")]).await;
		let adapter = PersistenceAdapter::new(Arc::new(StorageStatusStore::new(storage)));

		assert_eq!(adapter.restore("123").await.unwrap(), OrderStatus::Created);
	}

	#[tokio::test]
	async fn test_restore_missing_order() {
		let storage = storage_with(&[]).await;
		let adapter = PersistenceAdapter::new(Arc::new(StorageStatusStore::new(storage)));

		assert_eq!(
			adapter.restore("nope").await,
			Err(PersistenceError::OrderNotFound("nope".into()))
		);
	}

	#[tokio::test]
	async fn test_restore_surfaces_corrupt_status() {
		let mut order = Order::new("123");
		order.status = Some("SHIPPED".into());
		let storage = storage_with(&[order]).await;
		let adapter = PersistenceAdapter::new(Arc::new(StorageStatusStore::new(storage)));

		assert_eq!(
			adapter.restore("123").await,
			Err(PersistenceError::CorruptStatus {
				order_id: "123".into(),
				value: "SHIPPED".into(),
			})
		);
	}

	#[tokio::test]
	async fn test_persist_writes_status_name() {
		let mut order = Order::new("456");
		order.updated_at = 0;
		let storage = storage_with(&[order]).await;
		let adapter = PersistenceAdapter::new(Arc::new(StorageStatusStore::new(storage.clone())));

		adapter.persist("456", OrderStatus::Cancel).await.unwrap();

		let stored: Order = storage
			.retrieve(StorageKey::Orders.as_str(), "456")
			.await
			.unwrap();
		assert_eq!(stored.status.as_deref(), Some("CANCEL"));
		assert!(stored.updated_at > 0);
		assert_eq!(adapter.restore("456").await.unwrap(), OrderStatus::Cancel);
	}

	#[tokio::test]
	async fn test_persist_missing_order() {
		let storage = storage_with(&[]).await;
		let adapter = PersistenceAdapter::new(Arc::new(StorageStatusStore::new(storage)));

		assert_eq!(
			adapter.persist("nope", OrderStatus::Cancel).await,
			Err(PersistenceError::OrderNotFound("nope".into()))
		);
	}

	#[tokio::test]
	async fn test_adapter_over_mock_store() {
		let mut store = MockStatusStore::new();
		store
			.expect_read_status()
			.withf(|id| id == "789")
			.returning(|_| Ok(Some("SUCCESS".into())));
		store
			.expect_write_status()
			.returning(|_, _| Err(PersistenceError::Storage("disk full".into())));
		let adapter = PersistenceAdapter::new(Arc::new(store));

		assert_eq!(adapter.restore("789").await.unwrap(), OrderStatus::Success);
		assert!(matches!(
			adapter.persist("789", OrderStatus::Failure).await,
			Err(PersistenceError::Storage(_))
		));
	}
}
