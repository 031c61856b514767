//! Common types for the order lifecycle system.
//!
//! This crate defines the vocabulary shared by every other crate in the
//! workspace: order statuses, the events that move an order between them,
//! the order record itself, storage keys and configuration validation.

/// Event vocabulary and lifecycle notifications.
pub mod events;
/// Order record and status types.
pub mod order;
/// Registry trait for named implementations.
pub mod registry;
/// Storage types for managing persistent data.
pub mod storage;
/// Small helpers shared across crates.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use events::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use storage::*;
pub use utils::{current_timestamp, truncate_id};
pub use validation::*;
