//! Subscription store adapter.
//!
//! The resolver consumes a narrow read interface. Creating, editing and
//! deleting subscriptions belongs to the authoring surface; the in-memory
//! backend exposes those writes for embedded use and tests.

mod memory;
mod row;
mod traits;

pub use memory::InMemorySubscriptionStore;
pub use row::SubscriptionRow;
pub use traits::{StorageError, SubscriptionStore};
