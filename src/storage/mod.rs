pub mod model;
pub mod store;

pub use model::{CounterSnapshot, Counters};
pub use store::{SnapshotStore, StoreError};
