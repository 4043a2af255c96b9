pub mod exposition;
pub mod snapshot;
pub mod store;


pub use snapshot::{MetricsSnapshot, MonthTag, SnapshotBuilder};
pub use store::SnapshotStore;
