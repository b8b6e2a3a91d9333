pub mod snapshot;
pub use snapshot::{write_with_retry, RetryPolicy, SnapshotRepository, SnapshotStore};
