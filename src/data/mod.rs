pub mod bootstrap;
pub mod price_stream;
pub mod snapshot;

pub use snapshot::SnapshotStore;
