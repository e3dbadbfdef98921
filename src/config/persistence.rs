//! File persistence configuration for pipeline snapshots.
use crate::domain::PairInterval;
use crate::utils::TimeUtils;

/// Configuration for pipeline snapshot persistence
pub struct SnapshotPersistenceConfig {
    /// Directory path for storing snapshot files
    pub directory: &'static str,
    /// Base filename for snapshot files (without extension)
    pub filename_base: &'static str,
    /// Current version of the snapshot serialization format
    pub version: u32,
}

pub struct PersistenceConfig {
    pub snapshot: SnapshotPersistenceConfig,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    snapshot: SnapshotPersistenceConfig {
        directory: "snapshot_data",
        filename_base: "ce",
        version: 1,
    },
};

/// Generate a per-stream snapshot filename.
/// Example: "ce_ETHUSDT_1m_v1.bin"
pub fn snapshot_filename(pair: &PairInterval) -> String {
    format!(
        "{}_{}_{}_v{}.bin",
        PERSISTENCE.snapshot.filename_base,
        pair.name,
        TimeUtils::interval_to_string(pair.interval_ms),
        PERSISTENCE.snapshot.version
    )
}
