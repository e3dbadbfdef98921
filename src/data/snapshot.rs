use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::snapshot_filename;
use crate::domain::PairInterval;
use crate::indicator::PipelineInstance;

/// Per-stream pipeline snapshots on disk. One bincode file per
/// (symbol, interval); written after every closed candle so a process
/// restart resumes without re-triggering old flips or losing warm-up.
pub struct SnapshotStore {
    directory: PathBuf,
}

impl SnapshotStore {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        SnapshotStore {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, pair: &PairInterval) -> PathBuf {
        self.directory.join(snapshot_filename(pair))
    }

    pub fn save(&self, instance: &PipelineInstance) -> Result<()> {
        std::fs::create_dir_all(&self.directory).with_context(|| {
            format!("Failed to create snapshot directory {}", self.directory.display())
        })?;
        let path = self.path_for(instance.pair());
        let bytes = bincode::serialize(instance)
            .with_context(|| format!("Failed to serialize snapshot for {}", instance.pair()))?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(())
    }

    pub fn load(&self, pair: &PairInterval) -> Result<Option<PipelineInstance>> {
        let path = self.path_for(pair);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let instance = bincode::deserialize(&bytes)
            .with_context(|| format!("Failed to decode snapshot {}", path.display()))?;
        Ok(Some(instance))
    }
}
