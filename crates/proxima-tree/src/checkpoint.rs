//! Checkpoint persistence via bincode.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::error::ProximityError;
use crate::split::Split;
use crate::tree::{NodeId, Tree};

/// Current checkpoint format version.
const FORMAT_VERSION: u32 = 1;

/// Checkpoint file name within the configured directory.
const CHECKPOINT_FILE: &str = "proximity-tree.ckpt";

/// Versioned whole-state snapshot of an in-progress build.
#[derive(serde::Serialize, serde::Deserialize)]
pub(crate) struct CheckpointEnvelope {
    /// Format version for compatibility checking.
    pub(crate) format_version: u32,
    /// Class cardinality of the training data the build ran against.
    pub(crate) n_classes: usize,
    /// The tree built so far.
    pub(crate) tree: Tree<Split>,
    /// Nodes still waiting to be built.
    pub(crate) queue: VecDeque<NodeId>,
    /// Build time accumulated so far.
    pub(crate) elapsed: Duration,
    /// Longest single node-build duration observed so far.
    pub(crate) longest_node_build: Duration,
    /// Random-generator state at the time of the snapshot.
    pub(crate) rng: ChaCha8Rng,
}

impl CheckpointEnvelope {
    pub(crate) fn new(
        n_classes: usize,
        tree: Tree<Split>,
        queue: VecDeque<NodeId>,
        elapsed: Duration,
        longest_node_build: Duration,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            n_classes,
            tree,
            queue,
            elapsed,
            longest_node_build,
            rng,
        }
    }
}

/// Write a checkpoint into `dir`, creating the directory if needed.
///
/// Persistence is a synchronous side effect on the build thread; a
/// concurrent external reader mid-write is not guaranteed a consistent
/// snapshot.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ProximityError::SerializeCheckpoint`] | bincode encoding failed |
/// | [`ProximityError::WriteCheckpoint`] | directory creation or file write failed |
pub(crate) fn save(dir: &Path, envelope: &CheckpointEnvelope) -> Result<(), ProximityError> {
    std::fs::create_dir_all(dir).map_err(|e| ProximityError::WriteCheckpoint {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let path = dir.join(CHECKPOINT_FILE);

    let bytes = bincode::serialize(envelope)
        .map_err(|e| ProximityError::SerializeCheckpoint { source: e })?;
    std::fs::write(&path, &bytes).map_err(|e| ProximityError::WriteCheckpoint {
        path: path.clone(),
        source: e,
    })?;

    debug!(
        path = %path.display(),
        size_bytes = bytes.len(),
        queued = envelope.queue.len(),
        "checkpoint saved"
    );
    Ok(())
}

/// Load a checkpoint from `dir`, failing closed.
///
/// A missing file is the normal no-checkpoint case and returns `None`
/// silently; an unreadable, corrupt, or version-incompatible file also
/// returns `None` but logs a warning — the caller starts a fresh build
/// rather than ever seeing an inconsistent tree.
pub(crate) fn load(dir: &Path) -> Option<CheckpointEnvelope> {
    let path = dir.join(CHECKPOINT_FILE);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable checkpoint, starting fresh");
            return None;
        }
    };

    let envelope: CheckpointEnvelope = match bincode::deserialize(&bytes) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt checkpoint, starting fresh");
            return None;
        }
    };

    if envelope.format_version != FORMAT_VERSION {
        warn!(
            path = %path.display(),
            expected = FORMAT_VERSION,
            found = envelope.format_version,
            "incompatible checkpoint version, starting fresh"
        );
        return None;
    }

    debug!(
        path = %path.display(),
        queued = envelope.queue.len(),
        nodes = envelope.tree.size(),
        "checkpoint loaded"
    );
    Some(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn envelope() -> CheckpointEnvelope {
        CheckpointEnvelope::new(
            2,
            Tree::new(),
            VecDeque::new(),
            Duration::from_millis(5),
            Duration::from_millis(1),
            ChaCha8Rng::seed_from_u64(3),
        )
    }

    #[test]
    fn round_trip() {
        let dir = TempDir::new().unwrap();
        save(dir.path(), &envelope()).unwrap();
        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded.n_classes, 2);
        assert_eq!(loaded.elapsed, Duration::from_millis(5));
        assert_eq!(loaded.rng, ChaCha8Rng::seed_from_u64(3));
    }

    #[test]
    fn missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(load(dir.path()).is_none());
    }

    #[test]
    fn corrupt_file_is_none() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(dir.path().join(CHECKPOINT_FILE), b"not a checkpoint").unwrap();
        assert!(load(dir.path()).is_none());
    }

    #[test]
    fn incompatible_version_is_none() {
        let dir = TempDir::new().unwrap();
        let mut env = envelope();
        env.format_version = 999;
        save(dir.path(), &env).unwrap();
        assert!(load(dir.path()).is_none());
    }
}
