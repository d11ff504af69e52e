//! Scratch-file tracking for one recognition run.

use std::path::{Path, PathBuf};

use veripay_core::fs::{remove_file_quiet, remove_file_quiet_sync};

/// Collects the artifact and every derivative a run creates, and removes
/// them all when the run ends.
///
/// [`cleanup`](Self::cleanup) is the normal exit. Dropping a guard that was
/// never cleaned removes the remaining files synchronously, so an early
/// return or a panic cannot leak scratch onto disk.
#[derive(Debug)]
pub(crate) struct ScratchGuard {
    paths: Vec<PathBuf>,
}

impl ScratchGuard {
    /// Starts tracking with the reassembled artifact itself.
    pub(crate) fn new(artifact: &Path) -> Self {
        Self {
            paths: vec![artifact.to_path_buf()],
        }
    }

    /// Registers a derivative for removal. Already-known paths are kept
    /// once.
    pub(crate) fn register(&mut self, path: &Path) {
        if !self.paths.iter().any(|known| known == path) {
            self.paths.push(path.to_path_buf());
        }
    }

    /// Removes every tracked file.
    pub(crate) async fn cleanup(mut self) {
        for path in std::mem::take(&mut self.paths) {
            remove_file_quiet(&path).await;
        }
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            remove_file_quiet_sync(path);
        }
    }
}
