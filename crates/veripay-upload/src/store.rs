use std::path::{Path, PathBuf};

use jiff::Timestamp;
use tokio::io::AsyncWriteExt;
use veripay_core::fs::{artifact_file_name, ensure_dir, remove_dir_quiet, remove_file_quiet};
use veripay_core::{Error, Result};

const TRACING_TARGET: &str = "veripay_upload::store";

/// Filesystem layout for chunk scratch and reassembled artifacts.
///
/// Each session owns a subdirectory of the scratch root containing one
/// `{index}.tmp` file per received chunk. Completed uploads land in the
/// artifact directory under a timestamped name.
#[derive(Debug, Clone)]
pub(crate) struct ChunkStore {
    scratch_dir: PathBuf,
    artifact_dir: PathBuf,
}

impl ChunkStore {
    pub(crate) fn new(scratch_dir: impl Into<PathBuf>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            artifact_dir: artifact_dir.into(),
        }
    }

    /// Scratch directory for the session with the given directory name.
    pub(crate) fn session_dir(&self, dir_name: &str) -> PathBuf {
        self.scratch_dir.join(dir_name)
    }

    /// Persists one chunk into the session directory.
    pub(crate) async fn write_chunk(&self, dir: &Path, index: u32, data: &[u8]) -> Result<()> {
        ensure_dir(dir).await?;
        let path = dir.join(chunk_file_name(index));
        tokio::fs::write(&path, data).await.map_err(|err| {
            Error::resource()
                .with_message(format!("failed to store chunk {}", path.display()))
                .with_source(err)
        })
    }

    /// Concatenates the session's chunks in index order into a new artifact.
    ///
    /// A chunk file missing from disk despite being marked received means
    /// the scratch state no longer matches the session and the upload
    /// cannot be trusted; the partial artifact is removed and an integrity
    /// error returned.
    pub(crate) async fn assemble(
        &self,
        dir: &Path,
        total: u32,
        file_name: &str,
    ) -> Result<PathBuf> {
        ensure_dir(&self.artifact_dir).await?;
        let artifact = self
            .artifact_dir
            .join(artifact_file_name(file_name, Timestamp::now()));

        let result = self.concatenate(dir, total, &artifact).await;
        if result.is_err() {
            remove_file_quiet(&artifact).await;
        }
        result.map(|()| artifact)
    }

    async fn concatenate(&self, dir: &Path, total: u32, artifact: &Path) -> Result<()> {
        let mut out = tokio::fs::File::create(artifact).await.map_err(|err| {
            Error::resource()
                .with_message(format!("failed to create artifact {}", artifact.display()))
                .with_source(err)
        })?;

        for index in 0..total {
            let chunk_path = dir.join(chunk_file_name(index));
            let data = match tokio::fs::read(&chunk_path).await {
                Ok(data) => data,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    return Err(Error::integrity()
                        .with_message(format!("chunk {index} vanished before reassembly")));
                }
                Err(err) => {
                    return Err(Error::resource()
                        .with_message(format!("failed to read chunk {}", chunk_path.display()))
                        .with_source(err));
                }
            };
            out.write_all(&data).await.map_err(|err| {
                Error::resource()
                    .with_message(format!("failed to write artifact {}", artifact.display()))
                    .with_source(err)
            })?;
        }

        out.flush().await.map_err(|err| {
            Error::resource()
                .with_message(format!("failed to flush artifact {}", artifact.display()))
                .with_source(err)
        })
    }

    /// Removes a session's scratch directory and everything in it.
    pub(crate) async fn destroy_session(&self, dir: &Path) {
        remove_dir_quiet(dir).await;
    }

    /// Total size in bytes of the files in a session directory. Best
    /// effort: unreadable entries count as zero.
    pub(crate) async fn dir_size(&self, dir: &Path) -> u64 {
        let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
            return 0;
        };
        let mut size = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Ok(metadata) = entry.metadata().await {
                size += metadata.len();
            }
        }
        size
    }

    /// Removes every entry under the scratch root, returning how many were
    /// deleted. Used at startup when no session can still be live.
    pub(crate) async fn sweep_scratch(&self) -> Result<u32> {
        let mut entries = match tokio::fs::read_dir(&self.scratch_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(scratch_listing_error(&self.scratch_dir, err)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| scratch_listing_error(&self.scratch_dir, err))?
        {
            let path = entry.path();
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                remove_dir_quiet(&path).await;
            } else {
                remove_file_quiet(&path).await;
            }
            tracing::debug!(
                target: TRACING_TARGET,
                path = %path.display(),
                "swept orphaned scratch entry",
            );
            removed += 1;
        }
        Ok(removed)
    }

    /// Names of scratch entries on disk, used for status reporting.
    pub(crate) async fn scratch_entries(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.scratch_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(scratch_listing_error(&self.scratch_dir, err)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| scratch_listing_error(&self.scratch_dir, err))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

fn chunk_file_name(index: u32) -> String {
    format!("{index}.tmp")
}

fn scratch_listing_error(dir: &Path, err: std::io::Error) -> Error {
    Error::resource()
        .with_message(format!("failed to list scratch {}", dir.display()))
        .with_source(err)
}

#[cfg(test)]
mod tests {
    use veripay_core::ErrorKind;

    use super::*;

    fn store(root: &Path) -> ChunkStore {
        ChunkStore::new(root.join("tmp"), root.join("out"))
    }

    #[tokio::test]
    async fn assembles_chunks_in_index_order() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        let dir = store.session_dir("s1");

        store.write_chunk(&dir, 1, b"world").await.unwrap();
        store.write_chunk(&dir, 0, b"hello ").await.unwrap();

        let artifact = store.assemble(&dir, 2, "greeting.txt").await.unwrap();
        let data = tokio::fs::read(&artifact).await.unwrap();
        assert_eq!(data, b"hello world");

        let name = artifact.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("greeting_"));
        assert!(name.ends_with(".txt"));
    }

    #[tokio::test]
    async fn missing_chunk_is_an_integrity_error_and_leaves_no_artifact() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        let dir = store.session_dir("s1");

        store.write_chunk(&dir, 0, b"a").await.unwrap();
        let err = store.assemble(&dir, 2, "partial.bin").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);

        let mut out = tokio::fs::read_dir(root.path().join("out")).await.unwrap();
        assert!(out.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sweep_clears_every_scratch_entry() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());

        store
            .write_chunk(&store.session_dir("a"), 0, b"x")
            .await
            .unwrap();
        store
            .write_chunk(&store.session_dir("b"), 0, b"y")
            .await
            .unwrap();

        assert_eq!(store.sweep_scratch().await.unwrap(), 2);
        assert!(store.scratch_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sweep_of_missing_scratch_root_is_a_no_op() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        assert_eq!(store.sweep_scratch().await.unwrap(), 0);
    }
}
