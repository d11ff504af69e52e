use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::Mutex;
use veripay_core::fs::sanitize_file_name;
use veripay_core::{Error, Result};

use crate::config::UploadConfig;
use crate::session::UploadSession;
use crate::store::ChunkStore;

const TRACING_TARGET: &str = "veripay_upload::manager";

/// One chunk of a client upload, as received by the transport layer.
#[derive(Debug, Clone)]
pub struct IncomingChunk {
    /// Submission id the client groups chunks under.
    pub sid: String,
    /// Client-supplied name of the file being uploaded.
    pub file_name: String,
    /// Zero-based position of this chunk.
    pub index: u32,
    /// Declared number of chunks in the upload.
    pub total: u32,
    /// Chunk payload.
    pub data: Bytes,
}

/// Result of accepting one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// More chunks are still outstanding.
    Progress {
        /// Distinct chunks stored so far.
        received: u32,
        /// Declared chunk count.
        total: u32,
    },
    /// Every chunk arrived and the upload was reassembled.
    Complete {
        /// Path of the reassembled file.
        artifact: PathBuf,
    },
}

/// Point-in-time view of one live session, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub sid: String,
    pub file_name: String,
    pub received: u32,
    pub total: u32,
    pub idle_secs: u64,
    /// Bytes of chunk scratch the session currently occupies.
    pub scratch_bytes: u64,
}

/// Everything currently occupying upload scratch.
#[derive(Debug, Clone, Serialize)]
pub struct ScratchStatus {
    /// Sessions still collecting chunks.
    pub sessions: Vec<SessionSnapshot>,
    /// Scratch entries no live session accounts for.
    pub orphaned: Vec<String>,
}

/// Tracks chunked uploads from first chunk to reassembled artifact.
///
/// The session map is guarded by one mutex held only for lookups and
/// removals; each session carries its own mutex held across chunk I/O, so
/// concurrent uploads serialize per submission id without blocking each
/// other.
pub struct UploadManager {
    config: UploadConfig,
    store: ChunkStore,
    sessions: Mutex<HashMap<String, Arc<Mutex<UploadSession>>>>,
}

impl UploadManager {
    pub fn new(config: UploadConfig) -> Self {
        let store = ChunkStore::new(&config.scratch_dir, &config.artifact_dir);
        Self {
            config,
            store,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Accepts one chunk, reassembling the upload when it was the last.
    ///
    /// Resubmitting an already-stored chunk is a no-op progress report. A
    /// chunk declaring a different total than the session it addresses
    /// discards that session and starts over, keeping only the new chunk.
    pub async fn submit(&self, chunk: IncomingChunk) -> Result<ChunkOutcome> {
        let IncomingChunk {
            sid,
            file_name,
            index,
            total,
            data,
        } = chunk;

        if data.is_empty() {
            return Err(Error::invalid_input().with_message("chunk payload is empty"));
        }
        if total == 0 {
            return Err(Error::invalid_input().with_message("chunk total must be at least 1"));
        }
        if total > self.config.max_chunks {
            return Err(Error::invalid_input().with_message(format!(
                "chunk total {total} exceeds the limit of {}",
                self.config.max_chunks
            )));
        }
        if index >= total {
            return Err(Error::invalid_input().with_message(format!(
                "chunk index {index} is out of range for total {total}"
            )));
        }
        let dir_name = sanitize_file_name(&sid)
            .ok_or_else(|| Error::invalid_input().with_message("submission id is not usable"))?;
        let file_name = sanitize_file_name(&file_name)
            .ok_or_else(|| Error::invalid_input().with_message("upload file name is not usable"))?;

        loop {
            let session = self.entry(&sid, &file_name, total, &dir_name).await;
            let mut state = session.lock().await;

            if state.is_finished() {
                // Raced a completion or a reap; drop the stale entry and
                // register a fresh session for this chunk.
                drop(state);
                self.remove_if_current(&sid, &session).await;
                continue;
            }

            if !state.is_prepared() {
                // Scratch for this sid may survive from a crashed run.
                self.store.destroy_session(state.dir()).await;
                state.mark_prepared();
            }

            if state.total() != total {
                tracing::info!(
                    target: TRACING_TARGET,
                    sid = %sid,
                    old_total = state.total(),
                    new_total = total,
                    "chunk total changed, restarting session",
                );
                // Destroy while still holding the session lock so a rival
                // submission cannot write into the directory first.
                self.store.destroy_session(state.dir()).await;
                state.finish();
                drop(state);
                self.remove_if_current(&sid, &session).await;
                continue;
            }

            if state.is_received(index) {
                state.touch();
                tracing::debug!(
                    target: TRACING_TARGET,
                    sid = %sid,
                    index,
                    "duplicate chunk ignored",
                );
                return Ok(ChunkOutcome::Progress {
                    received: state.received_count(),
                    total,
                });
            }

            let dir = state.dir().to_path_buf();
            if let Err(err) = self.store.write_chunk(&dir, index, &data).await {
                // A session that lost a chunk to disk can never complete.
                self.store.destroy_session(&dir).await;
                state.finish();
                drop(state);
                self.remove_if_current(&sid, &session).await;
                return Err(err);
            }

            state.mark_received(index);
            state.touch();

            if !state.is_complete() {
                return Ok(ChunkOutcome::Progress {
                    received: state.received_count(),
                    total,
                });
            }

            let assembled = self.store.assemble(&dir, total, state.file_name()).await;
            self.store.destroy_session(&dir).await;
            state.finish();
            drop(state);
            self.remove_if_current(&sid, &session).await;

            let artifact = assembled?;
            tracing::info!(
                target: TRACING_TARGET,
                sid = %sid,
                artifact = %artifact.display(),
                chunks = total,
                "upload reassembled",
            );
            return Ok(ChunkOutcome::Complete { artifact });
        }
    }

    /// Removes sessions idle longer than `ttl`, returning how many fell.
    pub async fn remove_expired(&self, ttl: Duration) -> u32 {
        let snapshot: Vec<(String, Arc<Mutex<UploadSession>>)> = {
            let sessions = self.sessions.lock().await;
            sessions
                .iter()
                .map(|(sid, session)| (sid.clone(), session.clone()))
                .collect()
        };

        let mut removed = 0;
        for (sid, session) in snapshot {
            {
                let mut state = session.lock().await;
                if state.is_finished() || state.idle() < ttl {
                    continue;
                }
                tracing::info!(
                    target: TRACING_TARGET,
                    sid = %sid,
                    idle_secs = state.idle().as_secs(),
                    received = state.received_count(),
                    total = state.total(),
                    "reaping idle session",
                );
                self.store.destroy_session(state.dir()).await;
                state.finish();
            }
            self.remove_if_current(&sid, &session).await;
            removed += 1;
        }
        removed
    }

    /// Clears scratch left behind by a previous process.
    ///
    /// Must run before any chunk is accepted; live sessions are not
    /// consulted.
    pub async fn sweep_orphaned(&self) -> Result<u32> {
        let removed = self.store.sweep_scratch().await?;
        if removed > 0 {
            tracing::info!(
                target: TRACING_TARGET,
                removed,
                "cleared leftover upload scratch",
            );
        }
        Ok(removed)
    }

    /// Reports live sessions and any scratch entries nothing accounts for.
    pub async fn scratch_status(&self) -> Result<ScratchStatus> {
        let snapshot: Vec<(String, Arc<Mutex<UploadSession>>)> = {
            let sessions = self.sessions.lock().await;
            sessions
                .iter()
                .map(|(sid, session)| (sid.clone(), session.clone()))
                .collect()
        };

        let mut live = Vec::new();
        let mut live_dirs = HashSet::new();
        for (sid, session) in snapshot {
            let (snapshot, dir) = {
                let state = session.lock().await;
                if state.is_finished() {
                    continue;
                }
                let snapshot = SessionSnapshot {
                    sid,
                    file_name: state.file_name().to_owned(),
                    received: state.received_count(),
                    total: state.total(),
                    idle_secs: state.idle().as_secs(),
                    scratch_bytes: 0,
                };
                (snapshot, state.dir().to_path_buf())
            };
            if let Some(name) = dir.file_name().and_then(|n| n.to_str()) {
                live_dirs.insert(name.to_owned());
            }
            live.push(SessionSnapshot {
                scratch_bytes: self.store.dir_size(&dir).await,
                ..snapshot
            });
        }
        live.sort_by(|a, b| a.sid.cmp(&b.sid));

        let orphaned = self
            .store
            .scratch_entries()
            .await?
            .into_iter()
            .filter(|name| !live_dirs.contains(name))
            .collect();

        Ok(ScratchStatus {
            sessions: live,
            orphaned,
        })
    }

    async fn entry(
        &self,
        sid: &str,
        file_name: &str,
        total: u32,
        dir_name: &str,
    ) -> Arc<Mutex<UploadSession>> {
        let mut sessions = self.sessions.lock().await;
        match sessions.entry(sid.to_owned()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let session = Arc::new(Mutex::new(UploadSession::new(
                    file_name,
                    total,
                    self.store.session_dir(dir_name),
                )));
                tracing::debug!(
                    target: TRACING_TARGET,
                    sid = %sid,
                    total,
                    "session opened",
                );
                entry.insert(session.clone());
                session
            }
        }
    }

    /// Drops the map entry for `sid` only if it still holds this session.
    /// A concurrent submission may have already replaced it with a fresh
    /// one that must not be evicted.
    async fn remove_if_current(&self, sid: &str, session: &Arc<Mutex<UploadSession>>) {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(sid)
            .is_some_and(|current| Arc::ptr_eq(current, session))
        {
            sessions.remove(sid);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use veripay_core::ErrorKind;

    use super::*;

    fn test_manager(root: &Path) -> UploadManager {
        UploadManager::new(UploadConfig {
            scratch_dir: root.join("tmp"),
            artifact_dir: root.join("out"),
            ..UploadConfig::default()
        })
    }

    fn chunk(sid: &str, index: u32, total: u32, data: &[u8]) -> IncomingChunk {
        IncomingChunk {
            sid: sid.to_owned(),
            file_name: "receipt.jpg".to_owned(),
            index,
            total,
            data: Bytes::copy_from_slice(data),
        }
    }

    #[tokio::test]
    async fn single_chunk_upload_completes_immediately() {
        let root = tempfile::tempdir().unwrap();
        let manager = test_manager(root.path());

        let outcome = manager.submit(chunk("B100", 0, 1, b"photo")).await.unwrap();
        let ChunkOutcome::Complete { artifact } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(tokio::fs::read(&artifact).await.unwrap(), b"photo");

        let status = manager.scratch_status().await.unwrap();
        assert!(status.sessions.is_empty());
        assert!(status.orphaned.is_empty());
    }

    #[tokio::test]
    async fn out_of_order_chunks_reassemble_in_index_order() {
        let root = tempfile::tempdir().unwrap();
        let manager = test_manager(root.path());

        let first = manager.submit(chunk("B100", 2, 3, b"c")).await.unwrap();
        assert_eq!(
            first,
            ChunkOutcome::Progress {
                received: 1,
                total: 3
            }
        );
        let second = manager.submit(chunk("B100", 0, 3, b"a")).await.unwrap();
        assert_eq!(
            second,
            ChunkOutcome::Progress {
                received: 2,
                total: 3
            }
        );

        let third = manager.submit(chunk("B100", 1, 3, b"b")).await.unwrap();
        let ChunkOutcome::Complete { artifact } = third else {
            panic!("expected completion, got {third:?}");
        };
        assert_eq!(tokio::fs::read(&artifact).await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn duplicate_chunk_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let manager = test_manager(root.path());

        manager.submit(chunk("B100", 0, 2, b"a")).await.unwrap();
        let repeat = manager.submit(chunk("B100", 0, 2, b"a")).await.unwrap();
        assert_eq!(
            repeat,
            ChunkOutcome::Progress {
                received: 1,
                total: 2
            }
        );

        let done = manager.submit(chunk("B100", 1, 2, b"b")).await.unwrap();
        assert!(matches!(done, ChunkOutcome::Complete { .. }));
    }

    #[tokio::test]
    async fn changed_total_restarts_the_session() {
        let root = tempfile::tempdir().unwrap();
        let manager = test_manager(root.path());

        manager.submit(chunk("B100", 0, 3, b"old")).await.unwrap();

        // Same sid, different declared total: the old chunks are discarded.
        let restarted = manager.submit(chunk("B100", 0, 2, b"x")).await.unwrap();
        assert_eq!(
            restarted,
            ChunkOutcome::Progress {
                received: 1,
                total: 2
            }
        );

        let done = manager.submit(chunk("B100", 1, 2, b"y")).await.unwrap();
        let ChunkOutcome::Complete { artifact } = done else {
            panic!("expected completion, got {done:?}");
        };
        assert_eq!(tokio::fs::read(&artifact).await.unwrap(), b"xy");
    }

    #[tokio::test]
    async fn invalid_chunk_coordinates_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let manager = test_manager(root.path());

        let err = manager.submit(chunk("B100", 2, 2, b"x")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = manager.submit(chunk("B100", 0, 0, b"x")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = manager
            .submit(chunk("B100", 0, manager.config().max_chunks + 1, b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = manager.submit(chunk("B100", 0, 1, b"")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn unusable_session_id_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let manager = test_manager(root.path());

        let err = manager.submit(chunk("..", 0, 1, b"x")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn vanished_chunk_fails_reassembly_and_destroys_the_session() {
        let root = tempfile::tempdir().unwrap();
        let manager = test_manager(root.path());

        manager.submit(chunk("B100", 0, 2, b"a")).await.unwrap();

        // Pull the stored chunk out from under the session.
        tokio::fs::remove_file(root.path().join("tmp/B100/0.tmp"))
            .await
            .unwrap();

        let err = manager.submit(chunk("B100", 1, 2, b"b")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);

        // The broken session is gone; the same sid starts clean.
        let status = manager.scratch_status().await.unwrap();
        assert!(status.sessions.is_empty());
        let fresh = manager.submit(chunk("B100", 0, 2, b"a")).await.unwrap();
        assert_eq!(
            fresh,
            ChunkOutcome::Progress {
                received: 1,
                total: 2
            }
        );
    }

    #[tokio::test]
    async fn idle_sessions_are_reaped() {
        let root = tempfile::tempdir().unwrap();
        let manager = test_manager(root.path());

        manager.submit(chunk("B100", 0, 2, b"a")).await.unwrap();

        assert_eq!(manager.remove_expired(Duration::from_secs(3600)).await, 0);
        assert_eq!(manager.remove_expired(Duration::ZERO).await, 1);
        assert_eq!(manager.remove_expired(Duration::ZERO).await, 0);

        let status = manager.scratch_status().await.unwrap();
        assert!(status.sessions.is_empty());
        assert!(status.orphaned.is_empty());
    }

    #[tokio::test]
    async fn startup_sweep_clears_leftover_scratch() {
        let root = tempfile::tempdir().unwrap();
        let manager = test_manager(root.path());

        let stray = root.path().join("tmp/stray");
        tokio::fs::create_dir_all(&stray).await.unwrap();
        tokio::fs::write(stray.join("0.tmp"), b"x").await.unwrap();

        assert_eq!(manager.sweep_orphaned().await.unwrap(), 1);
        let status = manager.scratch_status().await.unwrap();
        assert!(status.orphaned.is_empty());
    }

    #[tokio::test]
    async fn status_reports_live_sessions_and_orphans() {
        let root = tempfile::tempdir().unwrap();
        let manager = test_manager(root.path());

        manager.submit(chunk("B100", 0, 2, b"a")).await.unwrap();
        tokio::fs::create_dir_all(root.path().join("tmp/stray"))
            .await
            .unwrap();

        let status = manager.scratch_status().await.unwrap();
        assert_eq!(status.sessions.len(), 1);
        assert_eq!(status.sessions[0].sid, "B100");
        assert_eq!(status.sessions[0].received, 1);
        assert_eq!(status.sessions[0].total, 2);
        assert_eq!(status.sessions[0].scratch_bytes, 1);
        assert_eq!(status.orphaned, vec!["stray".to_owned()]);
    }
}
