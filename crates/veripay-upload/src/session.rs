use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// In-memory state of one chunked upload.
///
/// Guarded by a per-session mutex in the manager, so methods here take
/// `&mut self` without further synchronization.
#[derive(Debug)]
pub(crate) struct UploadSession {
    file_name: String,
    dir: PathBuf,
    received: Vec<bool>,
    last_activity: Instant,
    prepared: bool,
    finished: bool,
}

impl UploadSession {
    pub(crate) fn new(file_name: impl Into<String>, total: u32, dir: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            dir: dir.into(),
            received: vec![false; total as usize],
            last_activity: Instant::now(),
            prepared: false,
            finished: false,
        }
    }

    pub(crate) fn file_name(&self) -> &str {
        &self.file_name
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn total(&self) -> u32 {
        self.received.len() as u32
    }

    /// Marks a chunk as stored.
    pub(crate) fn mark_received(&mut self, index: u32) {
        self.received[index as usize] = true;
    }

    pub(crate) fn is_received(&self, index: u32) -> bool {
        self.received[index as usize]
    }

    pub(crate) fn received_count(&self) -> u32 {
        self.received.iter().filter(|slot| **slot).count() as u32
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.received.iter().all(|slot| *slot)
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub(crate) fn idle(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Whether scratch left over from an earlier run of this sid has
    /// already been cleared.
    pub(crate) fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub(crate) fn mark_prepared(&mut self) {
        self.prepared = true;
    }

    /// Marks the session retired. Submissions racing with completion or
    /// reaping see the flag and start a fresh session instead of writing
    /// into a directory being torn down.
    pub(crate) fn finish(&mut self) {
        self.finished = true;
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_marks_are_counted_once() {
        let mut session = UploadSession::new("receipt.jpg", 3, "/tmp/s");
        session.mark_received(1);
        assert!(session.is_received(1));
        session.mark_received(1);
        assert_eq!(session.received_count(), 1);
    }

    #[test]
    fn complete_only_when_every_slot_is_filled() {
        let mut session = UploadSession::new("receipt.jpg", 2, "/tmp/s");
        session.mark_received(1);
        assert!(!session.is_complete());
        session.mark_received(0);
        assert!(session.is_complete());
    }

    #[test]
    fn touch_resets_idleness() {
        let mut session = UploadSession::new("receipt.jpg", 1, "/tmp/s");
        session.touch();
        assert!(session.idle() < Duration::from_secs(1));
    }
}
