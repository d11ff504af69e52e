//! Dedicated worker thread that owns the blocking backend.
//!
//! Tesseract instances carry mutable native state and must not be driven
//! from multiple threads. All recognition funnels through one OS thread
//! that owns the backend exclusively; async callers queue jobs over a
//! bounded channel and await a oneshot reply, so concurrent requests line
//! up instead of racing the native library.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use jiff::SignedDuration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use veripay_core::{EngineError, Recognition};

use crate::engine::RecognitionMode;
use crate::recognizer::{BlockingRecognizer, Reading};

const TRACING_TARGET: &str = "veripay_tesseract::worker";

/// Jobs queued ahead of the worker; senders beyond this wait on capacity.
const QUEUE_DEPTH: usize = 32;

/// Page-segmentation mode of the standard single pass (sparse text).
const STANDARD_SEGMENTATION_MODE: u32 = 11;

/// Segmentation modes swept by the ladder, in order of attempt.
const LADDER: [u32; 3] = [11, 6, 7];

/// A first-rung reading above this confidence is accepted without running
/// the remaining rungs.
const EARLY_ACCEPT_CONFIDENCE: f32 = 76.0;

/// A longer reading only displaces a shorter one when its confidence
/// clears this floor.
const LONGER_READING_MIN_CONFIDENCE: f32 = 30.0;

/// Builds the backend on the worker thread.
///
/// Invoked again on a later call if a previous initialization failed, so a
/// transient fault does not wedge the engine permanently.
pub(crate) type RecognizerFactory =
    Arc<dyn Fn() -> Result<Box<dyn BlockingRecognizer>, EngineError> + Send + Sync>;

struct Job {
    path: PathBuf,
    mode: RecognitionMode,
    reply: oneshot::Sender<Result<Recognition, EngineError>>,
}

/// Cloneable handle to the worker; dropping every handle closes the job
/// channel and lets the thread dispose of its backend.
#[derive(Clone, Debug)]
pub(crate) struct WorkerHandle {
    jobs: mpsc::Sender<Job>,
}

impl WorkerHandle {
    /// Spawns the worker thread and waits for backend initialization.
    pub(crate) async fn spawn(factory: RecognizerFactory) -> Result<Self, EngineError> {
        let (jobs, inbox) = mpsc::channel(QUEUE_DEPTH);
        let (ready, readiness) = oneshot::channel();

        std::thread::Builder::new()
            .name("veripay-ocr".to_owned())
            .spawn(move || worker_loop(factory, inbox, ready))
            .map_err(|err| EngineError::Unavailable {
                reason: format!("recognition worker failed to start: {err}").into(),
            })?;

        match readiness.await {
            Ok(Ok(())) => Ok(Self { jobs }),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(EngineError::Unavailable {
                reason: "recognition worker exited during startup".into(),
            }),
        }
    }

    /// Queues one recognition job and awaits its result.
    pub(crate) async fn submit(
        &self,
        path: PathBuf,
        mode: RecognitionMode,
    ) -> Result<Recognition, EngineError> {
        let (reply, response) = oneshot::channel();
        let job = Job { path, mode, reply };

        self.jobs
            .send(job)
            .await
            .map_err(|_| EngineError::Unavailable {
                reason: "recognition worker has stopped".into(),
            })?;

        response.await.map_err(|_| EngineError::Unavailable {
            reason: "recognition worker dropped the job".into(),
        })?
    }
}

fn worker_loop(
    factory: RecognizerFactory,
    mut inbox: mpsc::Receiver<Job>,
    ready: oneshot::Sender<Result<(), EngineError>>,
) {
    let mut recognizer = match factory() {
        Ok(recognizer) => {
            // A dropped receiver means the spawner gave up waiting.
            if ready.send(Ok(())).is_err() {
                return;
            }
            recognizer
        }
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };

    debug!(target: TRACING_TARGET, "recognition worker started");
    while let Some(job) = inbox.blocking_recv() {
        let result = run_job(recognizer.as_mut(), &job.path, job.mode);
        let _ = job.reply.send(result);
    }

    // Channel closed: the backend is disposed of along with the thread.
    debug!(target: TRACING_TARGET, "recognition worker stopped");
}

fn run_job(
    recognizer: &mut dyn BlockingRecognizer,
    path: &Path,
    mode: RecognitionMode,
) -> Result<Recognition, EngineError> {
    if !path.exists() {
        return Err(EngineError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let started = Instant::now();
    let reading = match mode {
        RecognitionMode::Standard => recognizer.recognize(path, STANDARD_SEGMENTATION_MODE)?,
        RecognitionMode::Ladder => run_ladder(recognizer, path)?,
    };
    let duration = SignedDuration::try_from(started.elapsed()).unwrap_or(SignedDuration::MAX);

    Ok(Recognition::new(
        reading.text,
        Some(reading.confidence),
        duration,
    ))
}

/// Sweeps the segmentation ladder and keeps the best reading.
///
/// A higher-confidence reading always wins; a longer reading wins over a
/// shorter one when its own confidence is at least passable, which favors
/// rungs that recover full lines over rungs that only find fragments. A
/// strong first rung is accepted outright.
fn run_ladder(
    recognizer: &mut dyn BlockingRecognizer,
    path: &Path,
) -> Result<Reading, EngineError> {
    let mut best: Option<Reading> = None;
    let mut last_error: Option<EngineError> = None;

    for (rung, mode) in LADDER.into_iter().enumerate() {
        let reading = match recognizer.recognize(path, mode) {
            Ok(reading) => reading,
            Err(err) => {
                warn!(
                    target: TRACING_TARGET,
                    segmentation_mode = mode,
                    "ladder rung failed: {err}",
                );
                last_error = Some(err);
                continue;
            }
        };

        if rung == 0 && reading.confidence > EARLY_ACCEPT_CONFIDENCE {
            return Ok(reading);
        }
        best = Some(match best.take() {
            None => reading,
            Some(current) => prefer(current, reading),
        });
    }

    match best {
        Some(reading) => Ok(reading),
        None => Err(last_error
            .unwrap_or_else(|| EngineError::provider("every segmentation mode failed"))),
    }
}

fn prefer(current: Reading, candidate: Reading) -> Reading {
    let longer = candidate.text.len() > current.text.len();
    if candidate.confidence > current.confidence
        || (candidate.confidence > LONGER_READING_MIN_CONFIDENCE && longer)
    {
        candidate
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    fn reading(text: &str, confidence: f32) -> Reading {
        Reading {
            text: text.to_owned(),
            confidence,
        }
    }

    /// Backend whose per-mode responses are scripted up front.
    struct Scripted {
        responses: HashMap<u32, Result<Reading, String>>,
        calls: Arc<Mutex<Vec<u32>>>,
    }

    impl Scripted {
        fn new(responses: impl IntoIterator<Item = (u32, Result<Reading, String>)>) -> Self {
            Self {
                responses: responses.into_iter().collect(),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> Arc<Mutex<Vec<u32>>> {
            self.calls.clone()
        }
    }

    impl BlockingRecognizer for Scripted {
        fn recognize(
            &mut self,
            _path: &Path,
            segmentation_mode: u32,
        ) -> Result<Reading, EngineError> {
            self.calls.lock().unwrap().push(segmentation_mode);
            match self.responses.get(&segmentation_mode) {
                Some(Ok(reading)) => Ok(reading.clone()),
                Some(Err(message)) => Err(EngineError::provider(message.clone())),
                None => Err(EngineError::provider("unscripted segmentation mode")),
            }
        }
    }

    #[test]
    fn ladder_keeps_the_highest_confidence_reading() {
        let mut scripted = Scripted::new([
            (11, Ok(reading("alpha", 40.0))),
            (6, Ok(reading("beta", 60.0))),
            (7, Ok(reading("gamma", 10.0))),
        ]);
        let calls = scripted.calls();

        let best = run_ladder(&mut scripted, Path::new("receipt.png")).unwrap();
        assert_eq!(best.text, "beta");
        assert_eq!(*calls.lock().unwrap(), vec![11, 6, 7]);
    }

    #[test]
    fn ladder_prefers_longer_text_above_the_confidence_floor() {
        let mut scripted = Scripted::new([
            (11, Ok(reading("short", 40.0))),
            (6, Ok(reading("considerably longer line", 35.0))),
            (7, Ok(reading("x", 20.0))),
        ]);

        let best = run_ladder(&mut scripted, Path::new("receipt.png")).unwrap();
        assert_eq!(best.text, "considerably longer line");
    }

    #[test]
    fn ladder_rejects_longer_text_below_the_confidence_floor() {
        let mut scripted = Scripted::new([
            (11, Ok(reading("short", 40.0))),
            (6, Ok(reading("muchlongergarbagetext", 25.0))),
            (7, Ok(reading("", 0.0))),
        ]);

        let best = run_ladder(&mut scripted, Path::new("receipt.png")).unwrap();
        assert_eq!(best.text, "short");
    }

    #[test]
    fn strong_first_rung_short_circuits_the_sweep() {
        let mut scripted = Scripted::new([(11, Ok(reading("receipt text", 80.0)))]);
        let calls = scripted.calls();

        let best = run_ladder(&mut scripted, Path::new("receipt.png")).unwrap();
        assert_eq!(best.text, "receipt text");
        assert_eq!(*calls.lock().unwrap(), vec![11]);
    }

    #[test]
    fn first_rung_at_the_threshold_keeps_sweeping() {
        let mut scripted = Scripted::new([
            (11, Ok(reading("edge", 76.0))),
            (6, Ok(reading("b", 10.0))),
            (7, Ok(reading("c", 5.0))),
        ]);
        let calls = scripted.calls();

        let best = run_ladder(&mut scripted, Path::new("receipt.png")).unwrap();
        assert_eq!(best.text, "edge");
        assert_eq!(*calls.lock().unwrap(), vec![11, 6, 7]);
    }

    #[test]
    fn failed_rungs_are_skipped() {
        let mut scripted = Scripted::new([
            (11, Err("rung down".to_owned())),
            (6, Ok(reading("recovered", 50.0))),
            (7, Err("rung down".to_owned())),
        ]);

        let best = run_ladder(&mut scripted, Path::new("receipt.png")).unwrap();
        assert_eq!(best.text, "recovered");
    }

    #[test]
    fn all_rungs_failing_reports_an_error() {
        let mut scripted = Scripted::new([
            (11, Err("a".to_owned())),
            (6, Err("b".to_owned())),
            (7, Err("c".to_owned())),
        ]);

        let err = run_ladder(&mut scripted, Path::new("receipt.png")).unwrap_err();
        assert!(matches!(err, EngineError::Provider { .. }));
    }

    #[test]
    fn missing_file_fails_before_invoking_the_backend() {
        let mut scripted = Scripted::new([]);
        let calls = scripted.calls();

        let err = run_job(
            &mut scripted,
            Path::new("/nonexistent/receipt.png"),
            RecognitionMode::Standard,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::FileNotFound { .. }));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn standard_mode_runs_one_sparse_text_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let mut scripted = Scripted::new([(11, Ok(reading("B123", 42.0)))]);
        let calls = scripted.calls();

        let recognition = run_job(&mut scripted, &path, RecognitionMode::Standard).unwrap();
        assert_eq!(recognition.text, "B123");
        assert_eq!(recognition.confidence, Some(42.0));
        assert_eq!(*calls.lock().unwrap(), vec![11]);
    }

    /// Backend that tracks how many invocations overlap in time.
    struct Overlap {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl BlockingRecognizer for Overlap {
        fn recognize(
            &mut self,
            _path: &Path,
            _segmentation_mode: u32,
        ) -> Result<Reading, EngineError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(reading("t", 50.0))
        }
    }

    #[tokio::test]
    async fn concurrent_submissions_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        std::fs::write(&path, b"img").unwrap();

        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (factory_active, factory_peak) = (active.clone(), peak.clone());
        let factory: RecognizerFactory = Arc::new(move || {
            Ok(Box::new(Overlap {
                active: factory_active.clone(),
                peak: factory_peak.clone(),
            }) as Box<dyn BlockingRecognizer>)
        });

        let worker = WorkerHandle::spawn(factory).await.unwrap();
        let (a, b, c, d) = tokio::join!(
            worker.submit(path.clone(), RecognitionMode::Standard),
            worker.submit(path.clone(), RecognitionMode::Standard),
            worker.submit(path.clone(), RecognitionMode::Standard),
            worker.submit(path.clone(), RecognitionMode::Standard),
        );

        assert!(a.is_ok() && b.is_ok() && c.is_ok() && d.is_ok());
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn init_failure_surfaces_to_the_spawner() {
        let factory: RecognizerFactory = Arc::new(|| {
            Err(EngineError::Unavailable {
                reason: "no traineddata".into(),
            })
        });

        let err = WorkerHandle::spawn(factory).await.unwrap_err();
        assert!(matches!(err, EngineError::Unavailable { .. }));
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    struct Flagged {
        _flag: DropFlag,
    }

    impl BlockingRecognizer for Flagged {
        fn recognize(
            &mut self,
            _path: &Path,
            _segmentation_mode: u32,
        ) -> Result<Reading, EngineError> {
            Ok(reading("t", 50.0))
        }
    }

    #[tokio::test]
    async fn dropping_the_handle_disposes_of_the_backend() {
        let disposed = Arc::new(AtomicBool::new(false));
        let flag = disposed.clone();
        let factory: RecognizerFactory = Arc::new(move || {
            Ok(Box::new(Flagged {
                _flag: DropFlag(flag.clone()),
            }) as Box<dyn BlockingRecognizer>)
        });

        let worker = WorkerHandle::spawn(factory).await.unwrap();
        drop(worker);

        for _ in 0..100 {
            if disposed.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("worker thread did not dispose of its backend");
    }
}
