//! Async engine facade over the worker thread.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::OnceCell;
use veripay_core::{EngineError, EngineKind, OcrEngine, Recognition};

use crate::TesseractConfig;
use crate::recognizer::{BlockingRecognizer, TesseractRecognizer};
use crate::worker::{RecognizerFactory, WorkerHandle};

/// How a single recognition request drives the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// One sparse-text pass. Fast enough for the request path.
    Standard,
    /// Sweeps several page-segmentation modes and keeps the best reading.
    Ladder,
}

/// The local recognition engine.
///
/// Holds no backend until the first request; the worker thread and its
/// Tesseract instance are created lazily and reused for the life of the
/// engine. Dropping the engine closes the job channel, which lets the
/// worker dispose of the backend.
pub struct LocalEngine {
    config: TesseractConfig,
    factory: RecognizerFactory,
    worker: OnceCell<WorkerHandle>,
}

impl LocalEngine {
    /// Creates an engine backed by the system Tesseract installation.
    pub fn new(config: TesseractConfig) -> Self {
        let backend_config = config.clone();
        Self::with_recognizer(config, move || {
            Ok(Box::new(TesseractRecognizer::new(&backend_config)?) as Box<dyn BlockingRecognizer>)
        })
    }

    /// Creates an engine around an injected backend constructor.
    ///
    /// The constructor runs on the worker thread, so backends never cross
    /// threads after creation.
    pub fn with_recognizer<F>(config: TesseractConfig, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn BlockingRecognizer>, EngineError> + Send + Sync + 'static,
    {
        Self {
            config,
            factory: Arc::new(factory),
            worker: OnceCell::new(),
        }
    }

    /// Runs recognition with an explicit mode, overriding the configured
    /// default.
    pub async fn recognize_with_mode(
        &self,
        path: &Path,
        mode: RecognitionMode,
    ) -> Result<Recognition, EngineError> {
        let worker = self.worker().await?;
        worker.submit(path.to_path_buf(), mode).await
    }

    fn default_mode(&self) -> RecognitionMode {
        if self.config.thorough {
            RecognitionMode::Ladder
        } else {
            RecognitionMode::Standard
        }
    }

    /// Returns the worker, spawning it on first use. A failed spawn is not
    /// cached, so the next call tries again.
    async fn worker(&self) -> Result<&WorkerHandle, EngineError> {
        self.worker
            .get_or_try_init(|| WorkerHandle::spawn(self.factory.clone()))
            .await
    }
}

#[async_trait::async_trait]
impl OcrEngine for LocalEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Local
    }

    async fn recognize(&self, path: &Path) -> Result<Recognition, EngineError> {
        self.recognize_with_mode(path, self.default_mode()).await
    }

    async fn health_check(&self) -> Result<(), EngineError> {
        self.worker().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::recognizer::Reading;

    /// Backend that records the segmentation modes it was asked to run.
    struct Recorder {
        calls: Arc<Mutex<Vec<u32>>>,
    }

    impl BlockingRecognizer for Recorder {
        fn recognize(
            &mut self,
            _path: &Path,
            segmentation_mode: u32,
        ) -> Result<Reading, EngineError> {
            self.calls.lock().unwrap().push(segmentation_mode);
            Ok(Reading {
                text: format!("mode {segmentation_mode}"),
                confidence: 10.0,
            })
        }
    }

    fn recording_engine(config: TesseractConfig) -> (LocalEngine, Arc<Mutex<Vec<u32>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let factory_calls = calls.clone();
        let engine = LocalEngine::with_recognizer(config, move || {
            Ok(Box::new(Recorder {
                calls: factory_calls.clone(),
            }) as Box<dyn BlockingRecognizer>)
        });
        (engine, calls)
    }

    fn existing_image(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("receipt.png");
        std::fs::write(&path, b"img").unwrap();
        path
    }

    #[test]
    fn engine_reports_local_kind() {
        let (engine, _) = recording_engine(TesseractConfig::default());
        assert_eq!(engine.kind(), EngineKind::Local);
    }

    #[tokio::test]
    async fn standard_config_runs_a_single_sparse_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = existing_image(&dir);
        let (engine, calls) = recording_engine(TesseractConfig::default());

        let recognition = engine.recognize(&path).await.unwrap();
        assert_eq!(recognition.text, "mode 11");
        assert_eq!(*calls.lock().unwrap(), vec![11]);
    }

    #[tokio::test]
    async fn thorough_config_sweeps_the_ladder() {
        let dir = tempfile::tempdir().unwrap();
        let path = existing_image(&dir);
        let config = TesseractConfig {
            thorough: true,
            ..TesseractConfig::default()
        };
        let (engine, calls) = recording_engine(config);

        engine.recognize(&path).await.unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![11, 6, 7]);
    }

    #[tokio::test]
    async fn backend_is_created_lazily_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = existing_image(&dir);

        let built = Arc::new(AtomicUsize::new(0));
        let factory_built = built.clone();
        let engine = LocalEngine::with_recognizer(TesseractConfig::default(), move || {
            factory_built.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Recorder {
                calls: Arc::new(Mutex::new(Vec::new())),
            }) as Box<dyn BlockingRecognizer>)
        });
        assert_eq!(built.load(Ordering::SeqCst), 0);

        engine.recognize(&path).await.unwrap();
        engine.recognize(&path).await.unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_initialization_is_retried_on_the_next_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = existing_image(&dir);

        let attempts = Arc::new(AtomicUsize::new(0));
        let factory_attempts = attempts.clone();
        let engine = LocalEngine::with_recognizer(TesseractConfig::default(), move || {
            factory_attempts.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::Unavailable {
                reason: "no traineddata".into(),
            })
        });

        let first = engine.recognize(&path).await.unwrap_err();
        let second = engine.recognize(&path).await.unwrap_err();
        assert!(matches!(first, EngineError::Unavailable { .. }));
        assert!(matches!(second, EngineError::Unavailable { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn health_check_initializes_the_worker() {
        let built = Arc::new(AtomicUsize::new(0));
        let factory_built = built.clone();
        let engine = LocalEngine::with_recognizer(TesseractConfig::default(), move || {
            factory_built.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Recorder {
                calls: Arc::new(Mutex::new(Vec::new())),
            }) as Box<dyn BlockingRecognizer>)
        });

        engine.health_check().await.unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }
}
