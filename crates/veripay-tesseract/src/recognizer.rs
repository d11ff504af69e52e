//! Blocking recognition backends.

use std::path::Path;

use veripay_core::EngineError;

/// One raw pass of a blocking backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Recognized text, unprocessed.
    pub text: String,
    /// Mean text confidence, 0 to 100.
    pub confidence: f32,
}

/// A synchronous recognition backend driven from the worker thread.
///
/// Implementations need not be thread-safe. The worker owns its backend
/// exclusively and invokes it one job at a time.
pub trait BlockingRecognizer: Send {
    /// Runs one pass over the image at `path` with the given
    /// page-segmentation mode.
    fn recognize(&mut self, path: &Path, segmentation_mode: u32) -> Result<Reading, EngineError>;
}

#[cfg(feature = "tesseract")]
mod real {
    use std::path::Path;

    use leptess::{LepTess, Variable};
    use tracing::warn;
    use veripay_core::EngineError;

    use super::{BlockingRecognizer, Reading};
    use crate::TesseractConfig;

    const TRACING_TARGET: &str = "veripay_tesseract::recognizer";

    /// Recognizer backed by the system Tesseract installation.
    pub struct TesseractRecognizer {
        engine: LepTess,
    }

    impl TesseractRecognizer {
        /// Initializes Tesseract with the configured languages, retrying with
        /// the fallback set when the preferred traineddata is missing.
        pub fn new(config: &TesseractConfig) -> Result<Self, EngineError> {
            let datapath = config.datapath.as_deref().and_then(Path::to_str);
            let mut engine = match LepTess::new(datapath, &config.languages) {
                Ok(engine) => engine,
                Err(err) => {
                    warn!(
                        target: TRACING_TARGET,
                        languages = %config.languages,
                        fallback = %config.fallback_languages,
                        "tesseract init failed, retrying with fallback languages: {err}",
                    );
                    LepTess::new(datapath, &config.fallback_languages).map_err(|err| {
                        EngineError::Unavailable {
                            reason: format!("tesseract failed to initialize: {err}").into(),
                        }
                    })?
                }
            };

            // Receipts are sparse runs of short lines. Keep the spacing the
            // layout analysis finds, and pin a DPI since photos rarely carry
            // one.
            for (variable, value) in [
                (Variable::PreserveInterwordSpaces, "1"),
                (Variable::UserDefinedDpi, "300"),
                (Variable::TesseditEnableDictCorrection, "1"),
            ] {
                engine.set_variable(variable, value).map_err(|err| {
                    EngineError::provider_with_source("tesseract rejected a parameter", err)
                })?;
            }

            Ok(Self { engine })
        }
    }

    impl BlockingRecognizer for TesseractRecognizer {
        fn recognize(
            &mut self,
            path: &Path,
            segmentation_mode: u32,
        ) -> Result<Reading, EngineError> {
            self.engine
                .set_variable(Variable::TesseditPagesegMode, &segmentation_mode.to_string())
                .map_err(|err| {
                    EngineError::provider_with_source("tesseract rejected the segmentation mode", err)
                })?;
            self.engine.set_image(path).map_err(|err| {
                EngineError::provider_with_source("tesseract could not load the image", err)
            })?;

            let text = self.engine.get_utf8_text().map_err(|err| {
                EngineError::provider_with_source("tesseract produced invalid text", err)
            })?;
            let confidence = self.engine.mean_text_conf() as f32;

            Ok(Reading { text, confidence })
        }
    }
}

// The stub keeps this crate compiling on machines without the native
// tesseract and leptonica libraries installed. Recognition reports the
// engine as unavailable instead of failing the build.
#[cfg(not(feature = "tesseract"))]
mod stub {
    use std::path::Path;

    use veripay_core::EngineError;

    use super::{BlockingRecognizer, Reading};
    use crate::TesseractConfig;

    pub struct TesseractRecognizer;

    impl TesseractRecognizer {
        pub fn new(_config: &TesseractConfig) -> Result<Self, EngineError> {
            Err(unavailable())
        }
    }

    impl BlockingRecognizer for TesseractRecognizer {
        fn recognize(
            &mut self,
            _path: &Path,
            _segmentation_mode: u32,
        ) -> Result<Reading, EngineError> {
            Err(unavailable())
        }
    }

    fn unavailable() -> EngineError {
        EngineError::Unavailable {
            reason: "built without the `tesseract` feature".into(),
        }
    }
}

#[cfg(feature = "tesseract")]
pub(crate) use real::TesseractRecognizer;
#[cfg(not(feature = "tesseract"))]
pub(crate) use stub::TesseractRecognizer;
