use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the local Tesseract recognition engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(clap::Args))]
pub struct TesseractConfig {
    /// Traineddata languages requested at engine initialization.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "tesseract-languages",
            env = "VERIPAY_TESSERACT_LANGUAGES",
            default_value = "kor+eng"
        )
    )]
    #[serde(default = "default_languages")]
    pub languages: String,

    /// Languages retried when the preferred set fails to initialize.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "tesseract-fallback-languages",
            env = "VERIPAY_TESSERACT_FALLBACK_LANGUAGES",
            default_value = "eng"
        )
    )]
    #[serde(default = "default_fallback_languages")]
    pub fallback_languages: String,

    /// Optional traineddata directory override.
    ///
    /// When unset, Tesseract resolves its data path from the environment.
    #[cfg_attr(
        feature = "config",
        arg(long = "tesseract-datapath", env = "VERIPAY_TESSERACT_DATAPATH")
    )]
    #[serde(default)]
    pub datapath: Option<PathBuf>,

    /// Sweeps multiple page-segmentation modes instead of a single pass.
    ///
    /// Slower, but recovers text from layouts the sparse-text pass misses.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "tesseract-thorough",
            env = "VERIPAY_TESSERACT_THOROUGH",
            default_value_t = default_thorough()
        )
    )]
    #[serde(default = "default_thorough")]
    pub thorough: bool,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            fallback_languages: default_fallback_languages(),
            datapath: None,
            thorough: default_thorough(),
        }
    }
}

fn default_languages() -> String {
    "kor+eng".to_owned()
}

fn default_fallback_languages() -> String {
    "eng".to_owned()
}

fn default_thorough() -> bool {
    false
}
