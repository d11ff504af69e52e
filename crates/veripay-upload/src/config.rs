use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for upload session handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(clap::Args))]
pub struct UploadConfig {
    /// Directory holding in-flight chunk files, one subdirectory per session.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "upload-scratch-dir",
            env = "VERIPAY_UPLOAD_SCRATCH_DIR",
            default_value = "./uploads/tmp"
        )
    )]
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Directory receiving reassembled upload artifacts.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "upload-artifact-dir",
            env = "VERIPAY_UPLOAD_ARTIFACT_DIR",
            default_value = "./uploads"
        )
    )]
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Seconds an incomplete session may sit idle before the reaper
    /// removes it.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "upload-session-ttl",
            env = "VERIPAY_UPLOAD_SESSION_TTL_SECS",
            default_value_t = default_session_ttl_secs()
        )
    )]
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Seconds between reaper sweeps.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "upload-sweep-interval",
            env = "VERIPAY_UPLOAD_SWEEP_INTERVAL_SECS",
            default_value_t = default_sweep_interval_secs()
        )
    )]
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Upper bound on the declared chunk count of a single upload.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "upload-max-chunks",
            env = "VERIPAY_UPLOAD_MAX_CHUNKS",
            default_value_t = default_max_chunks()
        )
    )]
    #[serde(default = "default_max_chunks")]
    pub max_chunks: u32,
}

impl UploadConfig {
    /// Idle lifetime of an incomplete session.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Interval between reaper sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            artifact_dir: default_artifact_dir(),
            session_ttl_secs: default_session_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_chunks: default_max_chunks(),
        }
    }
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("./uploads/tmp")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_session_ttl_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_max_chunks() -> u32 {
    256
}
