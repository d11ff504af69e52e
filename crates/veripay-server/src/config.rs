//! Top-level service configuration.

use serde::{Deserialize, Serialize};
use veripay_gateway::GatewayConfig;
use veripay_pipeline::PipelineConfig;
use veripay_tesseract::TesseractConfig;
use veripay_upload::UploadConfig;
use veripay_vision::VisionConfig;

/// Aggregated configuration for everything behind the HTTP surface.
///
/// Each subsystem keeps its own config type beside its implementation;
/// this struct only composes them so a binary flattens one group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(clap::Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Chunked upload reassembly.
    #[cfg_attr(feature = "config", command(flatten))]
    #[serde(default)]
    pub upload: UploadConfig,

    /// Local recognition engine.
    #[cfg_attr(feature = "config", command(flatten))]
    #[serde(default)]
    pub tesseract: TesseractConfig,

    /// Cloud recognition engine.
    #[cfg_attr(feature = "config", command(flatten))]
    #[serde(default)]
    pub vision: VisionConfig,

    /// Ledger gateway collaborator.
    #[cfg_attr(feature = "config", command(flatten))]
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Recognition pipeline policy.
    #[cfg_attr(feature = "config", command(flatten))]
    #[serde(default)]
    pub pipeline: PipelineConfig,
}
