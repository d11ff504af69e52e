use serde::{Deserialize, Serialize};

/// Configuration for the recognition pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(clap::Args))]
pub struct PipelineConfig {
    /// Monthly ceiling on billed cloud recognitions.
    ///
    /// Once the usage ledger reports this many cloud attempts in the
    /// current calendar month, escalation stops with a quota failure.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "monthly-ceiling",
            env = "VERIPAY_MONTHLY_CEILING",
            default_value_t = default_monthly_ceiling()
        )
    )]
    #[serde(default = "default_monthly_ceiling")]
    pub monthly_ceiling: u32,

    /// Prepares images with the slower thorough profile before recognition.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pipeline-thorough",
            env = "VERIPAY_PIPELINE_THOROUGH",
            default_value_t = default_thorough()
        )
    )]
    #[serde(default = "default_thorough")]
    pub thorough: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            monthly_ceiling: default_monthly_ceiling(),
            thorough: default_thorough(),
        }
    }
}

fn default_monthly_ceiling() -> u32 {
    950
}

fn default_thorough() -> bool {
    false
}
