#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for recognition pipeline events.
pub const TRACING_TARGET: &str = "veripay_pipeline::recognition";

mod config;
mod pipeline;
mod quota;
mod scratch;

pub use self::config::PipelineConfig;
pub use self::pipeline::{RecognitionPipeline, RecognitionReport};
pub use self::quota::QuotaGuard;
