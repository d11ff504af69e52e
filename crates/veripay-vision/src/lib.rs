#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for annotate-endpoint client operations.
pub const TRACING_TARGET_CLIENT: &str = "veripay_vision::client";

/// Tracing target for the engine adapter.
pub const TRACING_TARGET_ENGINE: &str = "veripay_vision::engine";

mod client;
mod config;
mod engine;
mod wire;

pub use self::client::VisionClient;
pub use self::config::VisionConfig;
pub use self::engine::CloudEngine;
