#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for gateway client operations.
pub const TRACING_TARGET: &str = "veripay_gateway::client";

mod client;
mod config;
mod sign;
mod usage;
mod verify;
mod wire;

pub use self::client::GatewayClient;
pub use self::config::GatewayConfig;
