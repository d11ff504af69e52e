#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod state;

pub mod handler;
pub mod middleware;

pub use crate::config::ServiceConfig;
pub use crate::state::AppState;
