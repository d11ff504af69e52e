#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod manager;
mod reaper;
mod session;
mod store;

pub use crate::config::UploadConfig;
pub use crate::manager::{
    ChunkOutcome, IncomingChunk, ScratchStatus, SessionSnapshot, UploadManager,
};
pub use crate::reaper::ReaperWorker;
