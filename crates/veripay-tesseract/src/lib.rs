#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod engine;
mod recognizer;
mod worker;

pub use self::config::TesseractConfig;
pub use self::engine::{LocalEngine, RecognitionMode};
pub use self::recognizer::{BlockingRecognizer, Reading};
