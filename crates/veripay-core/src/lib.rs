#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;

pub mod fs;
pub mod ocr;
pub mod tuid;
pub mod usage;
pub mod verify;

pub use crate::error::{BoxedError, Error, ErrorKind, Result};
pub use crate::ocr::{EngineError, EngineKind, OcrEngine, Recognition, RecognitionAttempt};
pub use crate::tuid::Tuid;
pub use crate::usage::{UsageLedger, UsageRecord};
pub use crate::verify::{TuidVerifier, Verification};
