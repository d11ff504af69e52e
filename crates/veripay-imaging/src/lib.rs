#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
pub mod ops;
pub mod orientation;
pub mod preprocess;

pub use crate::error::ImagingError;
pub use crate::orientation::{Adjustment, Orientation, apply_adjustment, assess_orientation};
pub use crate::preprocess::{Prepared, Treatment, prepare_fast, prepare_thorough};
