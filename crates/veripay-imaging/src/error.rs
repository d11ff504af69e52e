use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading or writing images.
///
/// These never cross the crate's public preparation functions, which
/// degrade to the untouched source instead; they exist so the inner
/// fallible steps stay individually testable.
#[derive(Debug, Error)]
pub enum ImagingError {
    /// The source image could not be read or decoded.
    #[error("failed to load image {}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A derivative could not be encoded or written.
    #[error("failed to write derivative {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
