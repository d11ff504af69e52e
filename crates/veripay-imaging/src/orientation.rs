//! Decides whether a receipt photo needs rotating before recognition.
//!
//! Three signals, cheapest first: the EXIF orientation tag, the aspect
//! ratio, and a directional-sharpness comparison for near-square images.
//! The whole analysis is advisory; any failure yields
//! [`Orientation::Indeterminate`], which recognition treats as upright.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, imageops::FilterType};
use veripay_core::fs::derived_file_name;

use crate::error::ImagingError;
use crate::ops::intensity_stats;

const TRACING_TARGET: &str = "veripay_imaging::orientation";

/// Aspect ratios beyond these bounds are clearly landscape or portrait
/// and skip the sharpness probe.
const LANDSCAPE_RATIO: f32 = 1.5;
const PORTRAIT_RATIO: f32 = 0.7;

/// Probe canvas for the directional-sharpness measurement.
const PROBE_SIZE: u32 = 200;
const PROBE_STRIP: u32 = 50;

/// The vertical deviation must beat the horizontal one by this factor
/// before a rotation is inferred.
const DOMINANCE_FACTOR: f32 = 1.2;

/// Outcome of orientation analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// The image should be transformed before recognition.
    NeedsAdjustment(Adjustment),
    /// The image reads correctly as stored.
    Upright,
    /// Analysis failed; callers proceed as if upright.
    Indeterminate,
}

impl Orientation {
    /// The transform to apply, when one was inferred.
    pub fn adjustment(self) -> Option<Adjustment> {
        match self {
            Self::NeedsAdjustment(adjustment) => Some(adjustment),
            Self::Upright | Self::Indeterminate => None,
        }
    }
}

/// The transform an image needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Undo the camera orientation recorded in EXIF (values 2 through 8).
    Exif(u32),
    /// Rotate 90 degrees; inferred from dominant vertical text.
    QuarterTurn,
}

/// Analyzes the image at `path`. Never fails: unreadable or undecodable
/// images report [`Orientation::Indeterminate`].
pub fn assess_orientation(path: &Path) -> Orientation {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET,
                path = %path.display(),
                error = %err,
                "orientation analysis could not read image",
            );
            return Orientation::Indeterminate;
        }
    };

    let image = match image::load_from_memory(&bytes) {
        Ok(image) => image,
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET,
                path = %path.display(),
                error = %err,
                "orientation analysis could not decode image",
            );
            return Orientation::Indeterminate;
        }
    };

    assess_decoded(exif_orientation(&bytes), &image)
}

/// Decision core, split from I/O so the signal combinations are testable.
fn assess_decoded(exif_orientation: Option<u32>, image: &DynamicImage) -> Orientation {
    if let Some(value @ 2..=8) = exif_orientation {
        return Orientation::NeedsAdjustment(Adjustment::Exif(value));
    }

    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Orientation::Indeterminate;
    }

    let ratio = width as f32 / height as f32;
    if ratio > LANDSCAPE_RATIO || ratio < PORTRAIT_RATIO {
        return Orientation::Upright;
    }

    // Near-square: compare sharpness along each axis. Squashing one axis
    // averages away fine structure running across it, so the strip that
    // keeps more deviation is the axis the text runs along.
    let thumb = image.thumbnail(PROBE_SIZE, PROBE_SIZE).to_luma8();
    let horizontal = image::imageops::resize(&thumb, PROBE_SIZE, PROBE_STRIP, FilterType::Triangle);
    let vertical = image::imageops::resize(&thumb, PROBE_STRIP, PROBE_SIZE, FilterType::Triangle);

    let (_, horizontal_dev) = intensity_stats(&horizontal);
    let (_, vertical_dev) = intensity_stats(&vertical);

    tracing::debug!(
        target: TRACING_TARGET,
        ratio,
        horizontal_dev,
        vertical_dev,
        "directional sharpness probe",
    );

    if vertical_dev > horizontal_dev * DOMINANCE_FACTOR {
        Orientation::NeedsAdjustment(Adjustment::QuarterTurn)
    } else {
        Orientation::Upright
    }
}

/// EXIF orientation tag value, if the image carries one.
fn exif_orientation(bytes: &[u8]) -> Option<u32> {
    let mut cursor = Cursor::new(bytes);
    let reader = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
}

/// Writes a rotated derivative beside the artifact (`{stem}_rotated.png`).
///
/// Returns `None` when the transform cannot be applied; callers fall back
/// to the unrotated original.
pub fn apply_adjustment(path: &Path, adjustment: Adjustment) -> Option<PathBuf> {
    match try_apply(path, adjustment) {
        Ok(derived) => {
            tracing::debug!(
                target: TRACING_TARGET,
                source = %path.display(),
                derived = %derived.display(),
                ?adjustment,
                "wrote rotated derivative",
            );
            Some(derived)
        }
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET,
                path = %path.display(),
                error = %err,
                "rotation failed, continuing with the original",
            );
            None
        }
    }
}

fn try_apply(path: &Path, adjustment: Adjustment) -> Result<PathBuf, ImagingError> {
    let image = image::open(path).map_err(|source| ImagingError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    let transformed = match adjustment {
        Adjustment::Exif(value) => exif_transform(image, value),
        Adjustment::QuarterTurn => image.rotate90(),
    };

    let derived = path.with_file_name(derived_file_name(path, "_rotated"));
    transformed
        .save_with_format(&derived, ImageFormat::Png)
        .map_err(|source| ImagingError::Write {
            path: derived.clone(),
            source,
        })?;
    Ok(derived)
}

/// Canonical transforms for EXIF orientation values 2 through 8. Unknown
/// values pass the image through untouched.
fn exif_transform(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}
