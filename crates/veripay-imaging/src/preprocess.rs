//! Renders recognition-ready derivatives of a reassembled receipt photo.
//!
//! Two profiles: `fast` is the default single-derivative path tuned for
//! the local engine's first pass; `thorough` trades time for a stronger
//! contrast treatment and feeds the slower page-segmentation sweep.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageFormat, imageops::FilterType};
use jiff::Timestamp;
use veripay_core::fs::derived_file_name;

use crate::error::ImagingError;
use crate::ops::{binarize, intensity_stats, linear_stretch, normalize_levels, sharpen};

const TRACING_TARGET: &str = "veripay_imaging::preprocess";

/// Fast profile: target width and treatment cutoffs.
const FAST_WIDTH: u32 = 2000;
const FAST_BRIGHTNESS_CUTOFF: f32 = 140.0;
const FAST_DEVIATION_CUTOFF: f32 = 50.0;
const FAST_STRETCH_SLOPE: f32 = 2.0;
const FAST_STRETCH_OFFSET: f32 = -80.0;
const FAST_THRESHOLD: u8 = 110;

/// Thorough profile: target width and treatment cutoffs.
const THOROUGH_WIDTH: u32 = 2100;
const THOROUGH_BRIGHTNESS_CUTOFF: f32 = 160.0;
const THOROUGH_STRETCH_SLOPE: f32 = 2.2;
const THOROUGH_STRETCH_OFFSET: f32 = -100.0;
const THOROUGH_THRESHOLD: u8 = 120;

/// Which contrast treatment a profile ended up applying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Treatment {
    /// Contrast stretch plus binarization, for dark or flat images.
    Binarized,
    /// Normalization plus sharpening, for adequately lit images.
    Sharpened,
    /// Preparation failed; the untouched source is used.
    Unmodified,
}

/// A recognition-ready image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    /// Image to hand to the engine. Equals the source when preparation
    /// failed.
    pub path: PathBuf,
    /// Treatment that produced it.
    pub treatment: Treatment,
}

impl Prepared {
    /// Whether `path` is a derivative the caller must clean up, as opposed
    /// to the source artifact itself.
    pub fn is_derived(&self) -> bool {
        self.treatment != Treatment::Unmodified
    }

    /// References the source itself, for callers whose preparation never
    /// ran.
    pub fn unmodified(source: &Path) -> Self {
        Self {
            path: source.to_path_buf(),
            treatment: Treatment::Unmodified,
        }
    }
}

/// Produces the fast-profile derivative (`{stem}_fast.png`).
///
/// Best-effort: on any failure the source artifact is returned unchanged.
pub fn prepare_fast(source: &Path) -> Prepared {
    match try_prepare_fast(source) {
        Ok(prepared) => prepared,
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET,
                path = %source.display(),
                error = %err,
                "fast preprocessing failed, using the source image",
            );
            Prepared::unmodified(source)
        }
    }
}

/// Produces the thorough-profile derivative (`basic_{millis}_{stem}.png`).
///
/// Best-effort like [`prepare_fast`].
pub fn prepare_thorough(source: &Path) -> Prepared {
    match try_prepare_thorough(source) {
        Ok(prepared) => prepared,
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET,
                path = %source.display(),
                error = %err,
                "thorough preprocessing failed, using the source image",
            );
            Prepared::unmodified(source)
        }
    }
}

fn try_prepare_fast(source: &Path) -> Result<Prepared, ImagingError> {
    let gray = load_scaled_gray(source, FAST_WIDTH)?;
    let (brightness, deviation) = intensity_stats(&gray);

    let (treated, treatment) =
        if brightness < FAST_BRIGHTNESS_CUTOFF || deviation < FAST_DEVIATION_CUTOFF {
            let stretched = linear_stretch(
                &normalize_levels(&gray),
                FAST_STRETCH_SLOPE,
                FAST_STRETCH_OFFSET,
            );
            (binarize(&stretched, FAST_THRESHOLD), Treatment::Binarized)
        } else {
            (sharpen(&normalize_levels(&gray)), Treatment::Sharpened)
        };

    let derived = source.with_file_name(derived_file_name(source, "_fast"));
    write_gray(&treated, &derived)?;

    tracing::debug!(
        target: TRACING_TARGET,
        source = %source.display(),
        derived = %derived.display(),
        brightness,
        deviation,
        ?treatment,
        "fast derivative ready",
    );
    Ok(Prepared {
        path: derived,
        treatment,
    })
}

fn try_prepare_thorough(source: &Path) -> Result<Prepared, ImagingError> {
    let gray = load_scaled_gray(source, THOROUGH_WIDTH)?;
    let (brightness, _) = intensity_stats(&gray);

    let sharpened = sharpen(&normalize_levels(&gray));
    let (treated, treatment) = if brightness < THOROUGH_BRIGHTNESS_CUTOFF {
        let stretched = linear_stretch(&sharpened, THOROUGH_STRETCH_SLOPE, THOROUGH_STRETCH_OFFSET);
        (binarize(&stretched, THOROUGH_THRESHOLD), Treatment::Binarized)
    } else {
        (sharpened, Treatment::Sharpened)
    };

    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("upload");
    let name = format!("basic_{}_{stem}.png", Timestamp::now().as_millisecond());
    let derived = source.with_file_name(name);
    write_gray(&treated, &derived)?;

    tracing::debug!(
        target: TRACING_TARGET,
        source = %source.display(),
        derived = %derived.display(),
        brightness,
        ?treatment,
        "thorough derivative ready",
    );
    Ok(Prepared {
        path: derived,
        treatment,
    })
}

/// Loads the image, scales it to the target width (upscaling allowed,
/// aspect preserved, Lanczos3), and converts to grayscale.
fn load_scaled_gray(source: &Path, width: u32) -> Result<GrayImage, ImagingError> {
    let image = image::open(source).map_err(|source_err| ImagingError::Load {
        path: source.to_path_buf(),
        source: source_err,
    })?;
    Ok(scale_to_width(&image, width).to_luma8())
}

fn scale_to_width(image: &DynamicImage, width: u32) -> DynamicImage {
    let (w, h) = (image.width(), image.height());
    if w == 0 || h == 0 || w == width {
        return image.clone();
    }
    let height = ((h as f64 * width as f64 / w as f64).round() as u32).max(1);
    image.resize_exact(width, height, FilterType::Lanczos3)
}

fn write_gray(image: &GrayImage, path: &Path) -> Result<(), ImagingError> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| ImagingError::Write {
            path: path.to_path_buf(),
            source,
        })
}
