//! Scratch-file naming and cleanup helpers.

use std::path::Path;

use jiff::Timestamp;

use crate::{Error, Result};

/// Tracing target for filesystem helpers.
pub const TRACING_TARGET: &str = "veripay_core::fs";

/// Reduces a client-supplied file name to a safe single path component.
///
/// Directory parts are discarded and the remaining component is stripped to
/// alphanumerics (any script) plus `.`, `-` and `_`. Returns `None` when
/// nothing usable remains, including the `.` and `..` components.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let component = Path::new(name).file_name()?.to_str()?;
    let cleaned: String = component
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if cleaned.chars().all(|c| matches!(c, '.' | '-' | '_')) {
        return None;
    }
    Some(cleaned)
}

/// Derives the reassembled-artifact name for an uploaded file.
///
/// The original stem is suffixed with a millisecond timestamp so repeated
/// uploads of the same file never collide: `receipt.jpg` becomes
/// `receipt_1700000000123.jpg`.
pub fn artifact_file_name(original: &str, at: Timestamp) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("upload");
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{}.{ext}", at.as_millisecond()),
        None => format!("{stem}_{}", at.as_millisecond()),
    }
}

/// Derives a sibling file name with a suffix appended to the stem.
///
/// `receipt_17.jpg` with suffix `_fast` becomes `receipt_17_fast.png`; the
/// extension is always `png` because derived images are re-encoded.
pub fn derived_file_name(original: &Path, suffix: &str) -> String {
    let stem = original
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("upload");
    format!("{stem}{suffix}.png")
}

/// Removes a file, tolerating its absence.
///
/// Other failures are logged and swallowed: cleanup must never mask the
/// error that triggered it.
pub async fn remove_file_quiet(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET,
                path = %path.display(),
                error = %err,
                "failed to remove scratch file",
            );
        }
    }
}

/// Removes a directory and its contents, tolerating its absence.
pub async fn remove_dir_quiet(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET,
                path = %path.display(),
                error = %err,
                "failed to remove scratch directory",
            );
        }
    }
}

/// Synchronous variant of [`remove_file_quiet`] for `Drop` implementations.
pub fn remove_file_quiet_sync(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET,
                path = %path.display(),
                error = %err,
                "failed to remove scratch file",
            );
        }
    }
}

/// Creates a directory tree if it does not already exist.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await.map_err(|err| {
        Error::resource()
            .with_message(format!("failed to create directory {}", path.display()))
            .with_source(err)
    })
}
