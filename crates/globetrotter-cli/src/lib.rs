//! Helpers shared by the `globetrotter` binary.

use anyhow::{bail, Context};
use globetrotter_core::AppError;
use globetrotter_processing::{ProcessingError, UploadError, WatermarkSize};
use globetrotter_storage::StorageError;
use std::path::{Path, PathBuf};

/// Sibling of `input` named `{stem}-{suffix}.{extension}`
pub fn derived_path(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    input.with_file_name(format!("{}-{}.{}", stem, suffix, extension))
}

/// Parse `WIDTHxHEIGHT`, e.g. `1920x1080`
pub fn parse_dimensions(s: &str) -> anyhow::Result<(u32, u32)> {
    let (width, height) = s
        .split_once(['x', 'X'])
        .with_context(|| format!("Expected WIDTHxHEIGHT, got '{}'", s))?;
    let width: u32 = width
        .trim()
        .parse()
        .with_context(|| format!("Invalid width in '{}'", s))?;
    let height: u32 = height
        .trim()
        .parse()
        .with_context(|| format!("Invalid height in '{}'", s))?;
    if width == 0 || height == 0 {
        bail!("Dimensions must be non-zero, got '{}'", s);
    }
    Ok((width, height))
}

/// Parse a watermark size: `original`, `25%` or `200x100`
pub fn parse_watermark_size(s: &str) -> anyhow::Result<WatermarkSize> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("original") {
        return Ok(WatermarkSize::Original);
    }
    if let Some(percent) = s.strip_suffix('%') {
        let percent: f32 = percent
            .trim()
            .parse()
            .with_context(|| format!("Invalid percentage '{}'", s))?;
        return Ok(WatermarkSize::Relative { percent });
    }
    let (width, height) = parse_dimensions(s)?;
    Ok(WatermarkSize::Absolute { width, height })
}

/// Recover the pipeline error behind a failed command.
///
/// Context added along the way is looked through; anything that did not come
/// from the pipeline becomes an internal error.
pub fn into_app_error(err: anyhow::Error) -> AppError {
    let err = match err.downcast::<AppError>() {
        Ok(app) => return app,
        Err(err) => err,
    };
    let err = match err.downcast::<UploadError>() {
        Ok(upload) => return upload.into(),
        Err(err) => err,
    };
    let err = match err.downcast::<ProcessingError>() {
        Ok(processing) => return processing.into(),
        Err(err) => err,
    };
    match err.downcast::<StorageError>() {
        Ok(storage) => storage.into(),
        Err(err) => AppError::from(err),
    }
}

/// Initialize tracing for CLI binaries.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
