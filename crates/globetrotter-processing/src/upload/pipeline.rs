//! Upload pipeline.
//!
//! The validator runs first and a rejection ends the upload before any
//! rendering. Variants are written to storage concurrently; if any write
//! fails, objects already written for the asset are deleted on a
//! best-effort basis and the first error is returned.

use bytes::Bytes;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

use globetrotter_storage::{asset_key, Storage, ORIGINAL_KEY_NAME};

use super::types::{ProcessedAsset, StoredVariant, UploadError, UploadOptions};
use crate::error::ProcessingError;
use crate::image::{ImageProcessor, VariantGenerator};
use crate::validator::ImageValidator;

const MAX_FILENAME_LEN: usize = 255;

fn sanitize_filename(filename: &str) -> String {
    let path = std::path::Path::new(filename);
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    if base.contains("..") {
        return "invalid_filename".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX_FILENAME_LEN)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim().is_empty() || s.len() < 3 {
        "file".to_string()
    } else {
        s
    }
}

/// Extension and content type for the original as uploaded
fn original_key_parts(format: &str) -> (&'static str, &'static str) {
    match image::ImageFormat::from_extension(format) {
        Some(f) => (
            f.extensions_str().first().copied().unwrap_or("bin"),
            f.to_mime_type(),
        ),
        None => ("bin", "application/octet-stream"),
    }
}

async fn cleanup(storage: &Arc<dyn Storage>, keys: &[String]) {
    for key in keys {
        if let Err(e) = storage.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to clean up stored object");
        }
    }
}

/// Run the upload pipeline: validate → extract metadata → render → store.
pub async fn upload_image(
    data: Bytes,
    filename: &str,
    options: &UploadOptions,
    validator: &ImageValidator,
    generator: &VariantGenerator,
    storage: Arc<dyn Storage>,
) -> Result<ProcessedAsset, UploadError> {
    let start = std::time::Instant::now();
    let id = Uuid::new_v4();
    let original_filename = sanitize_filename(filename);

    let metadata = {
        let validator = validator.clone();
        let data = data.clone();
        tokio::task::spawn_blocking(move || validator.check(&data))
            .await
            .map_err(ProcessingError::from)?
            .map_err(UploadError::Rejected)?
    };

    tracing::debug!(
        asset_id = %id,
        filename = %original_filename,
        width = metadata.width,
        height = metadata.height,
        format = %metadata.format,
        "Upload accepted"
    );

    let rendered = generator.generate(data.clone()).await?;

    let mut tasks = JoinSet::new();
    for (name, variant) in rendered {
        let storage = Arc::clone(&storage);
        let key = asset_key(id, &name, variant.format.extension());
        tasks.spawn(async move {
            let stored = storage
                .upload_with_key(&key, variant.data.to_vec(), variant.content_type())
                .await;
            let stored = stored.map(|url| StoredVariant {
                storage_key: key.clone(),
                url,
                width: variant.width,
                height: variant.height,
                content_type: variant.content_type().to_string(),
                size_bytes: variant.size_bytes(),
            });
            (name, key, stored)
        });
    }

    let mut variants = BTreeMap::new();
    let mut written = Vec::new();
    let mut failure: Option<UploadError> = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, key, Ok(stored))) => {
                written.push(key);
                variants.insert(name, stored);
            }
            Ok((_, key, Err(e))) => {
                tracing::error!(key = %key, error = %e, "Variant upload failed");
                failure.get_or_insert(e.into());
            }
            Err(e) => {
                failure.get_or_insert(ProcessingError::from(e).into());
            }
        }
    }
    if let Some(err) = failure {
        cleanup(&storage, &written).await;
        return Err(err);
    }

    let original = if options.store_original {
        let payload = if options.remove_exif {
            tokio::task::spawn_blocking(move || ImageProcessor::remove_exif(data))
                .await
                .map_err(ProcessingError::from)?
        } else {
            data
        };

        let (extension, content_type) = original_key_parts(&metadata.format);
        let key = asset_key(id, ORIGINAL_KEY_NAME, extension);
        let size_bytes = payload.len() as u64;

        match storage
            .upload_with_key(&key, payload.to_vec(), content_type)
            .await
        {
            Ok(url) => Some(StoredVariant {
                storage_key: key,
                url,
                width: metadata.width,
                height: metadata.height,
                content_type: content_type.to_string(),
                size_bytes,
            }),
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Original upload failed");
                cleanup(&storage, &written).await;
                return Err(e.into());
            }
        }
    } else {
        None
    };

    tracing::info!(
        asset_id = %id,
        variants = variants.len(),
        original_stored = original.is_some(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Image upload processed"
    );

    Ok(ProcessedAsset {
        id,
        original_filename,
        metadata,
        variants,
        original,
        created_at: Utc::now(),
    })
}
