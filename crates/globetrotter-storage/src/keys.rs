//! Shared key generation for storage backends.

use uuid::Uuid;

/// Name used for the stored original next to its variants.
pub const ORIGINAL_KEY_NAME: &str = "original";

/// Storage key for one rendition of an asset: `images/{asset_id}/{name}.{ext}`.
pub fn asset_key(asset_id: Uuid, name: &str, extension: &str) -> String {
    format!("images/{}/{}.{}", asset_id, name, extension)
}
