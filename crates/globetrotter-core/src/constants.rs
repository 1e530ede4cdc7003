//! Default values shared by the configuration layer and the processing crate.

pub const BYTES_PER_MB: usize = 1024 * 1024;

pub const DEFAULT_MAX_FILE_SIZE_MB: usize = 10;
pub const DEFAULT_MAX_IMAGE_WIDTH: u32 = 4096;
pub const DEFAULT_MAX_IMAGE_HEIGHT: u32 = 4096;
pub const DEFAULT_ALLOWED_FORMATS: &[&str] = &["jpeg", "png", "webp", "gif"];

/// `name:WIDTHxHEIGHT:QUALITY` entries, comma separated.
pub const DEFAULT_IMAGE_VARIANTS: &str =
    "thumbnail:300x300:70,medium:800x800:80,large:1200x1200:90";
pub const DEFAULT_VARIANT_FORMAT: &str = "jpeg";
pub const DEFAULT_VARIANT_FIT: &str = "cover";
pub const DEFAULT_VARIANT_POSITION: &str = "center";

pub const DEFAULT_WEB_MAX_WIDTH: u32 = 1920;
pub const DEFAULT_WEB_MAX_HEIGHT: u32 = 1080;
pub const DEFAULT_WEB_FORMAT: &str = "webp";
pub const DEFAULT_WEB_QUALITY: u8 = 85;

pub const DEFAULT_WATERMARK_POSITION: &str = "southeast";
pub const DEFAULT_WATERMARK_OPACITY: f32 = 0.5;
pub const DEFAULT_WATERMARK_MARGIN: u32 = 10;

pub const DEFAULT_LOCAL_STORAGE_PATH: &str = "./media";
pub const DEFAULT_LOCAL_STORAGE_BASE_URL: &str = "http://localhost:4000/media";

pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 100;
