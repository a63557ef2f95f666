/// Frame rate used when none is requested.
pub const DEFAULT_FPS: u32 = 15;

/// Recording length used by the CLI when neither a duration nor a frame
/// limit is given.
pub const DEFAULT_RECORD_SECONDS: u64 = 10;

/// JPEG quality on the 1-100 scale.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Emit a progress line every N frames (~1 second at the default rate).
pub const DEFAULT_PROGRESS_THROTTLE: usize = 15;

pub const DEFAULT_PATTERN_WIDTH: u32 = 640;
pub const DEFAULT_PATTERN_HEIGHT: u32 = 480;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Suffix of the in-progress output file, renamed away on success.
pub const PARTIAL_FILE_SUFFIX: &str = "part";
