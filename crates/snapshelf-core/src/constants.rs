//! Application-wide constants.

/// Content types accepted by the upload picker.
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/heic",
    "image/heif",
    "image/webp",
    "image/gif",
    "image/bmp",
    "image/tiff",
    "image/x-adobe-dng",
    "image/dng",
];

/// File extensions accepted by the upload picker (lowercase, no leading dot).
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "heif", "webp", "gif", "bmp", "tiff", "tif", "dng",
];

/// Prefix of every binary object key. Keys are `user-images/{uid}/{uid}-{timestamp}.{ext}`.
pub const USER_IMAGES_PREFIX: &str = "user-images";

/// Base URL of the semantic indexing backend.
pub const DEFAULT_INDEX_SERVICE_URL: &str =
    "https://semantic-search-backend-628129189292.us-central1.run.app";

/// Number of search results requested when the caller does not say otherwise.
pub const DEFAULT_SEARCH_RESULT_LIMIT: u32 = 5;

/// Shown when an upload is attempted without an authenticated user.
pub const NOT_AUTHENTICATED_MESSAGE: &str = "You must be logged in to upload images";
