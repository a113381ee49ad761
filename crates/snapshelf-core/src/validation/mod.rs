//! Upload selection validation
//!
//! A candidate file is accepted when its declared content type is on the
//! content-type allow-list OR its trailing extension is on the extension
//! allow-list. Either check alone is enough. Both checks fail closed: an
//! empty declared type never matches, and a name without a `.` has no
//! extension.

use crate::constants::{DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_ALLOWED_EXTENSIONS};
use crate::models::SourceFile;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid file format: {}. Please upload images only.", .0.join(", "))]
    Rejected(Vec<String>),
}

/// Result of validating one selection event.
#[derive(Debug, Default)]
pub struct ValidatedSelection {
    pub accepted: Vec<SourceFile>,
    pub rejected: Vec<String>,
}

impl ValidatedSelection {
    /// Single aggregated error naming every rejected file, if any were rejected.
    pub fn error(&self) -> Option<ValidationError> {
        if self.rejected.is_empty() {
            None
        } else {
            Some(ValidationError::Rejected(self.rejected.clone()))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty() && self.rejected.is_empty()
    }
}

/// Classifies candidate files against content-type and extension allow-lists.
#[derive(Debug, Clone)]
pub struct FileValidator {
    allowed_content_types: Vec<String>,
    allowed_extensions: Vec<String>,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(
            DEFAULT_ALLOWED_CONTENT_TYPES.iter().map(|s| s.to_string()),
            DEFAULT_ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()),
        )
    }
}

impl FileValidator {
    /// Allow-list entries are normalized: lowercased, and a leading `.` on
    /// extensions is dropped so both `".png"` and `"png"` work.
    pub fn new<C, E>(allowed_content_types: C, allowed_extensions: E) -> Self
    where
        C: IntoIterator<Item = String>,
        E: IntoIterator<Item = String>,
    {
        Self {
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.trim().to_lowercase())
                .filter(|ct| !ct.is_empty())
                .collect(),
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.allowed_content_types
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    /// Partition candidates into accepted files and rejected file names.
    /// Input order is preserved within each side.
    pub fn validate(&self, candidates: impl IntoIterator<Item = SourceFile>) -> ValidatedSelection {
        let mut selection = ValidatedSelection::default();

        for file in candidates {
            if self.is_acceptable(&file.name, &file.content_type) {
                selection.accepted.push(file);
            } else {
                selection.rejected.push(file.name);
            }
        }

        selection
    }

    pub fn is_acceptable(&self, file_name: &str, content_type: &str) -> bool {
        self.content_type_allowed(content_type) || self.extension_allowed(file_name)
    }

    fn content_type_allowed(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        !essence.is_empty() && self.allowed_content_types.iter().any(|ct| *ct == essence)
    }

    fn extension_allowed(&self, file_name: &str) -> bool {
        match trailing_extension(file_name) {
            Some(ext) if !ext.is_empty() => {
                let ext = ext.to_lowercase();
                self.allowed_extensions.iter().any(|allowed| *allowed == ext)
            }
            _ => false,
        }
    }

    /// The extension allow-list rendered as a file-picker `accept` attribute.
    pub fn accept_attribute(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Text after the last `.` of a file name, or `None` when there is no `.`.
pub fn trailing_extension(file_name: &str) -> Option<&str> {
    file_name.rsplit_once('.').map(|(_, ext)| ext)
}

/// Canonical content type for a known image extension; empty when unknown.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "dng" => "image/x-adobe-dng",
        _ => "",
    }
}
