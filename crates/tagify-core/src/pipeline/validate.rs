//! Upload validation before the model is called.

use crate::config::UploadConfig;
use crate::error::PipelineError;
use crate::types::UploadedImage;

/// Checks an upload's declared content type and size against policy.
#[derive(Debug, Clone)]
pub struct ImageValidator {
    allowed_content_types: Vec<String>,
    max_file_size_bytes: u64,
}

impl ImageValidator {
    /// Create a new validator with the given upload policy.
    pub fn new(policy: &UploadConfig) -> Self {
        Self {
            allowed_content_types: policy.allowed_content_types.clone(),
            max_file_size_bytes: policy.max_file_size_bytes,
        }
    }

    /// Validate the upload's declared metadata.
    ///
    /// The content type is checked before the size, so an oversized text file
    /// is reported as `InvalidFileType`.
    pub fn validate(&self, image: &UploadedImage) -> Result<(), PipelineError> {
        let allowed = image
            .content_type()
            .is_some_and(|ct| self.allowed_content_types.iter().any(|a| a == ct));
        if !allowed {
            return Err(PipelineError::InvalidFileType {
                content_type: image.content_type().map(String::from),
            });
        }

        if image.size() > self.max_file_size_bytes {
            return Err(PipelineError::FileTooLarge {
                size: image.size(),
                max_size: self.max_file_size_bytes,
            });
        }

        Ok(())
    }
}

/// Guess a content type from the leading bytes of a file.
///
/// Used by hosts that read images from disk and have no declared type.
pub fn detect_content_type(header: &[u8]) -> Option<&'static str> {
    if header.len() < 4 {
        return None;
    }

    // JPEG: FF D8 FF
    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }

    // PNG: 89 50 4E 47
    if header.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Some("image/png");
    }

    // GIF: GIF8
    if header.starts_with(b"GIF8") {
        return Some("image/gif");
    }

    // WebP: RIFF....WEBP
    if header.len() >= 12 && header.starts_with(b"RIFF") && &header[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    // BMP: BM
    if header.starts_with(b"BM") {
        return Some("image/bmp");
    }

    // TIFF: II (little-endian) or MM (big-endian) followed by version 42
    let is_tiff_le = header.starts_with(&[b'I', b'I', 0x2A, 0x00]);
    let is_tiff_be = header.starts_with(&[b'M', b'M', 0x00, 0x2A]);
    if is_tiff_le || is_tiff_be {
        return Some("image/tiff");
    }

    None
}
