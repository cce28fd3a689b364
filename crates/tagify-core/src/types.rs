//! Core data types for the Tagify pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Ordered tags as extracted from a model response.
pub type TagList = Vec<String>;

/// An uploaded image: a named byte stream plus the upload's declared metadata.
///
/// The declared content type and size come from the host (e.g. multipart
/// headers) and are what the validator checks. The stream is consumed once,
/// by the VLM client.
pub struct UploadedImage {
    content: Pin<Box<dyn AsyncRead + Send + Sync>>,
    content_type: Option<String>,
    size: u64,
    filename: Option<String>,
}

impl UploadedImage {
    /// Wrap an arbitrary byte stream with its declared metadata.
    pub fn from_reader<R>(
        reader: R,
        content_type: Option<String>,
        size: u64,
        filename: Option<String>,
    ) -> Self
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        Self {
            content: Box::pin(reader),
            content_type,
            size,
            filename,
        }
    }

    /// Wrap in-memory bytes; the declared size is the byte length.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        Self::from_reader(Cursor::new(bytes), Some(content_type.into()), size, None)
    }

    /// Set the original filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Override the declared size.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Consume the image and hand out its byte stream.
    pub fn into_stream(self) -> Pin<Box<dyn AsyncRead + Send + Sync>> {
        self.content
    }
}

impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

/// Tags for one image, stamped with caller-supplied metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggingResult {
    /// Display name for the image
    pub name: String,

    /// Where the image came from
    pub url: String,

    /// Owner identifier
    pub owner: String,

    /// Tags in the order the model emitted them
    pub tags: TagList,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_from_bytes_declares_length() {
        let image = UploadedImage::from_bytes(b"test".to_vec(), "image/jpeg");
        assert_eq!(image.size(), 4);
        assert_eq!(image.content_type(), Some("image/jpeg"));
        assert_eq!(image.filename(), None);
    }

    #[test]
    fn test_builder_overrides() {
        let image = UploadedImage::from_bytes(b"test".to_vec(), "image/png")
            .with_filename("large_test.png")
            .with_declared_size(1 << 30);
        assert_eq!(image.size(), 1 << 30);
        assert_eq!(image.filename(), Some("large_test.png"));
    }

    #[tokio::test]
    async fn test_into_stream_yields_bytes() {
        let image = UploadedImage::from_bytes(vec![1u8, 2, 3], "image/gif");
        let mut stream = image.into_stream();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, vec![1, 2, 3]);
    }

    #[test]
    fn test_debug_hides_content() {
        let image = UploadedImage::from_bytes(b"secret".to_vec(), "image/jpeg");
        let debug = format!("{image:?}");
        assert!(debug.contains("image/jpeg"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_tagging_result_serializes() {
        let result = TaggingResult {
            name: "testName".to_string(),
            url: "http://example.com/image.jpg".to_string(),
            owner: "testOwner".to_string(),
            tags: vec!["tag1".to_string(), "tag2".to_string()],
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"tags\":[\"tag1\",\"tag2\"]"));
    }
}
