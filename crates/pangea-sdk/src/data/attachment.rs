use bytes::Bytes;

/// A binary part that arrived alongside the JSON part of a multipart response.
///
/// Saving is left to the caller; see [`AttachedFile::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    pub filename:     String,
    pub content_type: String,
    pub body:         Bytes,
}

impl AttachedFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            filename:     filename.into(),
            content_type: content_type.into(),
            body:         body.into(),
        }
    }

    pub fn len(&self) -> usize { self.body.len() }

    pub fn is_empty(&self) -> bool { self.body.is_empty() }
}
