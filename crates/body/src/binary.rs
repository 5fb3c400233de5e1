use bytes::Bytes;

/// Immutable view over a fully materialized payload.
///
/// Every accessor is a cheap slice of the same underlying buffer;
/// nothing here consumes or shifts the payload. In particular
/// [`head`](BinaryBody::head) can be called any number of times without
/// changing what [`size`](BinaryBody::size) or
/// [`as_bytes`](BinaryBody::as_bytes) report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryBody {
    data: Bytes,
    content_type: Option<String>,
}

impl BinaryBody {
    pub fn new(data: Bytes, content_type: Option<String>) -> Self {
        Self { data, content_type }
    }

    /// The whole payload, zero-copy.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// The first `n` bytes, clamped to the payload length. Asking past
    /// the end is not an error and reading never consumes.
    pub fn head(&self, n: usize) -> Bytes {
        self.data.slice(..n.min(self.data.len()))
    }

    /// Observed payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The request's media type, verbatim.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}
