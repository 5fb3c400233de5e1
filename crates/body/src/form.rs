//! Decoded form data: named fields and uploaded files.
//!
//! Both tables keep entries in wire order and allow repeated names.
//! Point lookups resolve a repeated name to its **last** occurrence;
//! earlier occurrences stay reachable through `first` and `get_all`.

use std::io::Read;

use bytes::Bytes;

/// Value of a single form field.
///
/// Multipart parts without a filename usually carry UTF-8 text; when
/// they do not, the payload is kept raw instead of being mangled or
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Bytes(Bytes),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FieldValue::Text(text) => text.as_bytes(),
            FieldValue::Bytes(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Ordered multi-table of `(name, value)` form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    entries: Vec<(String, FieldValue)>,
}

impl Fields {
    pub(crate) fn push(&mut self, name: String, value: FieldValue) {
        self.entries.push((name, value));
    }

    /// Last occurrence of `name`, the one a repeated field resolves to.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.iter().rev().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    /// First occurrence of `name`, in wire order.
    pub fn first(&self, name: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    /// Every occurrence of `name`, in wire order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldValue> + 'a {
        self.entries.iter().filter(move |(key, _)| key == name).map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One uploaded file from a multipart body.
///
/// Presence of a `filename` parameter is what makes a part a file, so
/// `filename` is always present here, even when it is the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    field: String,
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

impl FilePart {
    pub(crate) fn new(field: String, filename: String, content_type: Option<String>, data: Bytes) -> Self {
        Self { field, filename, content_type, data }
    }

    /// The form field name the file was posted under.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The client-supplied filename, possibly empty.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The part's own `Content-Type` header, verbatim.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A bounded reader over the file payload.
    pub fn reader(&self) -> PartReader<'_> {
        PartReader { data: &self.data, position: 0 }
    }
}

/// Bounded [`Read`] over one part's payload.
///
/// Reads are clamped to the part's end; `read_exact` past the end fails
/// with `UnexpectedEof` instead of blocking or spilling into the next
/// part.
#[derive(Debug)]
pub struct PartReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl PartReader<'_> {
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}

impl Read for PartReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}

/// Ordered list of uploaded files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Files {
    parts: Vec<FilePart>,
}

impl Files {
    pub(crate) fn push(&mut self, part: FilePart) {
        self.parts.push(part);
    }

    /// Last file posted under `field`.
    pub fn get(&self, field: &str) -> Option<&FilePart> {
        self.parts.iter().rev().find(|part| part.field() == field)
    }

    /// Every file posted under `field`, in wire order.
    pub fn get_all<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FilePart> + 'a {
        self.parts.iter().filter(move |part| part.field() == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilePart> {
        self.parts.iter()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Everything a form body decodes into.
///
/// Each multipart part lands in exactly one of the two tables: parts
/// with a `filename` parameter (even an empty one) become files, parts
/// without one become fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Fields,
    files: Files,
}

impl FormData {
    pub(crate) fn new(fields: Fields, files: Files) -> Self {
        Self { fields, files }
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn files(&self) -> &Files {
        &self.files
    }
}

/// A form made of fields alone, the shape urlencoded bodies decode to.
impl From<Fields> for FormData {
    fn from(fields: Fields) -> Self {
        Self { fields, files: Files::default() }
    }
}
