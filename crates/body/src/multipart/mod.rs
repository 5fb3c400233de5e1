//! `multipart/form-data` decoding.
//!
//! [`decode`] reads a [`ByteSource`] to completion and folds the decoded
//! parts into a [`FormData`]: parts whose `Content-Disposition` carries a
//! `filename` parameter land in [`FormData::files`], all others in
//! [`FormData::fields`]. An empty `filename=""` still counts as a file;
//! only the absence of the parameter makes a part a field.
//!
//! The incremental state machine lives in [`MultipartDecoder`]; this
//! module drives it over a buffered payload and enforces the
//! [`DecodeLimits`] caps.

mod codec;

pub use codec::{MultipartDecoder, PartEvent, PartHeaders};

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::debug;

use crate::ensure;
use crate::error::BodyDecodeError;
use crate::form::{FieldValue, Fields, FilePart, Files, FormData};
use crate::limits::DecodeLimits;
use crate::source::ByteSource;

/// Extracts the `boundary` parameter from a multipart content type.
///
/// # Errors
///
/// Returns [`BodyDecodeError::MissingBoundary`] if `content_type` is not
/// a parsable mime type or carries no boundary.
pub fn boundary(content_type: &str) -> Result<String, BodyDecodeError> {
    let Ok(mime) = content_type.parse::<mime::Mime>() else {
        return Err(BodyDecodeError::missing_boundary(content_type));
    };
    let Some(value) = mime.get_param(mime::BOUNDARY) else {
        return Err(BodyDecodeError::missing_boundary(content_type));
    };
    // the parser strips the quotes from quoted parameter values
    let boundary = String::from(value.as_str());
    ensure!(!boundary.is_empty(), BodyDecodeError::missing_boundary(content_type));
    Ok(boundary)
}

/// Reads `source` to completion and decodes it as `multipart/form-data`.
///
/// # Errors
///
/// Returns [`BodyDecodeError`] if the source fails, a limit is exceeded
/// or the multipart framing is invalid.
pub async fn decode(
    source: &mut ByteSource,
    content_type: &str,
    limits: &DecodeLimits,
) -> Result<FormData, BodyDecodeError> {
    let boundary = boundary(content_type)?;
    let payload = source.read_all(limits.get_max_body_bytes()).await?.clone();
    decode_buffer(&payload, &boundary, limits)
}

/// Decodes a fully buffered multipart payload.
pub fn decode_buffer(payload: &[u8], boundary: &str, limits: &DecodeLimits) -> Result<FormData, BodyDecodeError> {
    let mut decoder = MultipartDecoder::new(boundary, limits.get_max_part_header_bytes());
    let mut buffer = BytesMut::from(payload);
    let mut assembler = Assembler::new(limits);

    while let Some(event) = decoder.decode(&mut buffer)? {
        assembler.apply(event)?;
    }
    while let Some(event) = decoder.decode_eof(&mut buffer)? {
        assembler.apply(event)?;
    }

    Ok(assembler.finish())
}

/// Folds the decoder's event stream into a [`FormData`].
struct Assembler<'a> {
    limits: &'a DecodeLimits,
    fields: Fields,
    files: Files,
    parts: usize,
    current: Option<OpenPart>,
}

struct OpenPart {
    headers: PartHeaders,
    data: BytesMut,
}

impl<'a> Assembler<'a> {
    fn new(limits: &'a DecodeLimits) -> Self {
        Self { limits, fields: Fields::default(), files: Files::default(), parts: 0, current: None }
    }

    fn apply(&mut self, event: PartEvent) -> Result<(), BodyDecodeError> {
        match event {
            PartEvent::Headers(headers) => {
                self.parts += 1;
                ensure!(
                    self.parts <= self.limits.get_max_parts(),
                    BodyDecodeError::limit_exceeded("max_parts", self.limits.get_max_parts())
                );
                self.current = Some(OpenPart { headers, data: BytesMut::new() });
                Ok(())
            }
            PartEvent::Chunk(chunk) => {
                let Some(part) = self.current.as_mut() else {
                    return Err(BodyDecodeError::malformed_part("payload outside of a part"));
                };
                ensure!(
                    part.data.len() + chunk.len() <= self.limits.get_max_part_bytes(),
                    BodyDecodeError::limit_exceeded("max_part_bytes", self.limits.get_max_part_bytes())
                );
                part.data.extend_from_slice(&chunk);
                Ok(())
            }
            PartEvent::End => {
                let Some(part) = self.current.take() else {
                    return Err(BodyDecodeError::malformed_part("part closed before it was opened"));
                };
                self.close(part)
            }
            PartEvent::Finished => Ok(()),
        }
    }

    /// Filename presence decides the bucket: parts with a `filename`
    /// parameter are files, all others are fields.
    fn close(&mut self, part: OpenPart) -> Result<(), BodyDecodeError> {
        let OpenPart { headers, data } = part;
        let data = data.freeze();
        match headers.filename {
            Some(filename) => {
                self.files.push(FilePart::new(headers.name, filename, headers.content_type, data));
            }
            None => {
                ensure!(
                    self.fields.len() < self.limits.get_max_fields(),
                    BodyDecodeError::limit_exceeded("max_fields", self.limits.get_max_fields())
                );
                let value = match std::str::from_utf8(&data) {
                    Ok(text) => FieldValue::Text(text.to_owned()),
                    Err(_) => FieldValue::Bytes(data),
                };
                self.fields.push(headers.name, value);
            }
        }
        Ok(())
    }

    fn finish(self) -> FormData {
        debug!(parts = self.parts, fields = self.fields.len(), files = self.files.len(), "decoded multipart body");
        FormData::new(self.fields, self.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "----test-boundary";

    fn two_fields_one_file() -> String {
        concat!(
            "------test-boundary\r\n",
            "Content-Disposition: form-data; name=\"title\"\r\n",
            "\r\n",
            "hello world\r\n",
            "------test-boundary\r\n",
            "Content-Disposition: form-data; name=\"count\"\r\n",
            "\r\n",
            "42\r\n",
            "------test-boundary\r\n",
            "Content-Disposition: form-data; name=\"upload\"; filename=\"notes.txt\"\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "line one\r\nline two\r\n",
            "------test-boundary--\r\n"
        )
        .to_owned()
    }

    #[test]
    fn test_partition_fields_and_files() {
        let payload = two_fields_one_file();
        let form = decode_buffer(payload.as_bytes(), BOUNDARY, &DecodeLimits::default()).unwrap();

        assert_eq!(form.fields().len(), 2);
        assert_eq!(form.fields().get("title").unwrap().as_text(), Some("hello world"));
        assert_eq!(form.fields().get("count").unwrap().as_text(), Some("42"));
        assert!(!form.fields().contains("upload"));

        assert_eq!(form.files().len(), 1);
        let file = form.files().get("upload").unwrap();
        assert_eq!(file.filename(), "notes.txt");
        assert_eq!(file.content_type(), Some("text/plain"));
        assert_eq!(&file.data()[..], b"line one\r\nline two");
    }

    #[test]
    fn test_boundary_extraction() {
        let extracted = boundary("multipart/form-data; boundary=----test-boundary").unwrap();
        assert_eq!(extracted, "----test-boundary");

        let quoted = boundary("multipart/form-data; boundary=\"quoted value\"").unwrap();
        assert_eq!(quoted, "quoted value");

        let missing = boundary("multipart/form-data");
        assert!(matches!(missing, Err(BodyDecodeError::MissingBoundary { .. })));

        let junk = boundary("not a mime type at all;;;");
        assert!(matches!(junk, Err(BodyDecodeError::MissingBoundary { .. })));
    }

    #[test]
    fn test_repeated_field_keeps_every_entry() {
        let payload = concat!(
            "--B\r\n",
            "Content-Disposition: form-data; name=\"tag\"\r\n",
            "\r\n",
            "first\r\n",
            "--B\r\n",
            "Content-Disposition: form-data; name=\"tag\"\r\n",
            "\r\n",
            "second\r\n",
            "--B--"
        );
        let form = decode_buffer(payload.as_bytes(), "B", &DecodeLimits::default()).unwrap();

        // lookup resolves to the last occurrence, iteration sees both
        assert_eq!(form.fields().get("tag").unwrap().as_text(), Some("second"));
        let all: Vec<_> = form.fields().get_all("tag").filter_map(FieldValue::as_text).collect();
        assert_eq!(all, ["first", "second"]);
    }

    #[test]
    fn test_empty_filename_is_still_a_file() {
        let payload = concat!(
            "--B\r\n",
            "Content-Disposition: form-data; name=\"upload\"; filename=\"\"\r\n",
            "\r\n",
            "\r\n",
            "--B--"
        );
        let form = decode_buffer(payload.as_bytes(), "B", &DecodeLimits::default()).unwrap();

        assert!(form.fields().is_empty());
        let file = form.files().get("upload").unwrap();
        assert_eq!(file.filename(), "");
        assert!(file.is_empty());
    }

    #[test]
    fn test_non_utf8_field_is_kept_as_bytes() {
        let mut payload = Vec::new();
        payload.extend_from_slice(b"--B\r\nContent-Disposition: form-data; name=\"raw\"\r\n\r\n");
        payload.extend_from_slice(&[0xff, 0xfe, 0x00, 0x01]);
        payload.extend_from_slice(b"\r\n--B--");

        let form = decode_buffer(&payload, "B", &DecodeLimits::default()).unwrap();
        let value = form.fields().get("raw").unwrap();
        assert_eq!(value.as_text(), None);
        assert_eq!(value.as_bytes(), [0xff, 0xfe, 0x00, 0x01]);
    }

    #[test]
    fn test_empty_form() {
        let form = decode_buffer(b"--B--\r\n", "B", &DecodeLimits::default()).unwrap();
        assert!(form.fields().is_empty());
        assert!(form.files().is_empty());
    }

    #[test]
    fn test_epilogue_ignored() {
        let payload = concat!(
            "--B\r\n",
            "Content-Disposition: form-data; name=\"a\"\r\n",
            "\r\n",
            "1\r\n",
            "--B--\r\n",
            "--B\r\n",
            "this is epilogue, not another part\r\n"
        );
        let form = decode_buffer(payload.as_bytes(), "B", &DecodeLimits::default()).unwrap();
        assert_eq!(form.fields().len(), 1);
    }

    #[test]
    fn test_max_parts_enforced() {
        let mut payload = String::new();
        for i in 0..3 {
            payload.push_str("--B\r\n");
            payload.push_str(&format!("Content-Disposition: form-data; name=\"f{i}\"\r\n\r\nv\r\n"));
        }
        payload.push_str("--B--");

        let limits = DecodeLimits::new().max_parts(2);
        let result = decode_buffer(payload.as_bytes(), "B", &limits);
        assert!(matches!(result, Err(BodyDecodeError::LimitExceeded { limit: "max_parts", max: 2 })));
    }

    #[test]
    fn test_max_part_bytes_enforced() {
        let mut payload = Vec::new();
        payload.extend_from_slice(b"--B\r\nContent-Disposition: form-data; name=\"big\"\r\n\r\n");
        payload.extend(vec![b'x'; 1024]);
        payload.extend_from_slice(b"\r\n--B--");

        let limits = DecodeLimits::new().max_part_bytes(100);
        let result = decode_buffer(&payload, "B", &limits);
        assert!(matches!(result, Err(BodyDecodeError::LimitExceeded { limit: "max_part_bytes", max: 100 })));
    }

    #[test]
    fn test_truncated_body() {
        let payload = concat!("--B\r\n", "Content-Disposition: form-data; name=\"a\"\r\n", "\r\n", "no closing");
        let result = decode_buffer(payload.as_bytes(), "B", &DecodeLimits::default());
        assert!(matches!(result, Err(BodyDecodeError::Truncated)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_decode_from_source() {
        let payload = two_fields_one_file();
        let mut source = ByteSource::from_bytes(payload);

        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
        let form = decode(&mut source, &content_type, &DecodeLimits::default()).await.unwrap();

        assert_eq!(form.fields().len(), 2);
        assert_eq!(form.files().len(), 1);
    }
}
