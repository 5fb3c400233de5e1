//! Decoder implementation for multipart bodies.
//!
//! This module decodes `multipart/form-data` payloads as specified in
//! [RFC 2046 Section 5.1](https://tools.ietf.org/html/rfc2046#section-5.1)
//! and [RFC 7578](https://tools.ietf.org/html/rfc7578).
//!
//! The payload is a series of parts separated by a boundary delimiter line.
//! Each part carries a small header block (`Content-Disposition` is
//! mandatory) followed by its payload; a delimiter line ending in `--`
//! closes the stream.

use bytes::{Buf, Bytes, BytesMut};
use memchr::memmem;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::error::BodyDecodeError;
use MultipartState::*;

/// Upper bound on headers within one part; parts carry two or three in
/// practice.
const MAX_PART_HEADERS: usize = 8;

/// A decoder for multipart bodies.
///
/// The decoder is a state machine over the incoming bytes and emits a
/// flat stream of [`PartEvent`]s:
/// - [`PartEvent::Headers`] opens a part
/// - [`PartEvent::Chunk`] carries part payload, zero-copy out of the
///   input buffer
/// - [`PartEvent::End`] closes the part
/// - [`PartEvent::Finished`] reports the closing delimiter
///
/// A candidate delimiter counts only at stream start or right after
/// CRLF, and only when followed by CRLF (another part) or `--` (close).
/// Anything else with the same bytes is part payload. The CRLF in front
/// of a delimiter belongs to the delimiter line, not to the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartDecoder {
    state: MultipartState,
    /// `--boundary`
    delimiter: Vec<u8>,
    /// `\r\n--boundary`
    needle: Vec<u8>,
    max_header_bytes: usize,
}

impl MultipartDecoder {
    pub fn new(boundary: &str, max_header_bytes: usize) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(boundary.as_bytes());

        let mut needle = Vec::with_capacity(delimiter.len() + 2);
        needle.extend_from_slice(b"\r\n");
        needle.extend_from_slice(&delimiter);

        Self { state: Preamble, delimiter, needle, max_header_bytes }
    }

    /// Scans for a structurally valid delimiter line.
    ///
    /// `allow_at_start` additionally accepts a delimiter at offset zero
    /// without a preceding CRLF, which is only legal before the first
    /// part.
    fn find_delimiter(&self, haystack: &[u8], allow_at_start: bool) -> Find {
        if allow_at_start && haystack.starts_with(&self.delimiter) {
            match classify(haystack, self.delimiter.len()) {
                Classified::Part => {
                    return Find::Found { data_end: 0, resume: self.delimiter.len() + 2, next: Following::Part }
                }
                Classified::Close => {
                    return Find::Found { data_end: 0, resume: self.delimiter.len() + 2, next: Following::Close }
                }
                Classified::Undecidable => return Find::Partial { data_end: 0 },
                Classified::False => {}
            }
        }

        for at in memmem::find_iter(haystack, &self.needle) {
            let delimiter_end = at + self.needle.len();
            match classify(haystack, delimiter_end) {
                Classified::Part => {
                    return Find::Found { data_end: at, resume: delimiter_end + 2, next: Following::Part }
                }
                Classified::Close => {
                    return Find::Found { data_end: at, resume: delimiter_end + 2, next: Following::Close }
                }
                Classified::Undecidable => return Find::Partial { data_end: at },
                Classified::False => {}
            }
        }

        Find::Absent
    }

    /// Bytes to hold back when no delimiter is in sight: the tail could
    /// still be the front of one.
    fn keep_back(&self) -> usize {
        self.needle.len() + 2
    }
}

/// Header block of one decoded part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartHeaders {
    /// The `name` parameter of `Content-Disposition`.
    pub name: String,
    /// The `filename` parameter, kept even when empty. Its presence is
    /// what makes the part a file.
    pub filename: Option<String>,
    /// The part's own `Content-Type` header, verbatim.
    pub content_type: Option<String>,
}

/// One step of decoded multipart structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartEvent {
    /// Header block of the next part.
    Headers(PartHeaders),
    /// Payload bytes of the current part.
    Chunk(Bytes),
    /// The current part is complete.
    End,
    /// The closing delimiter was read; no further parts follow.
    Finished,
}

impl PartEvent {
    pub fn as_chunk(&self) -> Option<&Bytes> {
        match self {
            PartEvent::Chunk(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, PartEvent::Finished)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MultipartState {
    /// Skip bytes until the first delimiter line.
    Preamble,
    /// Read a part's header block.
    Headers,
    /// Stream part payload until the next delimiter line.
    Payload,
    /// A delimiter just closed a part; `finish` marks the closing form.
    PartClosed { finish: bool },
    /// The closing delimiter was consumed; report it once.
    Closing,
    /// Everything after the closing delimiter is epilogue and dropped.
    Done,
}

/// What a scan for a delimiter produced.
enum Find {
    /// A valid delimiter line: payload ends at `data_end`, decoding
    /// resumes at `resume`.
    Found { data_end: usize, resume: usize, next: Following },
    /// A candidate starts at `data_end` but its tail is not buffered
    /// yet.
    Partial { data_end: usize },
    Absent,
}

enum Following {
    /// Another part follows the delimiter.
    Part,
    /// The stream is closed (`--` suffix).
    Close,
}

enum Classified {
    Part,
    Close,
    /// Not enough bytes after the candidate to judge it.
    Undecidable,
    /// Same bytes, but not a delimiter line; treat as payload.
    False,
}

/// A candidate is real only when followed by CRLF or `--`.
fn classify(haystack: &[u8], delimiter_end: usize) -> Classified {
    if haystack.len() < delimiter_end + 2 {
        return Classified::Undecidable;
    }
    match &haystack[delimiter_end..delimiter_end + 2] {
        b"\r\n" => Classified::Part,
        b"--" => Classified::Close,
        _ => Classified::False,
    }
}

impl Decoder for MultipartDecoder {
    type Item = PartEvent;
    type Error = BodyDecodeError;

    /// Decodes the next structural event from the input buffer.
    ///
    /// # Returns
    /// - `Ok(Some(event))` when a part boundary, header block or payload
    ///   chunk was decoded
    /// - `Ok(None)` when more data is needed
    /// - `Err(BodyDecodeError)` if the multipart framing is invalid
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                Preamble => match self.find_delimiter(src, true) {
                    Find::Found { data_end: _, resume, next } => {
                        src.advance(resume);
                        self.state = match next {
                            Following::Part => Headers,
                            Following::Close => Closing,
                        };
                    }
                    Find::Partial { data_end } => {
                        src.advance(data_end);
                        return Ok(None);
                    }
                    Find::Absent => {
                        let keep = self.keep_back();
                        if src.len() > keep {
                            src.advance(src.len() - keep);
                        }
                        return Ok(None);
                    }
                },

                Headers => {
                    // a part with no headers at all has no place to carry
                    // its content-disposition
                    if src.starts_with(b"\r\n") {
                        return Err(BodyDecodeError::malformed_part("missing content-disposition header"));
                    }
                    match memmem::find(src, b"\r\n\r\n") {
                        Some(end) => {
                            ensure!(
                                end + 4 <= self.max_header_bytes,
                                BodyDecodeError::too_large_part_header(self.max_header_bytes)
                            );
                            let block = src.split_to(end + 4);
                            let headers = parse_part_headers(&block)?;
                            self.state = Payload;
                            return Ok(Some(PartEvent::Headers(headers)));
                        }
                        None => {
                            ensure!(
                                src.len() <= self.max_header_bytes,
                                BodyDecodeError::too_large_part_header(self.max_header_bytes)
                            );
                            return Ok(None);
                        }
                    }
                }

                Payload => match self.find_delimiter(src, false) {
                    Find::Found { data_end, resume, next } => {
                        let chunk = src.split_to(data_end).freeze();
                        src.advance(resume - data_end);
                        self.state = PartClosed { finish: matches!(next, Following::Close) };
                        if !chunk.is_empty() {
                            trace!(len = chunk.len(), "read part bytes");
                            return Ok(Some(PartEvent::Chunk(chunk)));
                        }
                    }
                    Find::Partial { data_end } => {
                        if data_end > 0 {
                            let chunk = src.split_to(data_end).freeze();
                            return Ok(Some(PartEvent::Chunk(chunk)));
                        }
                        return Ok(None);
                    }
                    Find::Absent => {
                        let keep = self.keep_back();
                        if src.len() > keep {
                            let chunk = src.split_to(src.len() - keep).freeze();
                            trace!(len = chunk.len(), "read part bytes");
                            return Ok(Some(PartEvent::Chunk(chunk)));
                        }
                        return Ok(None);
                    }
                },

                PartClosed { finish } => {
                    self.state = if finish { Closing } else { Headers };
                    return Ok(Some(PartEvent::End));
                }

                Closing => {
                    trace!("finished reading multipart body");
                    self.state = Done;
                    return Ok(Some(PartEvent::Finished));
                }

                Done => {
                    src.clear();
                    return Ok(None);
                }
            }
        }
    }

    /// At end of input anything short of the closing delimiter is a
    /// truncated body.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(event) = self.decode(src)? {
            return Ok(Some(event));
        }
        match self.state {
            Done => Ok(None),
            _ => Err(BodyDecodeError::Truncated),
        }
    }
}

fn parse_part_headers(block: &[u8]) -> Result<PartHeaders, BodyDecodeError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_PART_HEADERS];
    let parsed = match httparse::parse_headers(block, &mut headers) {
        Ok(httparse::Status::Complete((_, parsed))) => parsed,
        Ok(httparse::Status::Partial) => return Err(BodyDecodeError::malformed_part("incomplete part header block")),
        Err(e) => return Err(BodyDecodeError::malformed_part(e)),
    };

    let mut disposition = None;
    let mut content_type = None;
    for header in parsed {
        if header.name.eq_ignore_ascii_case("content-disposition") {
            disposition = Some(header.value);
        } else if header.name.eq_ignore_ascii_case("content-type") {
            content_type = Some(header.value);
        }
    }

    let disposition = disposition.ok_or_else(|| BodyDecodeError::malformed_part("missing content-disposition header"))?;
    let disposition = std::str::from_utf8(disposition).map_err(BodyDecodeError::malformed_part)?;
    let (name, filename) = parse_disposition(disposition)?;

    let content_type = match content_type {
        Some(value) => Some(std::str::from_utf8(value).map_err(BodyDecodeError::malformed_part)?.to_owned()),
        None => None,
    };

    Ok(PartHeaders { name, filename, content_type })
}

/// Parses `form-data; name="a"; filename="b.txt"`. Parameter names match
/// case-insensitively; values may be double-quoted.
fn parse_disposition(value: &str) -> Result<(String, Option<String>), BodyDecodeError> {
    let mut segments = value.split(';');
    let disposition_type = segments.next().unwrap_or("").trim();
    ensure!(
        disposition_type.eq_ignore_ascii_case("form-data"),
        BodyDecodeError::malformed_part(format!("unsupported content-disposition `{disposition_type}`"))
    );

    let mut name = None;
    let mut filename = None;
    for segment in segments {
        let Some((key, raw)) = segment.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = unquote(raw.trim());
        if key.eq_ignore_ascii_case("name") {
            name = Some(value.to_owned());
        } else if key.eq_ignore_ascii_case("filename") {
            filename = Some(value.to_owned());
        }
    }

    let name = name.ok_or_else(|| BodyDecodeError::malformed_part("content-disposition without a name parameter"))?;
    Ok((name, filename))
}

fn unquote(value: &str) -> &str {
    value.strip_prefix('"').and_then(|inner| inner.strip_suffix('"')).unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_events(payload: &[u8], boundary: &str) -> Vec<PartEvent> {
        let mut decoder = MultipartDecoder::new(boundary, 8 * 1024);
        let mut buffer = BytesMut::from(payload);
        let mut events = Vec::new();
        while let Some(event) = decoder.decode(&mut buffer).unwrap() {
            events.push(event);
        }
        while let Some(event) = decoder.decode_eof(&mut buffer).unwrap() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_basic() {
        let payload = concat!(
            "--B\r\n",
            "Content-Disposition: form-data; name=\"greeting\"\r\n",
            "\r\n",
            "hello\r\n",
            "--B--"
        );
        let events = drain_events(payload.as_bytes(), "B");

        assert_eq!(events.len(), 4);
        let PartEvent::Headers(headers) = &events[0] else {
            panic!("expected headers");
        };
        assert_eq!(headers.name, "greeting");
        assert_eq!(headers.filename, None);
        assert_eq!(&events[1].as_chunk().unwrap()[..], b"hello");
        assert_eq!(events[2], PartEvent::End);
        assert!(events[3].is_finished());
    }

    #[test]
    fn test_file_part_with_content_type() {
        let payload = concat!(
            "--B\r\n",
            "Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "file body\r\n",
            "--B--\r\n"
        );
        let events = drain_events(payload.as_bytes(), "B");

        let PartEvent::Headers(headers) = &events[0] else {
            panic!("expected headers");
        };
        assert_eq!(headers.name, "upload");
        assert_eq!(headers.filename.as_deref(), Some("a.txt"));
        assert_eq!(headers.content_type.as_deref(), Some("text/plain"));
        assert_eq!(&events[1].as_chunk().unwrap()[..], b"file body");
    }

    #[test]
    fn test_preamble_and_epilogue_are_ignored() {
        let payload = concat!(
            "this is a preamble\r\n",
            "--B\r\n",
            "Content-Disposition: form-data; name=\"a\"\r\n",
            "\r\n",
            "1\r\n",
            "--B--\r\n",
            "trailing epilogue"
        );
        let events = drain_events(payload.as_bytes(), "B");
        assert_eq!(events.len(), 4);
        assert_eq!(&events[1].as_chunk().unwrap()[..], b"1");
    }

    #[test]
    fn test_boundary_prefix_inside_payload_is_data() {
        // payload contains the delimiter bytes, but not followed by
        // CRLF or --, so it stays payload
        let payload = concat!(
            "--B\r\n",
            "Content-Disposition: form-data; name=\"a\"\r\n",
            "\r\n",
            "data \r\n--BX more\r\n",
            "--B--"
        );
        let events = drain_events(payload.as_bytes(), "B");

        let mut data = Vec::new();
        for event in &events {
            if let Some(chunk) = event.as_chunk() {
                data.extend_from_slice(chunk);
            }
        }
        assert_eq!(data, b"data \r\n--BX more");
    }

    #[test]
    fn test_empty_part_payload() {
        let payload = concat!(
            "--B\r\n",
            "Content-Disposition: form-data; name=\"empty\"\r\n",
            "\r\n",
            "\r\n",
            "--B--"
        );
        let events = drain_events(payload.as_bytes(), "B");
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], PartEvent::Headers(_)));
        assert_eq!(events[1], PartEvent::End);
        assert!(events[2].is_finished());
    }

    #[test]
    fn test_zero_parts() {
        let events = drain_events(b"--B--\r\n", "B");
        assert_eq!(events, [PartEvent::Finished]);
    }

    #[test]
    fn test_incremental_feeding() {
        let payload: &[u8] = concat!(
            "--B\r\n",
            "Content-Disposition: form-data; name=\"a\"\r\n",
            "\r\n",
            "0123456789\r\n",
            "--B--"
        )
        .as_bytes();

        let mut decoder = MultipartDecoder::new("B", 8 * 1024);
        let mut buffer = BytesMut::new();
        let mut events = Vec::new();

        for chunk in payload.chunks(7) {
            buffer.extend_from_slice(chunk);
            while let Some(event) = decoder.decode(&mut buffer).unwrap() {
                events.push(event);
            }
        }
        while let Some(event) = decoder.decode_eof(&mut buffer).unwrap() {
            events.push(event);
        }

        assert!(matches!(events.first(), Some(PartEvent::Headers(_))));
        assert!(events.last().unwrap().is_finished());

        let mut data = Vec::new();
        for event in &events {
            if let Some(chunk) = event.as_chunk() {
                data.extend_from_slice(chunk);
            }
        }
        assert_eq!(data, b"0123456789");
    }

    #[test]
    fn test_missing_closing_delimiter() {
        let payload = concat!(
            "--B\r\n",
            "Content-Disposition: form-data; name=\"a\"\r\n",
            "\r\n",
            "data without end"
        );
        let mut decoder = MultipartDecoder::new("B", 8 * 1024);
        let mut buffer = BytesMut::from(payload.as_bytes());

        while let Some(_event) = decoder.decode(&mut buffer).unwrap() {}
        let result = decoder.decode_eof(&mut buffer);
        assert!(matches!(result, Err(BodyDecodeError::Truncated)));
    }

    #[test]
    fn test_missing_disposition_is_rejected() {
        let payload = concat!("--B\r\n", "Content-Type: text/plain\r\n", "\r\n", "x\r\n", "--B--");
        let mut decoder = MultipartDecoder::new("B", 8 * 1024);
        let mut buffer = BytesMut::from(payload.as_bytes());

        let result = decoder.decode(&mut buffer);
        assert!(matches!(result, Err(BodyDecodeError::MalformedPart { .. })));
    }

    #[test]
    fn test_oversized_part_header_is_rejected() {
        let mut payload = Vec::new();
        payload.extend_from_slice(b"--B\r\nContent-Disposition: form-data; name=\"a\"\r\nX-Filler: ");
        payload.extend(vec![b'y'; 256]);
        payload.extend_from_slice(b"\r\n\r\ndata\r\n--B--");

        let mut decoder = MultipartDecoder::new("B", 64);
        let mut buffer = BytesMut::from(&payload[..]);

        let result = decoder.decode(&mut buffer);
        assert!(matches!(result, Err(BodyDecodeError::TooLargePartHeader { max_size: 64 })));
    }

    #[test]
    fn test_unquoted_disposition_parameters() {
        let payload = concat!("--B\r\n", "Content-Disposition: form-data; name=plain\r\n", "\r\n", "v\r\n", "--B--");
        let events = drain_events(payload.as_bytes(), "B");
        let PartEvent::Headers(headers) = &events[0] else {
            panic!("expected headers");
        };
        assert_eq!(headers.name, "plain");
    }

    #[test]
    fn test_empty_filename_is_kept() {
        let payload = concat!(
            "--B\r\n",
            "Content-Disposition: form-data; name=\"upload\"; filename=\"\"\r\n",
            "\r\n",
            "\r\n",
            "--B--"
        );
        let events = drain_events(payload.as_bytes(), "B");
        let PartEvent::Headers(headers) = &events[0] else {
            panic!("expected headers");
        };
        assert_eq!(headers.filename.as_deref(), Some(""));
    }
}
