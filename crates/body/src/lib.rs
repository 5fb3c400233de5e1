//! Request body decoding for form and binary payloads
//!
//! This crate turns raw request body bytes into structured data. It decodes
//! `multipart/form-data` and `application/x-www-form-urlencoded` payloads
//! into ordered field tables and file parts, and wraps opaque payloads in a
//! binary view with cheap, non-destructive inspection.
//!
//! # Features
//!
//! - Incremental `multipart/form-data` decoding (RFC 2046 / RFC 7578)
//! - Fields and uploaded files split by `filename` presence
//! - `application/x-www-form-urlencoded` decoding in wire order
//! - Buffered source abstraction over `http_body::Body` streams
//! - Size caps for bodies, parts, part headers and field counts
//! - Zero-copy part payloads via `bytes`
//!
//! # Example
//!
//! ```
//! use intake_body::DecodeLimits;
//! use intake_body::multipart;
//!
//! let payload = concat!(
//!     "--form-boundary\r\n",
//!     "Content-Disposition: form-data; name=\"title\"\r\n",
//!     "\r\n",
//!     "hello\r\n",
//!     "--form-boundary\r\n",
//!     "Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\n",
//!     "Content-Type: text/plain\r\n",
//!     "\r\n",
//!     "file contents\r\n",
//!     "--form-boundary--\r\n"
//! );
//!
//! let form = multipart::decode_buffer(payload.as_bytes(), "form-boundary", &DecodeLimits::default()).unwrap();
//!
//! assert_eq!(form.fields().get("title").unwrap().as_text(), Some("hello"));
//! assert_eq!(form.files().get("upload").unwrap().filename(), "a.txt");
//! ```
//!
//! # Architecture
//!
//! - [`ByteSource`]: buffers a byte stream once and serves it repeatedly
//! - [`BinaryBody`]: non-destructive view over an opaque payload
//! - [`multipart`]: the multipart decoder state machine and its driver
//! - [`decode_urlencoded`]: urlencoded pairs into a [`Fields`] table
//! - [`FormData`]: decoded fields plus uploaded files
//! - [`DecodeLimits`]: size caps applied while decoding
//!
//! # Field semantics
//!
//! [`Fields`] keeps every decoded entry in wire order. Lookup by name
//! resolves repeated keys to the last occurrence; iteration and
//! [`Fields::get_all`] still see every entry. A multipart part counts as a
//! file exactly when its `Content-Disposition` carries a `filename`
//! parameter, even an empty one.
//!
//! # Limitations
//!
//! - Bodies are decoded fully in memory, capped by
//!   [`DecodeLimits::get_max_body_bytes`]; there is no disk spooling
//! - Nested `multipart/mixed` parts are not decoded
//! - Multipart framing requires CRLF line endings

pub mod multipart;

mod binary;
mod error;
mod form;
mod limits;
mod source;
mod urlencoded;

mod utils;
pub(crate) use utils::ensure;

pub use binary::BinaryBody;
pub use error::{BodyDecodeError, BoxError};
pub use form::{FieldValue, Fields, FilePart, Files, FormData, PartReader};
pub use limits::DecodeLimits;
pub use source::ByteSource;
pub use urlencoded::decode_urlencoded;
