use std::io;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum BodyDecodeError {
    #[error("multipart boundary missing in content-type `{content_type}`")]
    MissingBoundary { content_type: String },

    #[error("malformed part: {reason}")]
    MalformedPart { reason: String },

    #[error("part header size exceed the limit {max_size}")]
    TooLargePartHeader { max_size: usize },

    #[error("body ended before the closing boundary")]
    Truncated,

    #[error("{limit} exceed the limit {max}")]
    LimitExceeded { limit: &'static str, max: usize },

    #[error("malformed urlencoded body: {reason}")]
    MalformedUrlencoded { reason: String },

    #[error("byte source already failed")]
    SourceFailed,

    #[error("read error: {source}")]
    Read { source: BoxError },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl BodyDecodeError {
    pub fn missing_boundary<S: ToString>(content_type: S) -> Self {
        Self::MissingBoundary { content_type: content_type.to_string() }
    }

    pub fn malformed_part<S: ToString>(str: S) -> Self {
        Self::MalformedPart { reason: str.to_string() }
    }

    pub fn too_large_part_header(max_size: usize) -> Self {
        Self::TooLargePartHeader { max_size }
    }

    pub fn limit_exceeded(limit: &'static str, max: usize) -> Self {
        Self::LimitExceeded { limit, max }
    }

    pub fn malformed_urlencoded<S: ToString>(str: S) -> Self {
        Self::MalformedUrlencoded { reason: str.to_string() }
    }

    pub fn read<E: Into<BoxError>>(e: E) -> Self {
        Self::Read { source: e.into() }
    }
}
