use intake_body::BodyDecodeError;
use intake_schema::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BodyError {
    #[error(transparent)]
    Decode(#[from] BodyDecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed json body: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("text body is not utf8")]
    NotUtf8,

    #[error("expected {expected}, got {got}")]
    WrongKind { expected: &'static str, got: &'static str },

    #[error("unsupported media type `{content_type}`")]
    UnsupportedMediaType { content_type: String },

    #[error("missing parameter `{name}`")]
    MissingParam { name: String },
}

impl BodyError {
    pub fn wrong_kind(expected: &'static str, got: &'static str) -> Self {
        Self::WrongKind { expected, got }
    }

    pub fn unsupported_media_type<S: ToString>(content_type: S) -> Self {
        Self::UnsupportedMediaType { content_type: content_type.to_string() }
    }

    pub fn missing_param<S: ToString>(name: S) -> Self {
        Self::MissingParam { name: name.to_string() }
    }
}
