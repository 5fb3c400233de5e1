//! Typed access to a request body.
//!
//! [`Body`] wraps a [`ByteSource`] together with the request's content
//! type and decodes on first access: [`Body::binary`] for opaque
//! payloads, [`Body::fields`] and [`Body::files`] for form bodies,
//! [`Body::json`] and [`Body::text`] for the rest. The decoded value is
//! cached, so repeated access and schema validation reuse one decode
//! pass; [`Body::decode_count`] exposes how many passes actually ran.

use bytes::Bytes;
use intake_body::{
    BinaryBody, ByteSource, DecodeLimits, Fields, Files, FormData, decode_urlencoded, multipart,
};
use intake_schema::{Input, Schema};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::BodyError;

/// How a body will be decoded, derived from its content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// `application/octet-stream`
    Binary,
    /// `application/x-www-form-urlencoded` or `multipart/form-data`
    Form,
    /// `application/json` or any `+json` suffix
    Json,
    /// `text/*`
    Text,
    /// No content type at all.
    None,
    /// A content type this crate does not decode.
    Unsupported,
}

impl BodyKind {
    pub fn name(self) -> &'static str {
        match self {
            BodyKind::Binary => "binary",
            BodyKind::Form => "form",
            BodyKind::Json => "json",
            BodyKind::Text => "text",
            BodyKind::None => "nothing",
            BodyKind::Unsupported => "unsupported",
        }
    }
}

fn classify(content_type: Option<&str>) -> BodyKind {
    let Some(content_type) = content_type else {
        return BodyKind::None;
    };
    let Ok(mime) = content_type.parse::<mime::Mime>() else {
        return BodyKind::Unsupported;
    };
    if mime.type_() == mime::APPLICATION && mime.subtype() == mime::OCTET_STREAM {
        BodyKind::Binary
    } else if mime.type_() == mime::APPLICATION && mime.subtype() == mime::WWW_FORM_URLENCODED {
        BodyKind::Form
    } else if mime.type_() == mime::MULTIPART && mime.subtype() == mime::FORM_DATA {
        BodyKind::Form
    } else if mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON) {
        BodyKind::Json
    } else if mime.type_() == mime::TEXT {
        BodyKind::Text
    } else {
        BodyKind::Unsupported
    }
}

#[derive(Debug)]
enum Cache {
    Empty,
    Binary(BinaryBody),
    Form(FormData),
    Json(Value),
    Text(String),
}

/// A request body that decodes itself at most once.
#[derive(Debug)]
pub struct Body {
    source: ByteSource,
    content_type: Option<String>,
    kind: BodyKind,
    limits: DecodeLimits,
    cache: Cache,
    decodes: usize,
}

impl Body {
    pub fn new(content_type: Option<String>, source: ByteSource) -> Self {
        let kind = classify(content_type.as_deref());
        Self { source, content_type, kind, limits: DecodeLimits::default(), cache: Cache::Empty, decodes: 0 }
    }

    pub fn from_bytes(content_type: Option<&str>, payload: impl Into<Bytes>) -> Self {
        Self::new(content_type.map(str::to_owned), ByteSource::from_bytes(payload))
    }

    pub fn empty() -> Self {
        Self::new(None, ByteSource::empty())
    }

    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Observed payload size, available once the body has been read.
    pub fn size(&self) -> Option<usize> {
        self.source.size()
    }

    /// Number of decode passes performed so far. Stays at one however
    /// often the accessors run.
    pub fn decode_count(&self) -> usize {
        self.decodes
    }

    /// The payload of an `application/octet-stream` body.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::WrongKind`] for any other content type, or a
    /// decode error if reading the source fails.
    pub async fn binary(&mut self) -> Result<&BinaryBody, BodyError> {
        self.ensure_kind(BodyKind::Binary)?;
        if matches!(self.cache, Cache::Empty) {
            let payload = self.read_payload().await?;
            self.cache = Cache::Binary(BinaryBody::new(payload, self.content_type.clone()));
        }
        let Cache::Binary(binary) = &self.cache else {
            return Err(BodyError::wrong_kind("binary", self.kind.name()));
        };
        Ok(binary)
    }

    /// The field table of a form body, urlencoded or multipart.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::WrongKind`] for non-form content types, or a
    /// decode error if the payload is malformed.
    pub async fn fields(&mut self) -> Result<&Fields, BodyError> {
        Ok(self.form().await?.fields())
    }

    /// The uploaded files of a form body. Empty for urlencoded bodies.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::WrongKind`] for non-form content types, or a
    /// decode error if the payload is malformed.
    pub async fn files(&mut self) -> Result<&Files, BodyError> {
        Ok(self.form().await?.files())
    }

    pub async fn form(&mut self) -> Result<&FormData, BodyError> {
        self.ensure_kind(BodyKind::Form)?;
        if matches!(self.cache, Cache::Empty) {
            let form = self.decode_form().await?;
            self.cache = Cache::Form(form);
        }
        let Cache::Form(form) = &self.cache else {
            return Err(BodyError::wrong_kind("form", self.kind.name()));
        };
        Ok(form)
    }

    /// The decoded value of a json body.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::WrongKind`] for other content types or
    /// [`BodyError::Json`] if the payload is not valid json.
    pub async fn json(&mut self) -> Result<&Value, BodyError> {
        self.ensure_kind(BodyKind::Json)?;
        if matches!(self.cache, Cache::Empty) {
            let payload = self.read_payload().await?;
            let value = serde_json::from_slice(&payload)?;
            self.cache = Cache::Json(value);
        }
        let Cache::Json(value) = &self.cache else {
            return Err(BodyError::wrong_kind("json", self.kind.name()));
        };
        Ok(value)
    }

    /// The payload of a `text/*` body.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::WrongKind`] for other content types or
    /// [`BodyError::NotUtf8`] if the payload is not UTF-8.
    pub async fn text(&mut self) -> Result<&str, BodyError> {
        self.ensure_kind(BodyKind::Text)?;
        if matches!(self.cache, Cache::Empty) {
            let payload = self.read_payload().await?;
            let text = match String::from_utf8(payload.into()) {
                Ok(text) => text,
                Err(_) => return Err(BodyError::NotUtf8),
            };
            self.cache = Cache::Text(text);
        }
        let Cache::Text(text) = &self.cache else {
            return Err(BodyError::wrong_kind("text", self.kind.name()));
        };
        Ok(text)
    }

    /// Validates the body against a schema, reusing the cached decode.
    ///
    /// Form fields enter validation as strings and rely on the schema's
    /// coercion; json values keep their types.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::Validation`] carrying every violation, or a
    /// decode error if the body could not be decoded at all.
    pub async fn parse(&mut self, schema: &Schema) -> Result<Value, BodyError> {
        let input = self.input().await?;
        Ok(schema.parse(input)?)
    }

    /// Like [`Body::parse`], but unknown keys are violations too.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::Validation`] carrying every violation, or a
    /// decode error if the body could not be decoded at all.
    pub async fn parse_strict(&mut self, schema: &Schema) -> Result<Value, BodyError> {
        let input = self.input().await?;
        Ok(schema.parse_strict(input)?)
    }

    async fn input(&mut self) -> Result<Input, BodyError> {
        match self.kind {
            BodyKind::Form => {
                let form = self.form().await?;
                Ok(fields_input(form.fields()))
            }
            BodyKind::Json => {
                let value = self.json().await?;
                Ok(Input::from(value.clone()))
            }
            BodyKind::Text => {
                let text = self.text().await?;
                Ok(Input::from(text))
            }
            BodyKind::Binary | BodyKind::None => Err(BodyError::wrong_kind("form, json or text", self.kind.name())),
            BodyKind::Unsupported => {
                Err(BodyError::unsupported_media_type(self.content_type.clone().unwrap_or_default()))
            }
        }
    }

    fn ensure_kind(&self, expected: BodyKind) -> Result<(), BodyError> {
        if self.kind == expected {
            return Ok(());
        }
        if self.kind == BodyKind::Unsupported {
            return Err(BodyError::unsupported_media_type(self.content_type.clone().unwrap_or_default()));
        }
        Err(BodyError::wrong_kind(expected.name(), self.kind.name()))
    }

    async fn decode_form(&mut self) -> Result<FormData, BodyError> {
        let Some(content_type) = self.content_type.clone() else {
            return Err(BodyError::wrong_kind("form", BodyKind::None.name()));
        };
        self.decodes += 1;
        debug!(content_type = %content_type, "decoding form body");
        let decoded = if content_type.trim_start().to_ascii_lowercase().starts_with("multipart/") {
            multipart::decode(&mut self.source, &content_type, &self.limits).await
        } else {
            match self.source.read_all(self.limits.get_max_body_bytes()).await {
                Ok(payload) => decode_urlencoded(payload, &self.limits).map(FormData::from),
                Err(e) => Err(e),
            }
        };
        match decoded {
            Ok(form) => Ok(form),
            Err(e) => {
                error!(cause = %e, "failed to decode form body");
                Err(e.into())
            }
        }
    }

    async fn read_payload(&mut self) -> Result<Bytes, BodyError> {
        self.decodes += 1;
        debug!(kind = self.kind.name(), "decoding request body");
        match self.source.read_all(self.limits.get_max_body_bytes()).await {
            Ok(payload) => Ok(payload.clone()),
            Err(e) => {
                error!(cause = %e, "failed to read request body");
                Err(e.into())
            }
        }
    }
}

/// Form fields as validation input, every entry in wire order. Rare
/// non-UTF-8 field payloads enter lossily.
fn fields_input(fields: &Fields) -> Input {
    let pairs = fields
        .iter()
        .map(|(name, value)| {
            let text = match value.as_text() {
                Some(text) => text.to_owned(),
                None => String::from_utf8_lossy(value.as_bytes()).into_owned(),
            };
            (name.to_owned(), Input::from(text))
        })
        .collect();
    Input::Map(pairs)
}
