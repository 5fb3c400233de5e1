//! Named string parameters from the request surface.
//!
//! A [`Bag`] holds the decoded key/value pairs of one parameter source:
//! the query string, the header map or the `Cookie` header. Lookups
//! resolve repeated names to the last occurrence, and the whole bag can
//! be checked against a schema just like a form body.

use http::HeaderMap;
use intake_schema::{Input, Schema};
use serde_json::Value;
use tracing::debug;

use crate::error::BodyError;

/// An ordered table of named string parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bag {
    entries: Vec<(String, String)>,
}

impl Bag {
    /// Decodes a query string (without the leading `?`).
    ///
    /// An undecodable query yields an empty bag rather than failing
    /// request construction; its parameters then read as missing.
    pub fn from_query(query: &str) -> Self {
        let entries = match serde_urlencoded::from_str(query) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(cause = %e, "undecodable query string");
                Vec::new()
            }
        };
        Self { entries }
    }

    /// Collects the header map, one entry per header value.
    ///
    /// Names are kept lowercase; values that are not valid UTF-8 are
    /// skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut entries = Vec::with_capacity(headers.len());
        for (name, value) in headers {
            match value.to_str() {
                Ok(text) => entries.push((name.as_str().to_owned(), text.to_owned())),
                Err(e) => debug!(header = name.as_str(), cause = %e, "skipping non-utf8 header value"),
            }
        }
        Self { entries }
    }

    /// Splits a `Cookie` header into its crumbs.
    ///
    /// Crumbs without `=` are skipped.
    pub fn from_cookie_header(header: &str) -> Self {
        let mut entries = Vec::new();
        for crumb in header.split(';') {
            let Some((name, value)) = crumb.split_once('=') else {
                continue;
            };
            entries.push((name.trim().to_owned(), value.trim().to_owned()));
        }
        Self { entries }
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Looks up a parameter, resolving repeated names to the last
    /// occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::MissingParam`] if the parameter is absent.
    pub fn get(&self, name: &str) -> Result<&str, BodyError> {
        self.try_get(name).ok_or_else(|| BodyError::missing_param(name))
    }

    pub fn try_get(&self, name: &str) -> Option<&str> {
        self.entries.iter().rfind(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validates the bag against a schema, coercing the string values.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::Validation`] carrying every violation.
    pub fn parse(&self, schema: &Schema) -> Result<Value, BodyError> {
        Ok(schema.parse(self.to_input())?)
    }

    /// Like [`Bag::parse`], but unknown parameters are violations too.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::Validation`] carrying every violation.
    pub fn parse_strict(&self, schema: &Schema) -> Result<Value, BodyError> {
        Ok(schema.parse_strict(self.to_input())?)
    }

    fn to_input(&self) -> Input {
        let pairs = self.entries.iter().map(|(name, value)| (name.clone(), Input::from(value.as_str()))).collect();
        Input::Map(pairs)
    }
}
