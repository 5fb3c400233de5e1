//! The request wrapper tying headers, parameters and body together.
//!
//! [`Request`] owns the request head as [`http::request::Parts`] and the
//! payload as a [`Body`]. The query string is decoded into a [`Bag`] up
//! front; cookies and headers can be viewed as bags on demand.

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri, Version};
use intake_body::{BoxError, ByteSource};

use crate::bag::Bag;
use crate::body::Body;

#[derive(Debug)]
pub struct Request {
    parts: Parts,
    query: Bag,
    body: Body,
}

impl Request {
    pub fn new(parts: Parts, body: Body) -> Self {
        let query = Bag::from_query(parts.uri.query().unwrap_or(""));
        Self { parts, query, body }
    }

    /// Wraps a full `http::Request`, deferring the body read until an
    /// accessor asks for it.
    pub fn from_http<B>(request: http::Request<B>) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, payload) = request.into_parts();
        let declared_len = content_length(&parts.headers);
        let content_type = header_str(&parts.headers, http::header::CONTENT_TYPE).map(str::to_owned);
        let source = ByteSource::from_body(payload, declared_len);
        Self::new(parts, Body::new(content_type, source))
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn version(&self) -> Version {
        self.parts.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// A single header value as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The decoded query string parameters.
    pub fn query(&self) -> &Bag {
        &self.query
    }

    /// The crumbs of the `Cookie` header; empty when the header is
    /// absent.
    pub fn cookies(&self) -> Bag {
        Bag::from_cookie_header(header_str(&self.parts.headers, http::header::COOKIE).unwrap_or(""))
    }

    /// All headers as a bag, names lowercase.
    pub fn header_bag(&self) -> Bag {
        Bag::from_headers(&self.parts.headers)
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn into_body(self) -> Body {
        self.body
    }
}

fn header_str(headers: &HeaderMap, name: http::header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    header_str(headers, http::header::CONTENT_LENGTH).and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use intake_schema::{Schema, int, object};

    fn form_request() -> Request {
        let request = http::Request::builder()
            .method("POST")
            .uri("http://localhost/users?page=2&sort=name&sort=age")
            .header("content-type", "application/x-www-form-urlencoded")
            .header("content-length", "15")
            .header("cookie", "session=abcd; theme=dark")
            .body(Full::new(Bytes::from_static(b"name=ada&age=36")))
            .unwrap();
        Request::from_http(request)
    }

    #[test]
    fn test_query_bag() {
        let request = form_request();

        assert!(request.query().has("page"));
        assert!(!request.query().has("missing"));
        assert_eq!(request.query().get("page").unwrap(), "2");
        // repeated parameter resolves to the last value
        assert_eq!(request.query().get("sort").unwrap(), "age");

        let err = request.query().get("missing").unwrap_err();
        assert_eq!(err.to_string(), "missing parameter `missing`");
    }

    #[test]
    fn test_query_schema_validation() {
        let request = form_request();
        let schema = Schema::new(object().field("page", int().min(1)));

        let value = request.query().parse(&schema).unwrap();
        assert_eq!(value["page"], 2);
    }

    #[test]
    fn test_uri_without_query() {
        let request = http::Request::builder()
            .uri("http://localhost/ping")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let request = Request::from_http(request);
        assert_eq!(request.path(), "/ping");
        assert!(request.query().is_empty());
    }

    #[test]
    fn test_cookies() {
        let request = form_request();
        let cookies = request.cookies();
        assert_eq!(cookies.get("session").unwrap(), "abcd");
        assert_eq!(cookies.get("theme").unwrap(), "dark");
        assert!(!cookies.has("other"));
    }

    #[test]
    fn test_header_access() {
        let request = form_request();
        assert_eq!(request.header("content-type"), Some("application/x-www-form-urlencoded"));
        assert_eq!(request.header("x-missing"), None);
        assert_eq!(request.header_bag().get("content-length").unwrap(), "15");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_body_reaches_the_fields() {
        let mut request = form_request();

        let fields = request.body_mut().fields().await.unwrap();
        assert_eq!(fields.get("name").unwrap().as_text(), Some("ada"));
        assert_eq!(fields.get("age").unwrap().as_text(), Some("36"));
        assert_eq!(request.body().size(), Some(15));
    }
}
