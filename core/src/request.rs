//! Per-request facts
//!
//! `RequestFacts` is derived once from the inbound request: URL
//! decomposition, query, cookies and headers are computed up front, the
//! body is parsed lazily on first access and at most once.

use crate::cookie::parse_cookies;
use crate::headers::Headers;
use crate::method::{Method, UnsupportedMethod};
use crate::params::Params;
use crate::query::Query;
use ahash::AHashMap;
use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use tokio::sync::OnceCell;
use url::Url;

/// Immutable snapshot of an inbound request
#[derive(Debug)]
pub struct RequestFacts {
    method: Method,
    url: Url,
    host: String,
    subdomains: Vec<String>,
    hash: String,
    search: String,
    query: Query,
    params: Params,
    headers: Headers,
    cookies: AHashMap<String, String>,
    body: Bytes,
    parsed_body: OnceCell<Option<ParsedBody>>,
}

impl RequestFacts {
    /// Build facts from an absolute URL
    pub fn new(method: Method, url: &str, headers: Headers, body: Bytes) -> Result<Self, RequestError> {
        let url = Url::parse(url).map_err(|e| RequestError::InvalidUrl(format!("{}: {}", url, e)))?;

        let hostname = url.host_str().unwrap_or_default();
        let host = match url.port() {
            Some(port) => format!("{}:{}", hostname, port),
            None => hostname.to_string(),
        };
        let subdomains = hostname.split('.').rev().skip(2).map(str::to_string).collect();

        let hash = match url.fragment() {
            Some(fragment) if !fragment.is_empty() => format!("#{}", fragment),
            _ => String::new(),
        };
        let search = match url.query() {
            Some(query) if !query.is_empty() => format!("?{}", query),
            _ => String::new(),
        };
        let query = Query::from_pairs(url.query_pairs());
        let cookies = parse_cookies(headers.get("cookie"));

        Ok(Self {
            method,
            url,
            host,
            subdomains,
            hash,
            search,
            query,
            params: Params::new(),
            headers,
            cookies,
            body,
            parsed_body: OnceCell::new(),
        })
    }

    /// Build facts from a host-supplied `http::Request`
    ///
    /// Origin-form URIs (`/path?query`) are made absolute from the `Host`
    /// header; the scheme is `https` when `X-Forwarded-Proto` says so.
    pub fn from_http(request: http::Request<Bytes>) -> Result<Self, RequestError> {
        let (parts, body) = request.into_parts();
        let method = Method::try_from(&parts.method)?;
        let headers = Headers::from(&parts.headers);

        let href = if parts.uri.scheme().is_some() && parts.uri.authority().is_some() {
            parts.uri.to_string()
        } else {
            let host = headers.get("host").ok_or(RequestError::MissingHost)?;
            let scheme = match headers.get("x-forwarded-proto") {
                Some(proto) if proto.trim().eq_ignore_ascii_case("https") => "https",
                _ => "http",
            };
            let target = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
            format!("{}://{}{}", scheme, host, target)
        };

        Self::new(method, &href, headers, body)
    }

    /// Get HTTP method
    #[inline]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Full serialized URL
    #[inline]
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Scheme without the trailing `:`
    #[inline]
    pub fn protocol(&self) -> &str {
        self.url.scheme()
    }

    /// Host including any explicit port
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host without port
    #[inline]
    pub fn hostname(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Hostname labels, reversed, minus the two registrable labels
    ///
    /// `a.b.example.com` yields `["b", "a"]`.
    pub fn subdomains(&self) -> &[String] {
        &self.subdomains
    }

    /// Request path
    #[inline]
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Fragment including the leading `#`, or empty
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Query string including the leading `?`, or empty
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Query string without the leading `?`
    pub fn querystring(&self) -> &str {
        self.search.strip_prefix('?').unwrap_or_default()
    }

    /// Decoded query
    #[inline]
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// First query value for `name`
    #[inline]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query.get_first(name)
    }

    /// Route parameters bound by the dispatcher
    #[inline]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Get route parameter by name
    #[inline]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Bind matched path parameters before handlers run
    #[doc(hidden)]
    pub fn bind_params(&mut self, params: Params) {
        self.params = params;
    }

    #[inline]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get header value by name (case-insensitive)
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn cookies(&self) -> &AHashMap<String, String> {
        &self.cookies
    }

    /// Get cookie value by name
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Get content type
    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// Unparsed request body
    #[inline]
    pub fn raw_body(&self) -> &Bytes {
        &self.body
    }

    /// Get request body as string (if valid UTF-8)
    pub fn body_string(&self) -> Result<&str, BodyError> {
        simdutf8::basic::from_utf8(&self.body).map_err(|_| BodyError::InvalidUtf8)
    }

    /// Parsed body, computed on first call
    ///
    /// Only `POST` and `PUT` bodies with a JSON or urlencoded media type
    /// produce a value; other requests and empty bodies yield `None`.
    pub async fn body(&self) -> Result<Option<&ParsedBody>, BodyError> {
        let parsed = self
            .parsed_body
            .get_or_try_init(|| async {
                parse_body(self.method, self.content_type(), self.body.clone())
            })
            .await?;
        Ok(parsed.as_ref())
    }
}

/// Decoded request body
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(Value),
    Form(Query),
}

impl ParsedBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ParsedBody::Json(value) => Some(value),
            ParsedBody::Form(_) => None,
        }
    }

    pub fn as_form(&self) -> Option<&Query> {
        match self {
            ParsedBody::Form(form) => Some(form),
            ParsedBody::Json(_) => None,
        }
    }

    /// JSON view of either body kind
    pub fn to_json(&self) -> Value {
        match self {
            ParsedBody::Json(value) => value.clone(),
            ParsedBody::Form(form) => form.to_json(),
        }
    }
}

fn parse_body(
    method: Method,
    content_type: Option<&str>,
    body: Bytes,
) -> Result<Option<ParsedBody>, BodyError> {
    if !method.has_parsable_body() || body.is_empty() {
        return Ok(None);
    }

    let media_type = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match media_type.as_str() {
        "application/json" => serde_json::from_slice(&body)
            .map(|value| Some(ParsedBody::Json(value)))
            .map_err(|e| BodyError::Json(e.to_string())),
        "application/x-www-form-urlencoded" => {
            let text = simdutf8::basic::from_utf8(&body).map_err(|_| BodyError::InvalidUtf8)?;
            Ok(Some(ParsedBody::Form(Query::parse(text))))
        }
        _ => Ok(None),
    }
}

/// Request facts could not be built
#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    /// URL failed to parse
    InvalidUrl(String),
    /// Origin-form URI without a `Host` header
    MissingHost,
    /// Method outside the supported set
    UnsupportedMethod(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidUrl(url) => write!(f, "Invalid request URL: {}", url),
            RequestError::MissingHost => write!(f, "Missing Host header"),
            RequestError::UnsupportedMethod(method) => write!(f, "Unsupported method: {}", method),
        }
    }
}

impl std::error::Error for RequestError {}

impl From<UnsupportedMethod> for RequestError {
    fn from(err: UnsupportedMethod) -> Self {
        RequestError::UnsupportedMethod(err.0)
    }
}

/// Body parsing errors
#[derive(Debug, Clone, PartialEq)]
pub enum BodyError {
    /// Malformed JSON
    Json(String),
    /// Body is not valid UTF-8
    InvalidUtf8,
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyError::Json(msg) => write!(f, "Invalid JSON body: {}", msg),
            BodyError::InvalidUtf8 => write!(f, "Invalid UTF-8 in request body"),
        }
    }
}

impl std::error::Error for BodyError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(method: Method, url: &str, headers: &[(&str, &str)], body: &'static str) -> RequestFacts {
        let headers = headers.iter().copied().collect();
        RequestFacts::new(method, url, headers, Bytes::from_static(body.as_bytes())).unwrap()
    }

    #[test]
    fn test_url_decomposition() {
        let req = facts(
            Method::GET,
            "https://a.b.example.com:8443/posts/1?tag=x&tag=y&page=2#top",
            &[],
            "",
        );

        assert_eq!(req.protocol(), "https");
        assert_eq!(req.host(), "a.b.example.com:8443");
        assert_eq!(req.hostname(), "a.b.example.com");
        assert_eq!(req.subdomains(), &["b".to_string(), "a".to_string()]);
        assert_eq!(req.path(), "/posts/1");
        assert_eq!(req.hash(), "#top");
        assert_eq!(req.search(), "?tag=x&tag=y&page=2");
        assert_eq!(req.querystring(), "tag=x&tag=y&page=2");
        assert_eq!(req.query().get_all("tag"), vec!["x", "y"]);
        assert_eq!(req.query_value("page"), Some("2"));
    }

    #[test]
    fn test_default_port_and_empty_search() {
        let req = facts(Method::GET, "https://example.com:443/", &[], "");
        assert_eq!(req.host(), "example.com");
        assert_eq!(req.search(), "");
        assert_eq!(req.querystring(), "");
        assert!(req.subdomains().is_empty());
    }

    #[test]
    fn test_headers_and_cookies() {
        let req = facts(
            Method::GET,
            "http://example.com/",
            &[("Cookie", "session=abc; theme=dark"), ("X-Request-Id", "42")],
            "",
        );

        assert_eq!(req.header("x-request-id"), Some("42"));
        assert_eq!(req.cookie("session"), Some("abc"));
        assert_eq!(req.cookies().len(), 2);
    }

    #[test]
    fn test_from_http_origin_form() {
        let request = http::Request::builder()
            .method("POST")
            .uri("/submit?x=1")
            .header("host", "api.example.com")
            .header("x-forwarded-proto", "https")
            .body(Bytes::new())
            .unwrap();

        let req = RequestFacts::from_http(request).unwrap();
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.url(), "https://api.example.com/submit?x=1");
        assert_eq!(req.query_value("x"), Some("1"));
    }

    #[test]
    fn test_from_http_errors() {
        let no_host = http::Request::builder().uri("/").body(Bytes::new()).unwrap();
        assert_eq!(
            RequestFacts::from_http(no_host).unwrap_err(),
            RequestError::MissingHost
        );

        let oversized = "X".repeat(40);
        let custom = http::Request::builder()
            .method(oversized.as_str())
            .uri("http://example.com/")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(
            RequestFacts::from_http(custom).unwrap_err(),
            RequestError::UnsupportedMethod(oversized)
        );
    }

    #[test]
    fn test_from_http_extension_method() {
        let purge = http::Request::builder()
            .method("PURGE")
            .uri("http://example.com/cache/item")
            .body(Bytes::new())
            .unwrap();
        let req = RequestFacts::from_http(purge).unwrap();
        assert_eq!(req.method().as_str(), "PURGE");
        assert_eq!(req.path(), "/cache/item");
    }

    #[tokio::test]
    async fn test_json_body() {
        let req = facts(
            Method::POST,
            "http://example.com/posts",
            &[("Content-Type", "Application/JSON; charset=utf-8")],
            r#"{"title":"hello"}"#,
        );

        let body = req.body().await.unwrap().unwrap();
        assert_eq!(body.as_json(), Some(&serde_json::json!({ "title": "hello" })));
        // Cached after the first parse
        assert!(std::ptr::eq(body, req.body().await.unwrap().unwrap()));
        assert_eq!(req.raw_body().as_ref(), br#"{"title":"hello"}"#);
    }

    #[tokio::test]
    async fn test_form_body() {
        let req = facts(
            Method::PUT,
            "http://example.com/profile",
            &[("content-type", "application/x-www-form-urlencoded")],
            "name=Jane+Doe&role=a&role=b",
        );

        let body = req.body().await.unwrap().unwrap();
        let form = body.as_form().unwrap();
        assert_eq!(form.get_first("name"), Some("Jane Doe"));
        assert_eq!(form.get_all("role"), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_body_not_parsed() {
        let get = facts(
            Method::GET,
            "http://example.com/",
            &[("content-type", "application/json")],
            "{}",
        );
        assert_eq!(get.body().await, Ok(None));

        let empty = facts(Method::POST, "http://example.com/posts", &[], "");
        assert_eq!(empty.body().await, Ok(None));

        let text = facts(
            Method::POST,
            "http://example.com/",
            &[("content-type", "text/plain")],
            "hello",
        );
        assert_eq!(text.body().await, Ok(None));
        assert_eq!(text.body_string(), Ok("hello"));
    }

    #[tokio::test]
    async fn test_malformed_json_body() {
        let req = facts(
            Method::POST,
            "http://example.com/",
            &[("content-type", "application/json")],
            "{not json",
        );
        assert!(matches!(req.body().await, Err(BodyError::Json(_))));
    }
}
