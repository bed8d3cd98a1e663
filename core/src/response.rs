//! Response accumulation and finalization
//!
//! Handlers mutate a `ResponseAccumulator` while the chain runs and turn it
//! into one immutable `Response` when they finish the request.

use crate::cookie::{serialize_cookie, CookieError, CookieOptions};
use crate::headers::Headers;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const TEXT_HTML: &str = "text/html; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json";

/// HTTP status code with common status helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    // 2xx Success
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const ACCEPTED: StatusCode = StatusCode(202);
    pub const NO_CONTENT: StatusCode = StatusCode(204);

    // 3xx Redirection
    pub const MOVED_PERMANENTLY: StatusCode = StatusCode(301);
    pub const FOUND: StatusCode = StatusCode(302);
    pub const SEE_OTHER: StatusCode = StatusCode(303);
    pub const NOT_MODIFIED: StatusCode = StatusCode(304);
    pub const TEMPORARY_REDIRECT: StatusCode = StatusCode(307);
    pub const PERMANENT_REDIRECT: StatusCode = StatusCode(308);

    // 4xx Client Error
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(405);
    pub const CONFLICT: StatusCode = StatusCode(409);
    pub const UNPROCESSABLE_ENTITY: StatusCode = StatusCode(422);
    pub const TOO_MANY_REQUESTS: StatusCode = StatusCode(429);

    // 5xx Server Error
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    pub const BAD_GATEWAY: StatusCode = StatusCode(502);
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(503);

    /// Create new status code
    pub const fn new(code: u16) -> Self {
        StatusCode(code)
    }

    /// Get status code as u16
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Check if status code indicates success (2xx)
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Check if status code indicates a redirect (3xx)
    pub const fn is_redirect(self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Check if status code indicates client error (4xx)
    pub const fn is_client_error(self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Check if status code indicates server error (5xx)
    pub const fn is_server_error(self) -> bool {
        self.0 >= 500 && self.0 < 600
    }

    /// Get canonical reason phrase for status code
    pub fn canonical_reason(self) -> &'static str {
        http::StatusCode::from_u16(self.0)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("Unknown")
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.canonical_reason())
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::OK
    }
}

/// Finalized response handed back to the host
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    /// Custom reason phrase; the host may not be able to emit it
    pub status_text: Option<String>,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    /// Body as UTF-8 text, lossy
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Get header value by name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Reason phrase: the custom status text or the canonical one
    pub fn reason(&self) -> &str {
        self.status_text
            .as_deref()
            .unwrap_or_else(|| self.status.canonical_reason())
    }

    /// Convert into the host's response type
    pub fn into_http(self) -> Result<http::Response<Bytes>, http::Error> {
        let mut builder = http::Response::builder().status(self.status.as_u16());
        for (name, value) in self.headers.iter() {
            builder = builder.header(name, value);
        }
        builder.body(self.body)
    }
}

/// Value accepted by `ResponseAccumulator::send`
///
/// Booleans and numbers go out as plain text, strings as HTML, JSON
/// objects, arrays and null as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Text(String),
    Html(String),
    Json(Value),
}

macro_rules! text_payload {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Payload {
                fn from(value: $ty) -> Self {
                    Payload::Text(value.to_string())
                }
            }
        )*
    };
}

text_payload!(bool, i32, i64, u16, u32, u64, usize, f32, f64);

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Html(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Html(value)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Payload::Html(s),
            Value::Bool(_) | Value::Number(_) => Payload::Text(value.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => Payload::Json(value),
        }
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::Empty
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Payload::Empty)
    }
}

/// Overrides applied by `ResponseAccumulator::end_with`
#[derive(Debug, Clone, Default)]
pub struct EndOptions {
    pub body: Option<Bytes>,
    pub status: Option<StatusCode>,
    pub status_text: Option<String>,
    pub headers: Headers,
}

/// Mutable response state for one request
#[derive(Debug, Clone, Default)]
pub struct ResponseAccumulator {
    status: StatusCode,
    status_text: Option<String>,
    headers: Headers,
    /// (name, serialized line), one entry per cookie name
    cookies: Vec<(String, String)>,
    body: Option<Bytes>,
    content_type: Option<String>,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set status code
    pub fn status<S: Into<StatusCode>>(&mut self, status: S) -> &mut Self {
        self.status = status.into();
        self
    }

    /// Set a custom reason phrase
    pub fn status_text<S: Into<String>>(&mut self, text: S) -> &mut Self {
        self.status_text = Some(text.into());
        self
    }

    /// Current status code
    pub fn current_status(&self) -> StatusCode {
        self.status
    }

    /// Set a header, replacing any value under the same name
    pub fn set_header<K, V>(&mut self, name: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.set(name, value);
        self
    }

    /// Set a header from a list of values joined with `,`
    pub fn set_header_list<K, V>(&mut self, name: K, values: &[V]) -> &mut Self
    where
        K: Into<String>,
        V: AsRef<str>,
    {
        let joined = values.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
        self.headers.set(name, joined);
        self
    }

    /// Add a header line without replacing existing values
    pub fn append_header<K, V>(&mut self, name: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.append(name, value);
        self
    }

    /// Read back a header set so far
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Set a cookie; a later call with the same name replaces it
    pub fn set_cookie(
        &mut self,
        name: &str,
        value: &str,
        options: CookieOptions,
    ) -> Result<&mut Self, CookieError> {
        let line = serialize_cookie(name, value, &options)?;
        match self.cookies.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = line,
            None => self.cookies.push((name.to_string(), line)),
        }
        Ok(self)
    }

    /// Expire a cookie on the client
    pub fn clear_cookie(
        &mut self,
        name: &str,
        options: CookieOptions,
    ) -> Result<&mut Self, CookieError> {
        let options = CookieOptions {
            max_age: Some(0),
            expires: Some("Thu, 01 Jan 1970 00:00:00 GMT".to_string()),
            ..options
        };
        self.set_cookie(name, "", options)
    }

    /// Set the body and, when given, its content type
    pub fn raw<B: Into<Bytes>>(&mut self, data: B, content_type: Option<&str>) -> &mut Self {
        self.body = Some(data.into());
        if let Some(ct) = content_type {
            self.content_type = Some(ct.to_string());
        }
        self
    }

    /// Plain text body
    pub fn text<S: Into<String>>(&mut self, text: S) -> &mut Self {
        self.body = Some(Bytes::from(text.into()));
        self.default_content_type(TEXT_PLAIN)
    }

    /// HTML body
    pub fn html<S: Into<String>>(&mut self, html: S) -> &mut Self {
        self.body = Some(Bytes::from(html.into()));
        self.default_content_type(TEXT_HTML)
    }

    /// Serialize `value` as a JSON body and finish the response
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<Response, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.body = Some(Bytes::from(body));
        self.default_content_type(APPLICATION_JSON);
        Ok(self.end())
    }

    fn default_content_type(&mut self, content_type: &str) -> &mut Self {
        if self.content_type.is_none() {
            self.content_type = Some(content_type.to_string());
        }
        self
    }

    /// Finish with the accumulated state
    pub fn end(&self) -> Response {
        self.end_with(EndOptions::default())
    }

    /// Finish, overriding body, status, status text or headers
    pub fn end_with(&self, options: EndOptions) -> Response {
        let mut headers = Headers::with_capacity(self.headers.len() + self.cookies.len() + 1);
        if let Some(ct) = &self.content_type {
            headers.set("Content-Type", ct.as_str());
        }
        headers.extend_overriding(&self.headers);
        headers.extend_overriding(&options.headers);
        for (_, line) in &self.cookies {
            headers.append("Set-Cookie", line.as_str());
        }

        Response {
            status: options.status.unwrap_or(self.status),
            status_text: options.status_text.or_else(|| self.status_text.clone()),
            headers,
            body: options.body.or_else(|| self.body.clone()).unwrap_or_default(),
        }
    }

    /// Finish with a value, picking the body kind from its type
    pub fn send<P: Into<Payload>>(&mut self, payload: P) -> Response {
        match payload.into() {
            Payload::Empty => self.end(),
            Payload::Text(text) => self.text(text).end(),
            Payload::Html(html) => self.html(html).end(),
            Payload::Json(value) => {
                self.body = Some(Bytes::from(value.to_string()));
                self.default_content_type(APPLICATION_JSON).end()
            }
        }
    }

    /// Finish with only a status code; any body set earlier is dropped
    pub fn send_status<S: Into<StatusCode>>(&mut self, status: S) -> Response {
        self.status(status).end_with(EndOptions {
            body: Some(Bytes::new()),
            ..EndOptions::default()
        })
    }

    /// Finish with a redirect, `302 Found` unless `status` is given
    pub fn redirect(&mut self, location: &str, status: Option<StatusCode>) -> Response {
        self.status(status.unwrap_or(StatusCode::FOUND))
            .set_header("Location", location)
            .end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_codes() {
        assert!(StatusCode::OK.is_success());
        assert!(StatusCode::FOUND.is_redirect());
        assert!(StatusCode::NOT_FOUND.is_client_error());
        assert!(StatusCode::INTERNAL_SERVER_ERROR.is_server_error());
        assert_eq!(StatusCode::NOT_FOUND.to_string(), "404 Not Found");
        assert_eq!(StatusCode(599).canonical_reason(), "Unknown");
    }

    #[test]
    fn test_default_response() {
        let res = ResponseAccumulator::new().end();
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.body.is_empty());
        assert!(res.headers.is_empty());
    }

    #[test]
    fn test_content_type_precedence() {
        let mut acc = ResponseAccumulator::new();
        acc.html("<p>hi</p>").text("ignored type");
        assert_eq!(acc.end().header("content-type"), Some(TEXT_HTML));

        acc.set_header("Content-Type", "text/markdown");
        let res = acc.end();
        assert_eq!(res.header("Content-Type"), Some("text/markdown"));
        assert_eq!(res.text(), "ignored type");
    }

    #[test]
    fn test_json_response() {
        let mut acc = ResponseAccumulator::new();
        let res = acc.status(StatusCode::CREATED).json(&json!({ "id": 1 })).unwrap();

        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.header("content-type"), Some(APPLICATION_JSON));
        assert_eq!(res.text(), r#"{"id":1}"#);
    }

    #[test]
    fn test_send_dispatches_on_payload() {
        let res = ResponseAccumulator::new().send(42);
        assert_eq!(res.header("content-type"), Some(TEXT_PLAIN));
        assert_eq!(res.text(), "42");

        let res = ResponseAccumulator::new().send("<h1>Home</h1>");
        assert_eq!(res.header("content-type"), Some(TEXT_HTML));

        let res = ResponseAccumulator::new().send(json!(["a", "b"]));
        assert_eq!(res.header("content-type"), Some(APPLICATION_JSON));
        assert_eq!(res.text(), r#"["a","b"]"#);

        let res = ResponseAccumulator::new().send(json!(true));
        assert_eq!(res.text(), "true");
        assert_eq!(res.header("content-type"), Some(TEXT_PLAIN));

        let res = ResponseAccumulator::new().send(None::<String>);
        assert!(res.body.is_empty());
        assert_eq!(res.header("content-type"), None);
    }

    #[test]
    fn test_headers_and_lists() {
        let mut acc = ResponseAccumulator::new();
        acc.set_header("X-Router", "a")
            .set_header("x-router", "EdgeRouter")
            .set_header_list("Vary", &["Accept", "Origin"])
            .append_header("Link", "</a>")
            .append_header("Link", "</b>");

        let res = acc.end();
        assert_eq!(res.header("X-Router"), Some("EdgeRouter"));
        assert_eq!(res.header("vary"), Some("Accept,Origin"));
        assert_eq!(res.headers.get_all("link").count(), 2);
    }

    #[test]
    fn test_cookies_emit_separate_lines() {
        let mut acc = ResponseAccumulator::new();
        acc.set_cookie("a", "1", CookieOptions::new()).unwrap();
        acc.set_cookie("b", "2", CookieOptions::new().http_only()).unwrap();
        acc.set_cookie("a", "3", CookieOptions::new()).unwrap();

        let res = acc.end();
        let lines: Vec<_> = res.headers.get_all("set-cookie").collect();
        assert_eq!(lines, vec!["a=3", "b=2; HttpOnly"]);
    }

    #[test]
    fn test_clear_cookie() {
        let mut acc = ResponseAccumulator::new();
        acc.clear_cookie("session", CookieOptions::new().path("/")).unwrap();

        let res = acc.end();
        assert_eq!(
            res.header("set-cookie"),
            Some("session=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0")
        );
    }

    #[test]
    fn test_end_with_overrides() {
        let mut acc = ResponseAccumulator::new();
        acc.status(StatusCode::OK).text("original").set_header("X-Keep", "1");

        let mut headers = Headers::new();
        headers.set("Content-Type", "application/xml");
        let res = acc.end_with(EndOptions {
            body: Some(Bytes::from_static(b"<ok/>")),
            status: Some(StatusCode::ACCEPTED),
            status_text: Some("Queued".to_string()),
            headers,
        });

        assert_eq!(res.status, StatusCode::ACCEPTED);
        assert_eq!(res.reason(), "Queued");
        assert_eq!(res.header("content-type"), Some("application/xml"));
        assert_eq!(res.header("x-keep"), Some("1"));
        assert_eq!(res.text(), "<ok/>");
    }

    #[test]
    fn test_redirect() {
        let res = ResponseAccumulator::new().redirect("/login", None);
        assert_eq!(res.status, StatusCode::FOUND);
        assert_eq!(res.header("location"), Some("/login"));

        let res = ResponseAccumulator::new().redirect("/new", Some(StatusCode::MOVED_PERMANENTLY));
        assert_eq!(res.status.as_u16(), 301);
    }

    #[test]
    fn test_into_http() {
        let mut acc = ResponseAccumulator::new();
        acc.set_cookie("a", "1", CookieOptions::new()).unwrap();
        acc.set_cookie("b", "2", CookieOptions::new()).unwrap();
        let res = acc.status(StatusCode::NOT_FOUND).send("missing").into_http().unwrap();

        assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
        assert_eq!(res.headers().get_all("set-cookie").iter().count(), 2);
        assert_eq!(res.body().as_ref(), b"missing");
    }

    #[test]
    fn test_send_status_drops_earlier_body() {
        let mut acc = ResponseAccumulator::new();
        acc.text("draft").set_header("X-Keep", "1");
        let res = acc.send_status(StatusCode::NO_CONTENT);

        assert_eq!(res.status, StatusCode::NO_CONTENT);
        assert!(res.body.is_empty());
        assert_eq!(res.header("x-keep"), Some("1"));
    }
}
