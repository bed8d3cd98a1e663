//! Cookie header parsing and `Set-Cookie` serialization

use ahash::AHashMap;
use memchr::memchr;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;

/// Bytes escaped in cookie values; matches `encodeURIComponent`
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Parse a `Cookie` request header into name → value
///
/// Pairs are split on `;` and trimmed, surrounding double quotes are
/// removed from values, and the first occurrence of a name wins. Values
/// are percent-decoded; one that does not decode to UTF-8 is kept raw.
pub fn parse_cookies(header: Option<&str>) -> AHashMap<String, String> {
    let mut cookies = AHashMap::new();
    let Some(header) = header else {
        return cookies;
    };

    for pair in header.split(';') {
        let Some(eq) = memchr(b'=', pair.as_bytes()) else {
            continue;
        };

        let name = pair[..eq].trim();
        if name.is_empty() || cookies.contains_key(name) {
            continue;
        }

        let mut value = pair[eq + 1..].trim();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            value = &value[1..value.len() - 1];
        }

        cookies.insert(name.to_string(), decode_value(value));
    }

    cookies
}

fn decode_value(value: &str) -> String {
    if memchr(b'%', value.as_bytes()).is_none() {
        return value.to_string();
    }
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// SameSite policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Cookie attributes for `Set-Cookie`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieOptions {
    /// Cookie domain
    pub domain: Option<String>,
    /// Cookie path
    pub path: Option<String>,
    /// Expiry as an HTTP-date, e.g. `Wed, 21 Oct 2015 07:28:00 GMT`
    pub expires: Option<String>,
    /// Max age in seconds
    pub max_age: Option<i64>,
    /// HttpOnly flag (no JavaScript access)
    pub http_only: bool,
    /// Secure flag (HTTPS only)
    pub secure: bool,
    /// SameSite policy
    pub same_site: Option<SameSite>,
    /// Partitioned flag (CHIPS)
    pub partitioned: bool,
}

impl CookieOptions {
    /// Create new cookie options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set domain
    pub fn domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set path
    pub fn path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set expiry HTTP-date
    pub fn expires<S: Into<String>>(mut self, expires: S) -> Self {
        self.expires = Some(expires.into());
        self
    }

    /// Set max age in seconds
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn same_site(mut self, policy: SameSite) -> Self {
        self.same_site = Some(policy);
        self
    }

    pub fn partitioned(mut self) -> Self {
        self.partitioned = true;
        self
    }
}

/// Rejected cookie input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieError {
    /// Name is empty or not an RFC 7230 token
    InvalidName(String),
    /// Domain attribute contains forbidden characters
    InvalidDomain(String),
    /// Path attribute contains forbidden characters
    InvalidPath(String),
}

impl fmt::Display for CookieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookieError::InvalidName(name) => write!(f, "Invalid cookie name: {}", name),
            CookieError::InvalidDomain(domain) => write!(f, "Invalid cookie domain: {}", domain),
            CookieError::InvalidPath(path) => write!(f, "Invalid cookie path: {}", path),
        }
    }
}

impl std::error::Error for CookieError {}

/// Serialize one cookie into a `Set-Cookie` header value
///
/// The value is percent-encoded, so any string is accepted.
pub fn serialize_cookie(
    name: &str,
    value: &str,
    options: &CookieOptions,
) -> Result<String, CookieError> {
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return Err(CookieError::InvalidName(name.to_string()));
    }
    let mut cookie = format!("{}={}", name, utf8_percent_encode(value, COOKIE_VALUE));

    if let Some(domain) = &options.domain {
        if !domain.bytes().all(is_attribute_byte) {
            return Err(CookieError::InvalidDomain(domain.clone()));
        }
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    if let Some(path) = &options.path {
        if !path.bytes().all(is_attribute_byte) {
            return Err(CookieError::InvalidPath(path.clone()));
        }
        cookie.push_str("; Path=");
        cookie.push_str(path);
    }
    if let Some(expires) = &options.expires {
        cookie.push_str("; Expires=");
        cookie.push_str(expires);
    }
    if let Some(max_age) = options.max_age {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    if options.http_only {
        cookie.push_str("; HttpOnly");
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    if let Some(same_site) = options.same_site {
        cookie.push_str("; SameSite=");
        cookie.push_str(same_site.as_str());
    }
    if options.partitioned {
        cookie.push_str("; Partitioned");
    }

    Ok(cookie)
}

#[inline]
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[inline]
fn is_attribute_byte(b: u8) -> bool {
    (0x20..0x7F).contains(&b) && b != b';'
}
