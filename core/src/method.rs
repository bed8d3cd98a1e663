//! HTTP method enumeration used for route registration and matching

use std::fmt;
use std::str::FromStr;

/// Longest extension method token kept inline
pub const MAX_EXTENSION_LEN: usize = 23;

/// HTTP method
///
/// Standard methods are unit variants; any other valid token (`PURGE`,
/// `PROPFIND`) is carried inline as `Other`, so the type stays `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
    CONNECT,
    TRACE,
    Other(ExtensionMethod),
}

impl Method {
    /// Parse method from its exact token; standard names are upper-case
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"GET" => Some(Method::GET),
            b"POST" => Some(Method::POST),
            b"PUT" => Some(Method::PUT),
            b"DELETE" => Some(Method::DELETE),
            b"PATCH" => Some(Method::PATCH),
            b"HEAD" => Some(Method::HEAD),
            b"OPTIONS" => Some(Method::OPTIONS),
            b"CONNECT" => Some(Method::CONNECT),
            b"TRACE" => Some(Method::TRACE),
            other => ExtensionMethod::new(other).map(Method::Other),
        }
    }

    /// Method token
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::PATCH => "PATCH",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::CONNECT => "CONNECT",
            Method::TRACE => "TRACE",
            Method::Other(ext) => ext.as_str(),
        }
    }

    /// Check if method is safe (no side effects)
    #[inline]
    pub const fn is_safe(self) -> bool {
        matches!(self, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
    }

    /// Check if method is idempotent
    #[inline]
    pub const fn is_idempotent(self) -> bool {
        matches!(
            self,
            Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS | Method::TRACE
        )
    }

    /// Whether the request body is eligible for automatic parsing
    #[inline]
    pub const fn has_parsable_body(self) -> bool {
        matches!(self, Method::POST | Method::PUT)
    }
}

/// Non-standard method token, stored inline
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtensionMethod {
    len: u8,
    bytes: [u8; MAX_EXTENSION_LEN],
}

impl ExtensionMethod {
    /// Accept a non-empty RFC 7230 token of at most `MAX_EXTENSION_LEN` bytes
    pub fn new(token: &[u8]) -> Option<Self> {
        if token.is_empty() || token.len() > MAX_EXTENSION_LEN || !token.iter().all(|&b| is_tchar(b)) {
            return None;
        }
        let mut bytes = [0u8; MAX_EXTENSION_LEN];
        bytes[..token.len()].copy_from_slice(token);
        Some(Self {
            len: token.len() as u8,
            bytes,
        })
    }

    pub fn as_str(&self) -> &str {
        // tokens are ASCII, checked in `new`
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl fmt::Debug for ExtensionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExtensionMethod").field(&self.as_str()).finish()
    }
}

#[inline]
fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

impl fmt::Display for Method {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = UnsupportedMethod;

    /// Case-insensitive parse, `"get"` and `"GET"` are the same method
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::from_bytes(s.to_ascii_uppercase().as_bytes())
            .ok_or_else(|| UnsupportedMethod(s.to_string()))
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = UnsupportedMethod;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        Method::from_bytes(method.as_str().as_bytes())
            .ok_or_else(|| UnsupportedMethod(method.as_str().to_string()))
    }
}

impl TryFrom<Method> for http::Method {
    type Error = http::method::InvalidMethod;

    fn try_from(method: Method) -> Result<Self, Self::Error> {
        match method {
            Method::GET => Ok(http::Method::GET),
            Method::POST => Ok(http::Method::POST),
            Method::PUT => Ok(http::Method::PUT),
            Method::DELETE => Ok(http::Method::DELETE),
            Method::PATCH => Ok(http::Method::PATCH),
            Method::HEAD => Ok(http::Method::HEAD),
            Method::OPTIONS => Ok(http::Method::OPTIONS),
            Method::CONNECT => Ok(http::Method::CONNECT),
            Method::TRACE => Ok(http::Method::TRACE),
            Method::Other(ext) => http::Method::from_bytes(ext.as_str().as_bytes()),
        }
    }
}

/// Method token outside the supported set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedMethod(pub String);

impl fmt::Display for UnsupportedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unsupported method: {}", self.0)
    }
}

impl std::error::Error for UnsupportedMethod {}
