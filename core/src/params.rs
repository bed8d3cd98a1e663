//! Route parameter extraction

use ahash::AHashMap;

/// Route parameters captured by the route table
///
/// A name maps to `None` when it belongs to an optional segment
/// (`/users/:id?`) that was absent from the request path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    inner: AHashMap<String, Option<String>>,
}

impl Params {
    /// Create new empty parameters container
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: AHashMap::new(),
        }
    }

    /// Create with pre-allocated capacity for known parameter count
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: AHashMap::with_capacity(capacity),
        }
    }

    /// Insert a parameter, replacing any earlier capture with the same name
    #[inline]
    pub fn insert<K: Into<String>>(&mut self, key: K, value: Option<String>) {
        self.inner.insert(key.into(), value);
    }

    /// Merge another capture set into this one; later captures win
    pub fn merge(&mut self, other: Params) {
        self.inner.extend(other.inner);
    }

    /// Get parameter value by name
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name)?.as_deref()
    }

    /// Check if parameter name was captured (even without a value)
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Get parameter count
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if parameters are empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over all parameters
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> + '_ {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Parse parameter as specific type
    pub fn parse<T>(&self, name: &str) -> Result<T, ParamError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.get(name).ok_or_else(|| ParamError::Missing(name.to_string()))?;
        value.parse::<T>().map_err(|e| ParamError::ParseError {
            name: name.to_string(),
            value: value.to_string(),
            error: e.to_string(),
        })
    }

    /// Get parameter as u64
    #[inline]
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name)?.parse().ok()
    }

    /// Get parameter as i64
    #[inline]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.parse().ok()
    }
}

/// Parameter parsing errors
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// Parameter not found
    Missing(String),
    /// Parameter parsing failed
    ParseError {
        name: String,
        value: String,
        error: String,
    },
}

impl std::fmt::Display for ParamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamError::Missing(name) => write!(f, "Parameter '{}' not found", name),
            ParamError::ParseError { name, value, error } => {
                write!(f, "Failed to parse parameter '{}' with value '{}': {}", name, value, error)
            }
        }
    }
}

impl std::error::Error for ParamError {}
