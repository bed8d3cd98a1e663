//! Query string and urlencoded form decoding

use ahash::AHashMap;
use serde_json::Value;

/// A decoded query value
///
/// The first occurrence of a key is stored as `Single`; a repeated key is
/// promoted to `Multiple` holding every value in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

impl QueryValue {
    /// First value for the key
    pub fn first(&self) -> &str {
        match self {
            QueryValue::Single(value) => value,
            QueryValue::Multiple(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// All values for the key, in order
    pub fn values(&self) -> Vec<&str> {
        match self {
            QueryValue::Single(value) => vec![value.as_str()],
            QueryValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Whether the key repeated
    pub fn is_multiple(&self) -> bool {
        matches!(self, QueryValue::Multiple(_))
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(first) => {
                let first = std::mem::take(first);
                *self = QueryValue::Multiple(vec![first, value]);
            }
            QueryValue::Multiple(values) => values.push(value),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            QueryValue::Single(value) => Value::String(value.clone()),
            QueryValue::Multiple(values) => {
                Value::Array(values.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// Decoded query string or urlencoded form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    inner: AHashMap<String, QueryValue>,
}

impl Query {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `a=1&b=2` style input (no leading `?`)
    pub fn parse(input: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(input.as_bytes()))
    }

    /// Build from decoded pairs, applying the promotion rule
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut query = Self::new();
        for (key, value) in pairs {
            query.push(key.into(), value.into());
        }
        query
    }

    fn push(&mut self, key: String, value: String) {
        match self.inner.get_mut(&key) {
            Some(existing) => existing.push(value),
            None => {
                self.inner.insert(key, QueryValue::Single(value));
            }
        }
    }

    /// Get the value stored for `key`
    #[inline]
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.inner.get(key)
    }

    /// Get the first value for `key`
    #[inline]
    pub fn get_first(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(QueryValue::first)
    }

    /// Get every value for `key`; empty when absent
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.inner.get(key).map(QueryValue::values).unwrap_or_default()
    }

    /// Check if key is present
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> + '_ {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// JSON object view: scalars become strings, repeated keys arrays
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.inner
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}
