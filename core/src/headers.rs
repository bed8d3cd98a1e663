//! Ordered header storage shared by request facts and responses
//!
//! Header names compare case-insensitively, iteration follows insertion
//! order, and repeated names (multiple `Set-Cookie` lines) stay distinct.

/// Ordered, case-insensitive header multimap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Get the first value stored under `name`
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        // Fast path for exact case match
        if let Some((_, value)) = self.entries.iter().find(|(k, _)| k == name) {
            return Some(value.as_str());
        }

        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get every value stored under `name`, in insertion order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get header value parsed as a specific type
    #[inline]
    pub fn get_parsed<T>(&self, name: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(name)?.trim().parse().ok()
    }

    /// Check whether any value is stored under `name`
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Replace every value of `name` with a single value
    ///
    /// The entry keeps the position of the first existing value, so
    /// overwriting a header does not reorder the map.
    pub fn set<K, V>(&mut self, name: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        let value = value.into();

        match self.entries.iter().position(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(pos) => {
                let mut index = 0;
                self.entries.retain(|(k, _)| {
                    let keep = index <= pos || !k.eq_ignore_ascii_case(&name);
                    index += 1;
                    keep
                });
                self.entries[pos] = (name, value);
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Add a value without touching existing values of `name`
    pub fn append<K, V>(&mut self, name: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.entries.push((name.into(), value.into()));
    }

    /// Remove every value of `name`, returning how many were dropped
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        before - self.entries.len()
    }

    /// Overlay `other` onto this map; each name in `other` replaces ours
    pub fn extend_overriding(&mut self, other: &Headers) {
        let mut seen: Vec<&str> = Vec::new();
        for (name, value) in &other.entries {
            if seen.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                self.append(name.clone(), value.clone());
            } else {
                seen.push(name);
                self.set(name.clone(), value.clone());
            }
        }
    }

    /// Get number of stored values
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if headers are empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

impl From<&http::HeaderMap> for Headers {
    /// Values that are not visible ASCII are decoded lossily
    fn from(map: &http::HeaderMap) -> Self {
        let mut headers = Headers::with_capacity(map.len());
        for (name, value) in map {
            let value = match value.to_str() {
                Ok(v) => v.to_string(),
                Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
            };
            headers.append(name.as_str(), value);
        }
        headers
    }
}
