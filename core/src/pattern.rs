//! Path patterns for the route table
//!
//! Supported segment forms:
//! - `users` static segment
//! - `:id` named parameter, `:id?` optional parameter
//! - `:file.mp4` parameter with a literal suffix (`:file.mp4?` makes the suffix optional)
//! - `*` or `*name` wildcard, captures the rest of the path (as `wild` when unnamed)
//!
//! Exact patterns tolerate one trailing slash. Prefix patterns (middleware
//! mounts) match when the pattern is followed by end-of-path or `/`.

use crate::params::Params;
use crate::route::RouterError;
use memchr::memchr;

/// Key used for an unnamed `*` capture
pub const WILDCARD_KEY: &str = "wild";

/// Compiled path pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
    prefix: bool,
}

/// Path segment types
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Static(String),
    Param {
        name: String,
        optional: bool,
        suffix: Option<(String, bool)>,
    },
    Wildcard(String),
}

impl PathPattern {
    /// Compile `pattern`; `prefix` makes it match every path below it
    pub fn parse(pattern: &str, prefix: bool) -> Result<Self, RouterError> {
        if pattern.is_empty() || !(pattern.starts_with('/') || pattern.starts_with('*')) {
            return Err(RouterError::InvalidPath(pattern.to_string()));
        }

        let segments = parse_segments(pattern)?;
        Ok(Self {
            source: pattern.to_string(),
            segments,
            prefix,
        })
    }

    /// Original pattern text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether this pattern matches by prefix
    pub fn is_prefix(&self) -> bool {
        self.prefix
    }

    /// Names this pattern can capture, in order
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Static(_) => None,
            Segment::Param { name, .. } | Segment::Wildcard(name) => Some(name.as_str()),
        })
    }

    /// Match `path`, returning the captured parameters
    pub fn matches(&self, path: &str) -> Option<Params> {
        let mut rest = path.strip_prefix('/').unwrap_or(path);
        if !self.prefix {
            rest = rest.strip_suffix('/').unwrap_or(rest);
        }

        let parts = split_path(rest);
        let mut params = Params::with_capacity(self.segments.len());
        if match_segments(&self.segments, &parts, self.prefix, &mut params) {
            Some(params)
        } else {
            None
        }
    }
}

/// Split a path into `/`-separated parts
fn split_path(path: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    if path.is_empty() {
        return parts;
    }

    let mut remaining = path;
    while let Some(pos) = memchr(b'/', remaining.as_bytes()) {
        parts.push(&remaining[..pos]);
        remaining = &remaining[pos + 1..];
    }
    parts.push(remaining);
    parts
}

fn match_segments(segments: &[Segment], parts: &[&str], prefix: bool, params: &mut Params) -> bool {
    let Some((segment, remaining)) = segments.split_first() else {
        return parts.is_empty() || prefix;
    };

    match segment {
        Segment::Static(s) => match parts.split_first() {
            Some((part, rest)) if part == s => match_segments(remaining, rest, prefix, params),
            _ => false,
        },
        Segment::Param {
            name,
            optional,
            suffix,
        } => {
            if let Some((part, rest)) = parts.split_first() {
                for value in param_candidates(part, suffix) {
                    let mut attempt = params.clone();
                    attempt.insert(name.as_str(), Some(value.to_string()));
                    if match_segments(remaining, rest, prefix, &mut attempt) {
                        *params = attempt;
                        return true;
                    }
                }
            }

            if *optional {
                let mut attempt = params.clone();
                attempt.insert(name.as_str(), None);
                if match_segments(remaining, parts, prefix, &mut attempt) {
                    *params = attempt;
                    return true;
                }
            }
            false
        }
        Segment::Wildcard(name) => {
            // Wildcards consume the rest of the path
            params.insert(name.as_str(), Some(parts.join("/")));
            true
        }
    }
}

/// Values a parameter segment may bind for one path part
fn param_candidates<'p>(part: &'p str, suffix: &Option<(String, bool)>) -> Vec<&'p str> {
    let mut candidates = Vec::with_capacity(2);
    match suffix {
        Some((ext, optional)) => {
            if let Some(stem) = part.strip_suffix(ext.as_str()) {
                if !stem.is_empty() {
                    candidates.push(stem);
                }
            }
            if *optional && !part.is_empty() {
                candidates.push(part);
            }
        }
        None => {
            if !part.is_empty() {
                candidates.push(part);
            }
        }
    }
    candidates
}

/// Parse pattern into segments
fn parse_segments(pattern: &str) -> Result<Vec<Segment>, RouterError> {
    let path = pattern.strip_prefix('/').unwrap_or(pattern);

    let mut segments = Vec::new();
    for raw in path.split('/').filter(|s| !s.is_empty()) {
        let segment = if let Some(name) = raw.strip_prefix('*') {
            let name = if name.is_empty() { WILDCARD_KEY } else { name };
            Segment::Wildcard(name.to_string())
        } else if let Some(param) = raw.strip_prefix(':') {
            parse_param(param)?
        } else {
            Segment::Static(raw.to_string())
        };
        segments.push(segment);
    }

    if let Some(pos) = segments.iter().position(|s| matches!(s, Segment::Wildcard(_))) {
        if pos + 1 != segments.len() {
            return Err(RouterError::InvalidPath(pattern.to_string()));
        }
    }

    Ok(segments)
}

fn parse_param(param: &str) -> Result<Segment, RouterError> {
    let optional = param.ends_with('?');
    let body = param.strip_suffix('?').unwrap_or(param);

    let (name, suffix) = match body.find('.') {
        Some(dot) => (&body[..dot], Some((body[dot..].to_string(), optional))),
        None => (body, None),
    };

    if name.is_empty() {
        return Err(RouterError::InvalidParameter(param.to_string()));
    }

    Ok(Segment::Param {
        name: name.to_string(),
        optional: optional && suffix.is_none(),
        suffix,
    })
}
