//! Method + path route table
//!
//! Registrations are kept in insertion order. A lookup walks every
//! registration and concatenates the handlers of all matches, so
//! middleware mounted with a prefix pattern runs ahead of the routes
//! registered after it.

use crate::method::Method;
use crate::params::Params;
use crate::pattern::PathPattern;
use std::fmt;

/// Port the dispatch pipeline queries for a method + path
pub trait RouteMatcher<T>: Send + Sync {
    /// Find every handler registered for `method` and `path`
    fn find(&self, method: Method, path: &str) -> RouteMatch<'_, T>;
}

/// Result of a route lookup
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    /// Handlers of every matching registration, in registration order
    pub handlers: Vec<&'a T>,
    /// Merged captures; later registrations overwrite earlier keys
    pub params: Params,
}

impl<T> RouteMatch<'_, T> {
    /// Whether no registration matched
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

struct Route<T> {
    /// `None` matches every method
    method: Option<Method>,
    pattern: PathPattern,
    handlers: Vec<T>,
}

impl<T> Route<T> {
    #[inline]
    fn accepts(&self, method: Method) -> bool {
        match self.method {
            None => true,
            Some(registered) => {
                registered == method || (registered == Method::GET && method == Method::HEAD)
            }
        }
    }
}

/// Ordered list of route registrations
pub struct RouteTable<T> {
    routes: Vec<Route<T>>,
}

impl<T> RouteTable<T> {
    /// Create an empty table
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register handlers for an exact path
    ///
    /// A `method` of `None` accepts any request method.
    pub fn insert(
        &mut self,
        method: Option<Method>,
        path: &str,
        handlers: Vec<T>,
    ) -> Result<(), RouterError> {
        let pattern = PathPattern::parse(path, false)?;
        self.routes.push(Route {
            method,
            pattern,
            handlers,
        });
        Ok(())
    }

    /// Register handlers for every method on `path` and everything below it
    pub fn mount(&mut self, path: &str, handlers: Vec<T>) -> Result<(), RouterError> {
        let pattern = PathPattern::parse(path, true)?;
        self.routes.push(Route {
            method: None,
            pattern,
            handlers,
        });
        Ok(())
    }

    /// Total number of registrations
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if the table has no registrations
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered patterns with their method, in registration order
    pub fn routes(&self) -> impl Iterator<Item = (Option<Method>, &str)> + '_ {
        self.routes.iter().map(|r| (r.method, r.pattern.as_str()))
    }
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync> RouteMatcher<T> for RouteTable<T> {
    fn find(&self, method: Method, path: &str) -> RouteMatch<'_, T> {
        let mut handlers = Vec::new();
        let mut params = Params::new();

        for route in self.routes.iter().filter(|r| r.accepts(method)) {
            if let Some(captured) = route.pattern.matches(path) {
                params.merge(captured);
                handlers.extend(route.handlers.iter());
            }
        }

        RouteMatch { handlers, params }
    }
}

/// Router errors
#[derive(Debug, Clone, PartialEq)]
pub enum RouterError {
    /// Pattern is empty or does not start with `/` or `*`
    InvalidPath(String),
    /// Parameter segment without a name
    InvalidParameter(String),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::InvalidPath(path) => write!(f, "Invalid path: {}", path),
            RouterError::InvalidParameter(param) => write!(f, "Invalid parameter: {}", param),
        }
    }
}

impl std::error::Error for RouterError {}
