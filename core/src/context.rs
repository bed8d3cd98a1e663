//! Per-request context passed to every handler

use crate::params::Params;
use crate::request::RequestFacts;
use crate::response::ResponseAccumulator;
use ahash::AHashMap;
use std::any::{Any, TypeId};

/// Matched virtual host, attached for handlers of the selected sub-router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VHostData {
    /// Request host the pattern matched
    pub host: String,
    /// `*` captures, left to right
    pub params: Vec<String>,
}

/// Request facts, response state and handler-local data for one request
#[derive(Debug)]
pub struct Context {
    req: RequestFacts,
    /// Response state handlers mutate before finishing
    pub res: ResponseAccumulator,
    vhost: Option<VHostData>,
    /// Typed storage shared between handlers of one chain
    pub extensions: Extensions,
}

impl Context {
    pub fn new(req: RequestFacts) -> Self {
        Self {
            req,
            res: ResponseAccumulator::new(),
            vhost: None,
            extensions: Extensions::new(),
        }
    }

    /// Request facts
    #[inline]
    pub fn req(&self) -> &RequestFacts {
        &self.req
    }

    /// Matched virtual host, when dispatched through a vhost router
    #[inline]
    pub fn vhost(&self) -> Option<&VHostData> {
        self.vhost.as_ref()
    }

    /// Get route parameter by name
    #[inline]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.req.param(name)
    }

    /// Bind route parameters found by the route matcher
    pub fn bind_params(&mut self, params: Params) {
        self.req.bind_params(params);
    }

    pub fn set_vhost(&mut self, vhost: Option<VHostData>) {
        self.vhost = vhost;
    }

    /// Start a fresh response for a new dispatch attempt
    pub fn reset_response(&mut self) {
        self.res = ResponseAccumulator::new();
    }

    /// Take back the request facts
    pub fn into_request(self) -> RequestFacts {
        self.req
    }
}

/// Type-erased storage for middleware data
#[derive(Debug, Default)]
pub struct Extensions {
    data: AHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Create new extensions storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert typed data, returning any previous value of the same type
    pub fn insert<T: Send + Sync + 'static>(&mut self, data: T) -> Option<T> {
        self.data
            .insert(TypeId::of::<T>(), Box::new(data))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// Get typed data
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.data
            .get(&TypeId::of::<T>())
            .and_then(|data| data.downcast_ref::<T>())
    }

    /// Get typed data mutably
    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.data
            .get_mut(&TypeId::of::<T>())
            .and_then(|data| data.downcast_mut::<T>())
    }

    /// Remove typed data
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.data
            .remove(&TypeId::of::<T>())
            .and_then(|data| data.downcast::<T>().ok())
            .map(|data| *data)
    }
}
