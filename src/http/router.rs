//! Method-based handler registry.
//!
//! Handlers are registered explicitly at startup under an HTTP method.
//! Lookup ignores case, so `get` and `GET` reach the same handler. A
//! method with no handler is answered with 501 by the connection.

use crate::http::parser::Request;
use crate::http::response::ResponseWriter;
use std::collections::HashMap;
use std::io;

/// A request handler. It must write a complete response.
pub type Handler =
    Box<dyn Fn(&Request, &mut ResponseWriter<'_>) -> io::Result<()> + Send + Sync + 'static>;

/// Maps uppercase method names to handlers.
#[derive(Default)]
pub struct Router {
    handlers: HashMap<String, Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method`, replacing any previous one.
    pub fn register<F>(&mut self, method: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut ResponseWriter<'_>) -> io::Result<()> + Send + Sync + 'static,
    {
        self.handlers
            .insert(method.to_ascii_uppercase(), Box::new(handler));
        self
    }

    pub fn resolve(&self, method: &str) -> Option<&Handler> {
        self.handlers.get(&method.to_ascii_uppercase())
    }

    /// Registered methods, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("methods", &self.methods())
            .finish()
    }
}
