//! Ordered `(path pattern, method) → handler` table.
//!
//! Every route whose pattern and method both match is executed, in insertion
//! order. The first capture group of the pattern, if any, is handed to the
//! handler as an opaque identifier.

use axum::http::Method;
use futures::future::BoxFuture;
use regex::Regex;
use std::future::Future;
use std::sync::Arc;

use crate::request::{PlugRequest, PlugResponse};

type Handler<S> =
    Box<dyn Fn(Arc<S>, PlugRequest, Option<String>) -> BoxFuture<'static, PlugResponse> + Send + Sync>;

struct Route<S> {
    name: &'static str,
    pattern: Regex,
    method: Method,
    handler: Handler<S>,
}

pub struct RouteTable<S> {
    routes: Vec<Route<S>>,
}

impl<S: Send + Sync + 'static> Default for RouteTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Send + Sync + 'static> RouteTable<S> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn route<F, Fut>(
        mut self,
        name: &'static str,
        pattern: &str,
        method: Method,
        handler: F,
    ) -> Result<Self, regex::Error>
    where
        F: Fn(Arc<S>, PlugRequest, Option<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PlugResponse> + Send + 'static,
    {
        let pattern = Regex::new(pattern)?;
        self.routes.push(Route {
            name,
            pattern,
            method,
            handler: Box::new(move |s, r, id| Box::pin(handler(s, r, id))),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Names of the routes that would fire for `(method, path)`, in order.
    pub fn matching(&self, method: &Method, path: &str) -> Vec<&'static str> {
        self.routes
            .iter()
            .filter(|r| r.method == *method && r.pattern.is_match(path))
            .map(|r| r.name)
            .collect()
    }

    /// Run every matching route. The response of the last one wins; `None`
    /// when nothing matched.
    pub async fn dispatch(&self, state: &Arc<S>, req: PlugRequest) -> Option<PlugResponse> {
        let mut last = None;
        for route in &self.routes {
            if route.method != req.method {
                continue;
            }
            let Some(caps) = route.pattern.captures(&req.url) else {
                continue;
            };
            let id = caps.get(1).map(|m| m.as_str().to_string());
            tracing::debug!(route = route.name, url = %req.url, "route matched");
            last = Some((route.handler)(state.clone(), req.clone(), id).await);
        }
        last
    }
}
