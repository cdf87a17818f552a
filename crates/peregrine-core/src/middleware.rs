//! Middleware chain.
//!
//! Middleware run first-to-last in registration order. Each layer receives
//! the request and a `next` continuation; it may short-circuit by returning
//! its own response without calling `next`, or wrap the response `next`
//! produces. The chain is synchronous, matching the dispatch state machine.

use std::sync::Arc;

use http::StatusCode;

use crate::request::RequestContext;
use crate::response::Response;

/// The continuation a middleware calls to pass control down the chain.
pub type Next<'n> = &'n dyn for<'a> Fn(&RequestContext<'a>) -> Response;

/// A processing layer around the matched handler.
pub trait Middleware: Send + Sync {
    fn handle(&self, req: &RequestContext<'_>, next: Next<'_>) -> Response;
}

/// An ordered stack of middleware, executed outermost-first.
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer. Earlier layers run earlier.
    pub fn push(&mut self, layer: Arc<dyn Middleware>) {
        self.layers.push(layer);
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Run the chain, ending at `handler`.
    pub fn run(&self, req: &RequestContext<'_>, handler: Next<'_>) -> Response {
        run_chain(&self.layers, req, handler)
    }
}

fn run_chain(
    layers: &[Arc<dyn Middleware>],
    req: &RequestContext<'_>,
    handler: Next<'_>,
) -> Response {
    match layers.split_first() {
        None => handler(req),
        Some((head, rest)) => head.handle(req, &|req: &RequestContext<'_>| {
            run_chain(rest, req, handler)
        }),
    }
}

/// Sample middleware: require a fixed API key header, short-circuiting with
/// 401 when it is absent or wrong. Not part of the core contract; included
/// as the reference for writing layers.
pub struct ApiKeyGuard {
    header: &'static str,
    key: String,
}

impl ApiKeyGuard {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            header: "x-api-key",
            key: key.into(),
        }
    }
}

impl Middleware for ApiKeyGuard {
    fn handle(&self, req: &RequestContext<'_>, next: Next<'_>) -> Response {
        match req.header(self.header) {
            Some(value) if value == self.key => next(req),
            _ => Response::html("Unauthorized", "Unauthorized")
                .with_status(StatusCode::UNAUTHORIZED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use crate::request::HeaderSlice;
    use smallvec::smallvec;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for Recorder {
        fn handle(&self, req: &RequestContext<'_>, next: Next<'_>) -> Response {
            self.log.lock().unwrap().push(self.name);
            next(req)
        }
    }

    struct ShortCircuit;

    impl Middleware for ShortCircuit {
        fn handle(&self, _req: &RequestContext<'_>, _next: Next<'_>) -> Response {
            Response::text("blocked").with_status(StatusCode::FORBIDDEN)
        }
    }

    fn request<'a>(headers: HeaderSlice<'a>) -> RequestContext<'a> {
        RequestContext::new(Method::Get, "/", b"", headers)
    }

    #[test]
    fn test_layers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = MiddlewareStack::new();
        stack.push(Arc::new(Recorder {
            name: "first",
            log: log.clone(),
        }));
        stack.push(Arc::new(Recorder {
            name: "second",
            log: log.clone(),
        }));

        let req = request(smallvec![]);
        let response = stack.run(&req, &|_req: &RequestContext<'_>| Response::ok());

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_short_circuit_skips_handler_and_later_layers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = MiddlewareStack::new();
        stack.push(Arc::new(ShortCircuit));
        stack.push(Arc::new(Recorder {
            name: "late",
            log: log.clone(),
        }));

        let req = request(smallvec![]);
        let response = stack.run(&req, &|_req: &RequestContext<'_>| panic!("handler must not run"));

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_api_key_guard() {
        let guard = ApiKeyGuard::new("s3cret");

        let req = request(smallvec![("X-Api-Key", "s3cret")]);
        let response = guard.handle(&req, &|_req: &RequestContext<'_>| Response::ok());
        assert_eq!(response.status(), StatusCode::OK);

        let req = request(smallvec![("X-Api-Key", "wrong")]);
        let response = guard.handle(&req, &|_req: &RequestContext<'_>| Response::ok());
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let req = request(smallvec![]);
        let response = guard.handle(&req, &|_req: &RequestContext<'_>| Response::ok());
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_empty_stack_calls_handler_directly() {
        let stack = MiddlewareStack::new();
        let req = request(smallvec![]);
        let response = stack.run(&req, &|_req: &RequestContext<'_>| Response::text("direct"));
        assert_eq!(response.body().as_ref(), b"direct");
    }
}
