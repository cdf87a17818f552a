//! Application builder.
//!
//! `App` collects routes and middleware during the registration phase, then
//! either runs the bundled server (`listen`) or hands back the [`Dispatcher`]
//! (`build`) for embedding behind your own I/O.
//!
//! Registration errors are startup-fatal: the sugar methods panic with the
//! error display so a misconfigured process never starts serving. Use
//! [`App::try_route`] to handle the `Result` yourself.
//!
//! ```rust
//! use peregrine_core::{App, FieldType, Method, Response, Schema};
//!
//! let app = App::new()
//!     .get("/users/:id", |req| {
//!         Response::text(format!("user {}", req.param("id").unwrap_or("?")))
//!     })
//!     .route_with_schema(
//!         Method::Post,
//!         "/users",
//!         Schema::builder().field("email", FieldType::String).build().unwrap(),
//!         |_req| Response::ok(),
//!     );
//! let dispatcher = app.build();
//! # let _ = dispatcher;
//! ```

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::method::Method;
use crate::middleware::{Middleware, MiddlewareStack};
use crate::request::RequestContext;
use crate::response::Response;
use crate::router::Router;
use crate::schema::Schema;
use crate::server::Server;

/// Builder for a Peregrine application.
#[derive(Default)]
pub struct App {
    router: Router,
    middleware: MiddlewareStack,
}

macro_rules! method_sugar {
    ($($(#[$doc:meta])* $name:ident => $method:expr;)+) => {
        $(
            $(#[$doc])*
            pub fn $name<H>(self, path: &str, handler: H) -> Self
            where
                H: Fn(&RequestContext<'_>) -> Response + Send + Sync + 'static,
            {
                self.route($method, path, handler)
            }
        )+
    };
}

impl App {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            middleware: MiddlewareStack::new(),
        }
    }

    /// Register a route, panicking on any registration error.
    pub fn route<H>(mut self, method: Method, path: &str, handler: H) -> Self
    where
        H: Fn(&RequestContext<'_>) -> Response + Send + Sync + 'static,
    {
        if let Err(err) = self.router.register(method, path, Arc::new(handler), None) {
            panic!("{err}");
        }
        self
    }

    /// Register a route whose body must satisfy `schema`, panicking on any
    /// registration error.
    pub fn route_with_schema<H>(
        mut self,
        method: Method,
        path: &str,
        schema: Schema,
        handler: H,
    ) -> Self
    where
        H: Fn(&RequestContext<'_>) -> Response + Send + Sync + 'static,
    {
        if let Err(err) = self
            .router
            .register(method, path, Arc::new(handler), Some(schema))
        {
            panic!("{err}");
        }
        self
    }

    /// Fallible registration for applications that abort on their own terms.
    pub fn try_route<H>(
        &mut self,
        method: Method,
        path: &str,
        schema: Option<Schema>,
        handler: H,
    ) -> Result<()>
    where
        H: Fn(&RequestContext<'_>) -> Response + Send + Sync + 'static,
    {
        self.router.register(method, path, Arc::new(handler), schema)
    }

    method_sugar! {
        /// Register a GET route.
        get => Method::Get;
        /// Register a POST route.
        post => Method::Post;
        /// Register a PUT route.
        put => Method::Put;
        /// Register a PATCH route.
        patch => Method::Patch;
        /// Register a DELETE route.
        delete => Method::Delete;
        /// Register a HEAD route.
        head => Method::Head;
        /// Register an OPTIONS route.
        options => Method::Options;
        /// Register a TRACE route.
        trace => Method::Trace;
        /// Register a CONNECT route.
        connect => Method::Connect;
    }

    /// Append a middleware layer. Layers run in registration order.
    pub fn layer(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Finish registration and return the dispatcher for embedding.
    pub fn build(self) -> Dispatcher {
        Dispatcher::new(self.router, self.middleware)
    }

    /// Finish registration and serve on the bundled TCP listener.
    ///
    /// Installs a default `tracing` subscriber (env-filtered, `info` level)
    /// unless one is already set; embedders driving the [`Dispatcher`]
    /// directly configure their own.
    pub async fn listen(self, addr: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let _ = tracing_subscriber::registry()
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,peregrine=debug")),
            )
            .with(tracing_subscriber::fmt::layer())
            .try_init();

        Server::new(self.build()).run(addr).await
    }
}
