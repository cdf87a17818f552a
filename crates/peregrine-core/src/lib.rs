//! # Peregrine Core
//!
//! An embeddable HTTP/1.1 server core: a path-segment trie router with
//! conflict detection, declared-shape body validation, and a synchronous
//! per-request dispatcher. Connections are byte streams you already own;
//! the bundled Tokio listener is optional glue.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use peregrine_core::{App, Response};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     App::new()
//!         .get("/users/:id", |req| {
//!             Response::json(&json!({ "id": req.param("id") }))
//!         })
//!         .listen("127.0.0.1:8080")
//!         .await
//! }
//! ```
//!
//! ## Embedding
//!
//! Skip `listen` and call [`App::build`] for a [`Dispatcher`]: feed it the
//! bytes you read from a connection, write back the bytes it returns. See
//! [`serve_connection`] for the reference read/dispatch/write loop.

mod app;
mod dispatch;
mod error;
mod method;
pub mod middleware;
mod params;
mod request;
mod response;
mod router;
mod schema;
mod server;
mod wire;

// Public API
pub use app::App;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::{Result, RouteError};
pub use method::Method;
pub use middleware::{ApiKeyGuard, Middleware, MiddlewareStack, Next};
pub use params::PathParams;
pub use request::RequestContext;
pub use response::{
    Response, CONTENT_TYPE_HTML, CONTENT_TYPE_JSON, CONTENT_TYPE_PLAIN, SERVER_NAME,
};
pub use router::{Endpoint, Handler, MatchOutcome, Router, RouteMatch, MAX_PATH_SEGMENTS};
pub use schema::{Field, FieldType, Schema, SchemaBuilder, SchemaError, ValidationError};
pub use server::{serve_connection, Server, MAX_REQUEST_BYTES};
pub use wire::{parse_request, Parsed, ParseError};

// The http crate's status codes are part of the handler-facing API.
pub use http::StatusCode;
