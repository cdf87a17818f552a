//! # Peregrine
//!
//! An embeddable HTTP server core for Rust.
//!
//! Peregrine gives you a trie-based router with registration-time conflict
//! detection, optional declared-shape validation of JSON request bodies, and
//! a per-request dispatcher that turns raw connection bytes into response
//! bytes. Bring your own connections, or use the bundled Tokio listener.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use peregrine::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     App::new()
//!         .get("/users", |_req| Response::json(&json!(["ada", "grace"])))
//!         .route_with_schema(
//!             Method::Post,
//!             "/users",
//!             Schema::builder()
//!                 .field("email", FieldType::String)
//!                 .field("password", FieldType::String)
//!                 .build()?,
//!             |req| Response::json(req.json().unwrap()).with_status(StatusCode::CREATED),
//!         )
//!         .listen("127.0.0.1:8080")
//!         .await
//! }
//! ```

// Re-export core functionality
pub use peregrine_core::*;

/// Everything an application typically needs in scope.
pub mod prelude {
    pub use peregrine_core::{
        App, FieldType, Method, Middleware, RequestContext, Response, Schema, StatusCode,
    };
}
