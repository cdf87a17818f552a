//! Per-request dispatch.
//!
//! One request runs through `Parsing -> Matching -> (Validating ->) Handling
//! -> Responding` synchronously inside a single call; each of the first three
//! stages can exit early with a synthesized error response. The dispatcher
//! owns nothing per-connection: it takes the accumulated read buffer and
//! either returns response bytes or asks for more input.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use tracing::{debug, error, info};

use crate::method::Method;
use crate::middleware::MiddlewareStack;
use crate::request::RequestContext;
use crate::response::Response;
use crate::router::{normalize_path, MatchOutcome, Router};
use crate::schema::{Schema, ValidationError};
use crate::wire::{parse_request, Parsed};

/// What the serving layer should do next.
pub enum DispatchOutcome {
    /// Write these bytes back on the connection.
    Response(Bytes),
    /// The buffer holds an incomplete message; read more and call again.
    NeedMoreData,
}

/// The request orchestrator. Cheap to share: the routing table inside is
/// read-only once built.
pub struct Dispatcher {
    router: Arc<Router>,
    middleware: MiddlewareStack,
}

impl Dispatcher {
    pub fn new(router: Router, middleware: MiddlewareStack) -> Self {
        Self {
            router: Arc::new(router),
            middleware,
        }
    }

    /// Run one request through the state machine.
    ///
    /// `buf` is everything read on the connection so far. The context the
    /// handler sees borrows from it, so the buffer must outlive this call
    /// only; nothing is retained afterwards.
    pub fn dispatch(&self, buf: &[u8]) -> DispatchOutcome {
        // Parsing
        let mut ctx = match parse_request(buf) {
            Ok(Parsed::Complete(ctx)) => ctx,
            Ok(Parsed::Partial) => return DispatchOutcome::NeedMoreData,
            Err(err) => {
                debug!(error = %err, "request parse failed");
                let response = Response::bad_request("Bad request");
                log_request(None, "", response.status());
                return DispatchOutcome::Response(response.to_bytes());
            }
        };

        // Matching
        let matched = match self.router.match_route(ctx.method(), ctx.path()) {
            MatchOutcome::Found(matched) => matched,
            // Both misses collapse into one not-found outcome; see DESIGN.md.
            MatchOutcome::MethodNotAllowed | MatchOutcome::NotFound => {
                let response = Response::not_found(ctx.method(), &normalize_path(ctx.path()));
                return self.respond(&ctx, response);
            }
        };
        ctx.set_params(matched.params);

        // Validating
        if let Some(schema) = matched.endpoint.schema() {
            match bind_body(&ctx, schema) {
                Ok(body) => ctx.set_body(body),
                Err(err) => {
                    debug!(method = %ctx.method(), path = %ctx.path(), error = %err,
                        "body validation failed");
                    return self.respond(&ctx, Response::bad_request(&err.to_string()));
                }
            }
        }

        // Handling. A panicking handler becomes a generic 500; the connection
        // loop and every other connection keep going.
        let handler = matched.endpoint.handler.clone();
        let response = match catch_unwind(AssertUnwindSafe(|| {
            self.middleware
                .run(&ctx, &|req: &RequestContext<'_>| handler(req))
        })) {
            Ok(response) => response,
            Err(_) => {
                error!(method = %ctx.method(), path = %ctx.path(), "handler panicked");
                Response::internal_error()
            }
        };

        // Responding
        self.respond(&ctx, response)
    }

    fn respond(&self, ctx: &RequestContext<'_>, response: Response) -> DispatchOutcome {
        log_request(Some(ctx.method()), ctx.path(), response.status());
        DispatchOutcome::Response(response.to_bytes())
    }
}

/// Parse and validate the body against the route's schema. Runs only for
/// schema-bearing routes; an empty body there is a client error even when
/// the schema declares zero fields.
fn bind_body(
    ctx: &RequestContext<'_>,
    schema: &Schema,
) -> Result<serde_json::Value, ValidationError> {
    if ctx.raw_body().is_empty() {
        return Err(ValidationError::MissingBody);
    }
    let body: serde_json::Value = serde_json::from_slice(ctx.raw_body())?;
    schema.validate(&body)?;
    Ok(body)
}

fn log_request(method: Option<Method>, path: &str, status: StatusCode) {
    let method = method.map(Method::as_str).unwrap_or("-");
    if status.is_success() {
        info!(method, path, status = status.as_u16(), "request completed");
    } else {
        error!(method, path, status = status.as_u16(), "request failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn dispatcher(build: impl FnOnce(&mut Router)) -> Dispatcher {
        let mut router = Router::new();
        build(&mut router);
        Dispatcher::new(router, MiddlewareStack::new())
    }

    fn response_text(outcome: DispatchOutcome) -> String {
        match outcome {
            DispatchOutcome::Response(bytes) => String::from_utf8(bytes.to_vec()).unwrap(),
            DispatchOutcome::NeedMoreData => panic!("expected a response"),
        }
    }

    #[test]
    fn test_get_dispatches_to_handler() {
        let d = dispatcher(|r| {
            r.register(
                Method::Get,
                "/users",
                Arc::new(|_req| Response::json(&json!(["ada", "grace"]))),
                None,
            )
            .unwrap();
        });

        let wire = response_text(d.dispatch(b"GET /users HTTP/1.1\r\n\r\n"));
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        let body = wire.split("\r\n\r\n").nth(1).unwrap();
        assert!(wire.contains(&format!("Content-Length: {}\r\n", body.len())));
        assert_eq!(body, r#"["ada","grace"]"#);
    }

    #[test]
    fn test_params_reach_the_handler() {
        let d = dispatcher(|r| {
            r.register(
                Method::Get,
                "/users/:id",
                Arc::new(|req| Response::text(format!("user {}", req.param("id").unwrap()))),
                None,
            )
            .unwrap();
        });

        let wire = response_text(d.dispatch(b"GET /users/42 HTTP/1.1\r\n\r\n"));
        assert!(wire.ends_with("user 42"));
    }

    #[test]
    fn test_unknown_path_is_404_with_message() {
        let d = dispatcher(|_r| {});
        let wire = response_text(d.dispatch(b"GET /Nope// HTTP/1.1\r\n\r\n"));
        assert!(wire.starts_with("HTTP/1.1 404 Not Found\r\n"));
        // Message names the method and the normalized path.
        assert!(wire.contains("Cannot GET /nope"));
    }

    #[test]
    fn test_schema_rejects_before_handler_runs() {
        static INVOKED: AtomicBool = AtomicBool::new(false);

        let schema = Schema::builder()
            .field("email", FieldType::String)
            .field("password", FieldType::String)
            .build()
            .unwrap();
        let d = dispatcher(|r| {
            r.register(
                Method::Post,
                "/users",
                Arc::new(|_req| {
                    INVOKED.store(true, Ordering::SeqCst);
                    Response::ok()
                }),
                Some(schema),
            )
            .unwrap();
        });

        let body = br#"{"email":"a@b.com"}"#;
        let request = format!(
            "POST /users HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            std::str::from_utf8(body).unwrap()
        );
        let wire = response_text(d.dispatch(request.as_bytes()));

        assert!(wire.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(!INVOKED.load(Ordering::SeqCst));
    }

    #[test]
    fn test_valid_body_reaches_handler_parsed() {
        let schema = Schema::builder()
            .field("email", FieldType::String)
            .build()
            .unwrap();
        let d = dispatcher(|r| {
            r.register(
                Method::Post,
                "/users",
                Arc::new(|req| {
                    let email = req.json().unwrap()["email"].as_str().unwrap().to_string();
                    Response::text(email)
                }),
                Some(schema),
            )
            .unwrap();
        });

        let body = br#"{"email":"a@b.com"}"#;
        let request = format!(
            "POST /users HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            std::str::from_utf8(body).unwrap()
        );
        let wire = response_text(d.dispatch(request.as_bytes()));
        assert!(wire.ends_with("a@b.com"));
    }

    #[test]
    fn test_empty_body_with_schema_is_400() {
        let schema = Schema::builder().build().unwrap();
        let d = dispatcher(|r| {
            r.register(Method::Post, "/users", Arc::new(|_req| Response::ok()), Some(schema))
                .unwrap();
        });

        let wire = response_text(d.dispatch(b"POST /users HTTP/1.1\r\n\r\n"));
        assert!(wire.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_unparseable_json_is_400() {
        let schema = Schema::builder().build().unwrap();
        let d = dispatcher(|r| {
            r.register(Method::Post, "/users", Arc::new(|_req| Response::ok()), Some(schema))
                .unwrap();
        });

        let wire =
            response_text(d.dispatch(b"POST /users HTTP/1.1\r\nContent-Length: 3\r\n\r\n{{{"));
        assert!(wire.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_partial_buffer_requests_more_data() {
        let d = dispatcher(|_r| {});
        assert!(matches!(
            d.dispatch(b"GET /users HTT"),
            DispatchOutcome::NeedMoreData
        ));
    }

    #[test]
    fn test_parse_error_is_400() {
        let d = dispatcher(|_r| {});
        let wire = response_text(d.dispatch(b"BREW /coffee HTTP/1.1\r\n\r\n"));
        assert!(wire.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_handler_panic_becomes_500() {
        let d = dispatcher(|r| {
            r.register(
                Method::Get,
                "/boom",
                Arc::new(|_req| panic!("handler bug")),
                None,
            )
            .unwrap();
        });

        let wire = response_text(d.dispatch(b"GET /boom HTTP/1.1\r\n\r\n"));
        assert!(wire.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }
}
