//! Response types and wire serialization.
//!
//! A [`Response`] is the status/content-type/body triple a handler returns.
//! [`Response::to_bytes`] produces the exact on-wire form:
//!
//! ```text
//! HTTP/1.1 <status> <reason>\r\n
//! Server: peregrine\r\n
//! Content-Type: <mime>\r\n
//! Content-Length: <byte length of body>\r\n
//! \r\n
//! <body bytes>
//! ```
//!
//! Error responses (400/404/413/500) are synthesized here so the dispatcher
//! and the serving layer share one spelling.

use std::borrow::Cow;
use std::fmt::Write as _;

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;

use crate::method::Method;

/// Value of the fixed `Server` header.
pub const SERVER_NAME: &str = "peregrine";

pub const CONTENT_TYPE_PLAIN: &str = "text/plain";
pub const CONTENT_TYPE_HTML: &str = "text/html";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// An HTTP response. Built by a handler or synthesized internally; immutable
/// once returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    content_type: Cow<'static, str>,
    body: Bytes,
}

impl Response {
    /// 200 with a plain-text `OK` body.
    pub fn ok() -> Self {
        Self::text("OK")
    }

    /// 200 with a plain-text body.
    pub fn text(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: Cow::Borrowed(CONTENT_TYPE_PLAIN),
            body: body.into(),
        }
    }

    /// 200 with a serialized JSON body. Serialization failure degrades to a
    /// generic 500 rather than panicking inside a handler.
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status: StatusCode::OK,
                content_type: Cow::Borrowed(CONTENT_TYPE_JSON),
                body: Bytes::from(body),
            },
            Err(err) => {
                tracing::error!(error = %err, "response serialization failed");
                Self::internal_error()
            }
        }
    }

    /// 200 with the fixed HTML page template.
    pub fn html(title: &str, message: &str) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: Cow::Borrowed(CONTENT_TYPE_HTML),
            body: Bytes::from(html_page(title, message)),
        }
    }

    /// Replace the status code.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Replace the content type.
    pub fn with_content_type(mut self, content_type: impl Into<Cow<'static, str>>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// 404 naming the method and (normalized) path that missed.
    pub(crate) fn not_found(method: Method, path: &str) -> Self {
        let message = format!("Cannot {method} {path}");
        Self::html("Not Found", &message).with_status(StatusCode::NOT_FOUND)
    }

    /// 400 with a short reason in the page body.
    pub(crate) fn bad_request(message: &str) -> Self {
        Self::html("Bad Request", message).with_status(StatusCode::BAD_REQUEST)
    }

    /// 413 for requests past the serving layer's size cap.
    pub(crate) fn payload_too_large() -> Self {
        Self::html("Payload Too Large", "Payload too large")
            .with_status(StatusCode::PAYLOAD_TOO_LARGE)
    }

    /// Generic 500 that leaks no detail.
    pub(crate) fn internal_error() -> Self {
        Self::html("Internal Server Error", "Internal server error")
            .with_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Serialize to the wire form.
    pub fn to_bytes(&self) -> Bytes {
        let reason = self.status.canonical_reason().unwrap_or("Unknown");
        let mut head = String::with_capacity(96 + self.content_type.len());
        // Infallible: fmt::Write on String never errors.
        let _ = write!(
            head,
            "HTTP/1.1 {} {}\r\nServer: {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            self.status.as_u16(),
            reason,
            SERVER_NAME,
            self.content_type,
            self.body.len()
        );

        let mut wire = Vec::with_capacity(head.len() + self.body.len());
        wire.extend_from_slice(head.as_bytes());
        wire.extend_from_slice(&self.body);
        Bytes::from(wire)
    }
}

fn html_page(title: &str, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         \t<meta charset=\"UTF-8\">\n\
         \t<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         \t<title>{title}</title>\n\
         </head>\n\
         <body>\n\
         \t{message}\n\
         </body>\n\
         </html>\n"
    )
}
