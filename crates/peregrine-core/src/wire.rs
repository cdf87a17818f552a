//! Wire-parser integration.
//!
//! The external streaming parser (`httparse`) tokenizes the accumulated
//! connection buffer; this module maps its tokens into a request-scoped
//! [`RequestContext`] sink. Nothing here owns parser state between requests,
//! so concurrent connections never share a "current request" pointer.
//!
//! Partial input is a normal outcome, not an error: the serving layer reads
//! more bytes and parses the grown buffer again.

use httparse::{Status, EMPTY_HEADER};

use crate::method::Method;
use crate::request::{HeaderSlice, RequestContext};

/// Upper bound on parsed header count per request.
const MAX_HEADERS: usize = 64;

/// Why a buffer failed to parse as an HTTP request.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The request line or a header is malformed.
    #[error("malformed request: {0}")]
    Syntax(#[from] httparse::Error),

    /// The method token is not one the routing table can hold.
    #[error("unsupported method `{0}`")]
    InvalidMethod(String),

    /// A header value is not valid UTF-8.
    #[error("request header text is not valid UTF-8")]
    InvalidEncoding,

    /// `Content-Length` is present but not a number.
    #[error("invalid Content-Length header")]
    InvalidContentLength,
}

/// Result of feeding the buffer to the parser.
#[derive(Debug)]
pub enum Parsed<'a> {
    /// A full message: head plus any declared body.
    Complete(RequestContext<'a>),
    /// The buffer ends mid-message; read more bytes and retry.
    Partial,
}

/// Parse one request out of `buf`.
///
/// The request target is carried verbatim, query string included: matching
/// treats `/users?active=1` as a different path from `/users`. Routes that
/// expect query parameters must account for this themselves.
pub fn parse_request(buf: &[u8]) -> Result<Parsed<'_>, ParseError> {
    let mut headers = [EMPTY_HEADER; MAX_HEADERS];
    let mut parser = httparse::Request::new(&mut headers);

    let head_len = match parser.parse(buf)? {
        Status::Complete(n) => n,
        Status::Partial => return Ok(Parsed::Partial),
    };

    // After Complete these tokens are always present.
    let method_token = parser.method.unwrap_or("");
    let method = Method::from_token(method_token)
        .ok_or_else(|| ParseError::InvalidMethod(method_token.to_string()))?;
    let path = parser.path.unwrap_or("/");

    let mut header_slice = HeaderSlice::new();
    for header in parser.headers.iter() {
        let value = std::str::from_utf8(header.value).map_err(|_| ParseError::InvalidEncoding)?;
        header_slice.push((header.name, value));
    }

    let body_len = match header_slice
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
    {
        Some((_, value)) => value
            .trim()
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidContentLength)?,
        None => 0,
    };

    if buf.len() < head_len + body_len {
        return Ok(Parsed::Partial);
    }
    let raw_body = &buf[head_len..head_len + body_len];

    Ok(Parsed::Complete(RequestContext::new(
        method,
        path,
        raw_body,
        header_slice,
    )))
}
