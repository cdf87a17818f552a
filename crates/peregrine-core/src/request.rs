//! Per-request state.
//!
//! A [`RequestContext`] borrows from the connection's read buffer for the
//! duration of one dispatch: path, header, and body text are zero-copy slices
//! into that buffer. Anything that must outlive the buffer (bound path
//! parameters) is copied into owned strings at bind time.

use std::cell::OnceCell;
use std::str::FromStr;

use serde_json::Value;
use smallvec::SmallVec;

use crate::method::Method;
use crate::params::PathParams;

/// Header pairs held inline before spilling to the heap.
const INLINE_HEADERS: usize = 16;

pub(crate) type HeaderSlice<'a> = SmallVec<[(&'a str, &'a str); INLINE_HEADERS]>;

/// Everything known about one inbound request. Owned by the dispatcher and
/// dropped as soon as the response bytes are handed off.
#[derive(Debug)]
pub struct RequestContext<'a> {
    method: Method,
    path: &'a str,
    raw_body: &'a [u8],
    headers: HeaderSlice<'a>,
    params: PathParams,
    body: Option<Value>,
    cookies: OnceCell<Vec<(&'a str, &'a str)>>,
}

impl<'a> RequestContext<'a> {
    pub(crate) fn new(
        method: Method,
        path: &'a str,
        raw_body: &'a [u8],
        headers: HeaderSlice<'a>,
    ) -> Self {
        Self {
            method,
            path,
            raw_body,
            headers,
            params: PathParams::new(),
            body: None,
            cookies: OnceCell::new(),
        }
    }

    pub(crate) fn set_params(&mut self, params: PathParams) {
        self.params = params;
    }

    pub(crate) fn set_body(&mut self, body: Value) {
        self.body = Some(body);
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The request path exactly as it appeared on the wire.
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// The raw body bytes, possibly empty.
    pub fn raw_body(&self) -> &'a [u8] {
        self.raw_body
    }

    /// The parsed and schema-validated body. Present only when the matched
    /// route declared a schema and validation succeeded.
    pub fn json(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// All bound path parameters, in match order.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// A single bound path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// A bound path parameter parsed into `T`.
    pub fn param_as<T: FromStr>(&self, name: &str) -> Option<T> {
        self.params.get(name)?.parse().ok()
    }

    /// First header whose name matches case-insensitively. The returned
    /// slice borrows the connection buffer, not the context.
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }

    /// Headers in wire order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (*n, *v))
    }

    /// A cookie by name.
    ///
    /// The `Cookie` header is parsed once, on first access, and cached for
    /// the rest of the request. A missing header means every call returns
    /// `None`; malformed pairs (no `=`, empty name) are dropped.
    pub fn cookie(&self, name: &str) -> Option<&'a str> {
        let table = self.cookies.get_or_init(|| {
            self.header("cookie")
                .map(parse_cookie_header)
                .unwrap_or_default()
        });
        table.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }
}

fn parse_cookie_header(header: &str) -> Vec<(&str, &str)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name, value.trim()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn request_with_headers<'a>(headers: HeaderSlice<'a>) -> RequestContext<'a> {
        RequestContext::new(Method::Get, "/test", b"", headers)
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = request_with_headers(smallvec![("Content-Type", "application/json")]);
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn test_cookie_parsing_trims_and_splits() {
        let req = request_with_headers(smallvec![("Cookie", "a=1; b=2;  c = 3")]);
        assert_eq!(req.cookie("a"), Some("1"));
        assert_eq!(req.cookie("b"), Some("2"));
        assert_eq!(req.cookie("c"), Some("3"));
        assert_eq!(req.cookie("d"), None);
    }

    #[test]
    fn test_cookie_without_header_is_none() {
        let req = request_with_headers(smallvec![]);
        assert_eq!(req.cookie("session"), None);
        // Repeated access stays None, no panic.
        assert_eq!(req.cookie("session"), None);
    }

    #[test]
    fn test_malformed_cookie_pairs_dropped() {
        let req = request_with_headers(smallvec![("Cookie", "ok=yes; bare; =orphan; x=")]);
        assert_eq!(req.cookie("ok"), Some("yes"));
        assert_eq!(req.cookie("bare"), None);
        assert_eq!(req.cookie(""), None);
        // Empty value is still a well-formed pair.
        assert_eq!(req.cookie("x"), Some(""));
    }

    #[test]
    fn test_param_as_parses() {
        let mut req = request_with_headers(smallvec![]);
        let mut params = PathParams::new();
        params.insert("id".to_string(), "42".to_string());
        params.insert("name".to_string(), "ada".to_string());
        req.set_params(params);

        assert_eq!(req.param_as::<u32>("id"), Some(42));
        assert_eq!(req.param_as::<u32>("name"), None);
        assert_eq!(req.param("name"), Some("ada"));
    }

    #[test]
    fn test_first_matching_header_wins() {
        let req = request_with_headers(smallvec![("X-Tag", "one"), ("x-tag", "two")]);
        assert_eq!(req.header("x-tag"), Some("one"));
    }
}
