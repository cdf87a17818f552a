//! Path-segment trie router.
//!
//! Routes are registered as `/`-separated patterns and stored in a trie with
//! one node per pattern segment. Three segment kinds exist:
//!
//! - static text: `/users/list`
//! - named parameters: `/users/:id` (the matched text is bound under `id`)
//! - a wildcard: `/assets/*` (matches the whole remaining path)
//!
//! # Path syntax
//!
//! A segment starting with `:` is a parameter; its label is the remainder of
//! the segment. A segment starting with `*` is the wildcard and must be the
//! final segment of the pattern. Everything else is static text.
//!
//! # Matching precedence
//!
//! At every trie level a request segment is tried against children in a fixed
//! order: static label equality first, then a parameter, then the wildcard.
//! Registration order never influences resolution.
//!
//! # Conflict detection
//!
//! Registration fails rather than building an ambiguous table: two
//! differently named parameters cannot share a level, a wildcard cannot be
//! followed by further segments, and re-registering a `(method, path)` pair
//! is an error. All of these are startup-fatal (see [`RouteError`]).

use std::sync::Arc;

use crate::error::{Result, RouteError};
use crate::method::Method;
use crate::params::PathParams;
use crate::request::RequestContext;
use crate::response::Response;
use crate::schema::Schema;

/// Hard cap on pattern and request path depth.
pub const MAX_PATH_SEGMENTS: usize = 100;

/// A route handler. Runs synchronously to completion; the dispatch state
/// machine has no suspension point.
pub type Handler = Arc<dyn for<'a> Fn(&RequestContext<'a>) -> Response + Send + Sync>;

/// The payload stored at a terminal trie node for one method.
pub struct Endpoint {
    pub(crate) handler: Handler,
    pub(crate) schema: Option<Schema>,
}

impl Endpoint {
    /// The declared body shape, if the route carries one.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    Static,
    Param,
    Wildcard,
}

/// One parsed pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    kind: SegmentKind,
    label: String,
}

/// One trie node.
struct Fragment {
    label: String,
    kind: SegmentKind,
    children: Vec<Fragment>,
    endpoints: [Option<Endpoint>; Method::COUNT],
}

impl Fragment {
    fn new(label: String, kind: SegmentKind) -> Self {
        Self {
            label,
            kind,
            children: Vec::new(),
            endpoints: Default::default(),
        }
    }

    /// Position of the child this segment merges into, if one exists.
    /// Labels participate in identity for static and param segments only.
    fn child_position(&self, segment: &Segment) -> Option<usize> {
        self.children.iter().position(|c| {
            c.kind == segment.kind
                && (segment.kind == SegmentKind::Wildcard || c.label == segment.label)
        })
    }

    fn has_endpoint(&self) -> bool {
        self.endpoints.iter().any(|e| e.is_some())
    }
}

/// A successful match: the endpoint plus the parameters bound on the way.
pub struct RouteMatch<'r> {
    pub endpoint: &'r Endpoint,
    pub params: PathParams,
}

/// Outcome of [`Router::match_route`].
pub enum MatchOutcome<'r> {
    /// A handler is registered for this method and path.
    Found(RouteMatch<'r>),
    /// The path exists in the trie but carries no handler for this method.
    /// The dispatcher currently collapses this into the not-found response.
    MethodNotAllowed,
    /// No trie path covers the request path.
    NotFound,
}

/// The routing table. Built during a registration phase, then treated as
/// immutable and shared read-only across connections (no locking needed).
pub struct Router {
    root: Fragment,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            root: Fragment::new(String::new(), SegmentKind::Static),
        }
    }

    /// Register `handler` (and an optional body schema) for `method` at the
    /// pattern `path`.
    pub fn register(
        &mut self,
        method: Method,
        path: &str,
        handler: Handler,
        schema: Option<Schema>,
    ) -> Result<()> {
        let normalized = normalize_path(path);
        let segments = parse_pattern(&normalized)?;

        let mut node = &mut self.root;
        for segment in segments {
            let position = match node.child_position(&segment) {
                Some(position) => position,
                None => {
                    if segment.kind == SegmentKind::Param
                        && node
                            .children
                            .iter()
                            .any(|c| c.kind == SegmentKind::Param)
                    {
                        return Err(RouteError::ConflictingSegment {
                            segment: format!(":{}", segment.label),
                            path: normalized,
                        });
                    }
                    node.children
                        .push(Fragment::new(segment.label, segment.kind));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[position];
        }

        let slot = &mut node.endpoints[method.index()];
        if slot.is_some() {
            return Err(RouteError::DuplicateRoute {
                method,
                path: normalized,
            });
        }
        *slot = Some(Endpoint { handler, schema });
        Ok(())
    }

    /// Match a request against the table.
    ///
    /// The request path is normalized with the same routine as registration,
    /// so matching is case-insensitive and bound parameter values come back
    /// lowercased.
    pub fn match_route(&self, method: Method, path: &str) -> MatchOutcome<'_> {
        let normalized = normalize_path(path);
        let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() > MAX_PATH_SEGMENTS {
            return MatchOutcome::NotFound;
        }

        let mut node = &self.root;
        let mut params = PathParams::new();

        for segment in segments {
            if let Some(child) = node
                .children
                .iter()
                .find(|c| c.kind == SegmentKind::Static && c.label == segment)
            {
                node = child;
                continue;
            }
            if let Some(child) = node
                .children
                .iter()
                .find(|c| c.kind == SegmentKind::Param)
            {
                params.insert(child.label.clone(), segment.to_string());
                node = child;
                continue;
            }
            if let Some(child) = node
                .children
                .iter()
                .find(|c| c.kind == SegmentKind::Wildcard)
            {
                // A wildcard swallows the rest of the path.
                node = child;
                break;
            }
            return MatchOutcome::NotFound;
        }

        match node.endpoints[method.index()].as_ref() {
            Some(endpoint) => MatchOutcome::Found(RouteMatch { endpoint, params }),
            None if node.has_endpoint() => MatchOutcome::MethodNotAllowed,
            None => MatchOutcome::NotFound,
        }
    }
}

/// Normalize a path: drop every whitespace character, ASCII-lowercase,
/// collapse runs of `/`, and strip one trailing `/` unless the whole path is
/// the root. Empty and all-whitespace inputs normalize to `/`.
///
/// The routine is idempotent; both registration and matching run it, so the
/// two sides always compare the same spelling.
pub(crate) fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_whitespace() || (c == '/' && prev_slash) {
            continue;
        }
        prev_slash = c == '/';
        out.push(c);
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Parse a normalized pattern into classified segments, enforcing the
/// registration-time shape rules.
fn parse_pattern(normalized: &str) -> Result<Vec<Segment>> {
    let raw: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
    if raw.len() > MAX_PATH_SEGMENTS {
        return Err(RouteError::PathTooLong {
            path: normalized.to_string(),
            max: MAX_PATH_SEGMENTS,
        });
    }

    let mut segments = Vec::with_capacity(raw.len());
    for (i, token) in raw.iter().enumerate() {
        let segment = if let Some(name) = token.strip_prefix(':') {
            if name.is_empty() {
                return Err(RouteError::InvalidRoute {
                    path: normalized.to_string(),
                    reason: "param segment has no name".to_string(),
                });
            }
            Segment {
                kind: SegmentKind::Param,
                label: name.to_string(),
            }
        } else if token.starts_with('*') {
            if i + 1 != raw.len() {
                return Err(RouteError::InvalidRoute {
                    path: normalized.to_string(),
                    reason: "wildcard must be the final segment".to_string(),
                });
            }
            Segment {
                kind: SegmentKind::Wildcard,
                label: "*".to_string(),
            }
        } else {
            Segment {
                kind: SegmentKind::Static,
                label: token.to_string(),
            }
        };
        segments.push(segment);
    }
    Ok(segments)
}
