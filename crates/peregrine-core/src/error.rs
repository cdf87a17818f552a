//! Error types for route registration.
//!
//! Every variant here is fatal to startup: a process should never begin
//! serving with a partially built routing table. The `App` builder sugar
//! therefore panics with the error display, while `try_route` surfaces the
//! `Result` for applications that want to abort on their own terms.

use crate::method::Method;

/// Result type alias for Peregrine operations.
pub type Result<T, E = RouteError> = std::result::Result<T, E>;

/// Errors raised while registering a route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// The same `(method, path)` pair was registered twice.
    #[error("duplicate route: {method} {path} is already registered")]
    DuplicateRoute { method: Method, path: String },

    /// A dynamic segment is ambiguous against an existing sibling, e.g. two
    /// differently named params at the same trie level.
    #[error("conflicting segment `{segment}` while registering {path}")]
    ConflictingSegment { segment: String, path: String },

    /// The pattern itself is malformed: a wildcard in non-terminal position,
    /// or a param segment with an empty name.
    #[error("invalid route {path}: {reason}")]
    InvalidRoute { path: String, reason: String },

    /// The pattern exceeds the segment limit.
    #[error("route {path} exceeds the maximum of {max} segments")]
    PathTooLong { path: String, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_route() {
        let err = RouteError::DuplicateRoute {
            method: Method::Get,
            path: "/users".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "duplicate route: GET /users is already registered"
        );
    }
}
