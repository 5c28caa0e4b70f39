// crates/ferrule-core/src/error.rs
//
// Error taxonomy for Ferrule.
//
// `RpcError` covers everything that can go wrong while an endpoint is being
// invoked. `DefinitionError` covers wiring mistakes that the router compiler
// detects before any endpoint runs.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which side of the handler a schema check ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationTarget {
    Input,
    Output,
}

impl fmt::Display for ValidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationTarget::Input => write!(f, "input"),
            ValidationTarget::Output => write!(f, "output"),
        }
    }
}

/// A value was rejected by a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}", .issues.join("; "))]
pub struct ValidationError {
    /// Human-readable issues, one per failed constraint.
    pub issues: Vec<String>,
}

impl ValidationError {
    /// Build a validation error with a single issue.
    pub fn new(issue: impl Into<String>) -> Self {
        Self {
            issues: vec![issue.into()],
        }
    }

    /// Build a validation error from several issues.
    pub fn with_issues(issues: Vec<String>) -> Self {
        Self { issues }
    }
}

/// Wire-level classification of an [`RpcError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    TooManyRequests,
    NotFound,
    MethodNotSupported,
    InternalServerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::TooManyRequests => "TOO_MANY_REQUESTS",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-time errors surfaced to the caller of an endpoint.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// Input or output failed schema validation.
    #[error("Invalid {target}: {source}")]
    Validation {
        target: ValidationTarget,
        #[source]
        source: ValidationError,
    },

    /// An auth guard rejected the caller as unauthenticated.
    #[error("Unauthorized")]
    Unauthorized,

    /// An auth guard rejected the caller as lacking permission.
    #[error("Forbidden")]
    Forbidden,

    /// The endpoint's point budget for the current window is exhausted.
    #[error("Rate limit exceeded for {path}")]
    RateLimitExceeded { path: String },

    /// No endpoint is registered under the requested path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The endpoint exists but cannot be served in the requested way.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Anything the handler body or the plumbing failed with.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    /// Shorthand for an input validation failure.
    pub fn invalid_input(source: ValidationError) -> Self {
        RpcError::Validation {
            target: ValidationTarget::Input,
            source,
        }
    }

    /// Shorthand for an output validation failure.
    pub fn invalid_output(source: ValidationError) -> Self {
        RpcError::Validation {
            target: ValidationTarget::Output,
            source,
        }
    }

    /// Shorthand for an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        RpcError::Internal(message.into())
    }

    /// The wire classification of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RpcError::Validation { .. } => ErrorCode::BadRequest,
            RpcError::Unauthorized => ErrorCode::Unauthorized,
            RpcError::Forbidden => ErrorCode::Forbidden,
            RpcError::RateLimitExceeded { .. } => ErrorCode::TooManyRequests,
            RpcError::NotFound(_) => ErrorCode::NotFound,
            RpcError::Unsupported(_) => ErrorCode::MethodNotSupported,
            RpcError::Internal(_) => ErrorCode::InternalServerError,
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::Internal(format!("Serialization error: {}", e))
    }
}

/// Wiring mistakes detected while compiling the routing table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// A positional argument of the member has no bound source.
    #[error("{class}.{member}: argument {index} has no bound source")]
    UnboundArgument {
        class: String,
        member: String,
        index: usize,
    },

    /// Two bindings target the same positional argument.
    #[error("{class}.{member}: argument {index} is bound more than once")]
    DuplicateBinding {
        class: String,
        member: String,
        index: usize,
    },

    /// A binding targets an index past the member's arity.
    #[error("{class}.{member}: binding at index {index} exceeds arity {arity}")]
    BindingOutOfRange {
        class: String,
        member: String,
        index: usize,
        arity: usize,
    },

    /// Declarations name a member the controller does not expose.
    #[error("{class}.{member}: declared but not part of the controller's members")]
    UnknownMember { class: String, member: String },

    /// Two endpoints resolve to the same `group.endpoint` path.
    #[error("endpoint {group}.{endpoint} is registered more than once")]
    EndpointCollision { group: String, endpoint: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            RpcError::invalid_input(ValidationError::new("bad")).code(),
            ErrorCode::BadRequest
        );
        assert_eq!(RpcError::Unauthorized.code(), ErrorCode::Unauthorized);
        assert_eq!(RpcError::Forbidden.code(), ErrorCode::Forbidden);
        assert_eq!(
            RpcError::RateLimitExceeded {
                path: "users.getById".to_string()
            }
            .code()
            .as_str(),
            "TOO_MANY_REQUESTS"
        );
        assert_eq!(
            RpcError::internal("boom").code(),
            ErrorCode::InternalServerError
        );
    }

    #[test]
    fn test_validation_message_joins_issues() {
        let err = RpcError::invalid_output(ValidationError::with_issues(vec![
            "name: expected string".to_string(),
            "email: missing".to_string(),
        ]));
        assert_eq!(
            err.to_string(),
            "Invalid output: name: expected string; email: missing"
        );
    }

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::TooManyRequests).unwrap();
        assert_eq!(json, "\"TOO_MANY_REQUESTS\"");
    }
}
