// crates/ferrule-daemon/src/context.rs
//
// Request context for the example application, built from the
// `x-user-id` and `x-user-role` headers.

use http::HeaderMap;
use serde::{Deserialize, Serialize};

use ferrule_core::{AuthGuard, GuardOutcome};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct AppContext {
    pub user: Option<CurrentUser>,
}

impl AppContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(id: impl Into<String>, role: Role) -> Self {
        Self {
            user: Some(CurrentUser {
                id: id.into(),
                role,
            }),
        }
    }

    /// Both headers must be present and the role must be known; anything
    /// else yields an anonymous context.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        match (header(USER_ID_HEADER), header(USER_ROLE_HEADER).and_then(Role::parse)) {
            (Some(id), Some(role)) if !id.is_empty() => Self::authenticated(id, role),
            _ => Self::anonymous(),
        }
    }
}

/// Allows any caller with a user attached.
pub fn authenticated() -> AuthGuard<AppContext> {
    AuthGuard::new(|ctx: &AppContext| ctx.user.is_some()).named("authenticated")
}

/// Allows admins only.
pub fn admin_only() -> AuthGuard<AppContext> {
    AuthGuard::new(|ctx: &AppContext| match &ctx.user {
        Some(user) if user.role == Role::Admin => GuardOutcome::Allow,
        _ => GuardOutcome::Forbidden,
    })
    .named("admin")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_context_from_headers() {
        let ctx = AppContext::from_headers(&headers(&[
            (USER_ID_HEADER, "u1"),
            (USER_ROLE_HEADER, "admin"),
        ]));
        assert_eq!(
            ctx.user,
            Some(CurrentUser {
                id: "u1".to_string(),
                role: Role::Admin,
            })
        );
    }

    #[test]
    fn test_unknown_role_is_anonymous() {
        let ctx = AppContext::from_headers(&headers(&[
            (USER_ID_HEADER, "u1"),
            (USER_ROLE_HEADER, "root"),
        ]));
        assert!(ctx.user.is_none());
        assert!(AppContext::from_headers(&headers(&[(USER_ROLE_HEADER, "user")]))
            .user
            .is_none());
    }
}
