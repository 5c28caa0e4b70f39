// crates/ferrule-daemon/src/app.rs
//
// Wires the example application together: declarations, the base procedure
// templates the controllers refer to, and the compiled routing table.

use std::sync::Arc;

use serde_json::json;

use ferrule_core::{ControllerInstance, DeclarationStore, DefinitionError};
use ferrule_rpc::{logging, ProcedureTemplate, RateLimiter, RouterCompiler, RoutingTable};

use crate::config::DaemonConfig;
use crate::context::AppContext;
use crate::controllers::{MathController, UsersController};
use crate::service::UsersService;

/// Base procedure that logs every call.
pub const LOGGED_PROCEDURE: &str = "logged";

/// Record every controller's declarations, then apply configured overrides.
pub fn declarations(config: &DaemonConfig) -> DeclarationStore<AppContext> {
    let mut store = DeclarationStore::new();
    store
        .register::<UsersController>()
        .register::<MathController>();

    store
        .method::<UsersController>("get_by_id")
        .rate_limit(config.lookup_rate_limit.clone());

    store
}

/// Compile the application's routing table.
pub fn build_table(
    store: &DeclarationStore<AppContext>,
    users: Arc<UsersService>,
    limiter: RateLimiter,
) -> Result<RoutingTable<AppContext>, DefinitionError> {
    RouterCompiler::new(store)
        .base_procedure(
            LOGGED_PROCEDURE,
            ProcedureTemplate::new()
                .middleware(logging())
                .meta("logged", json!(true)),
        )
        .rate_limiter(limiter)
        .compile([
            ControllerInstance::new(UsersController::new(users)),
            ControllerInstance::new(MathController),
        ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ferrule_core::{EndpointKind, ErrorCode};
    use ferrule_rpc::Caller;
    use serde_json::Value;

    use crate::context::Role;

    fn table() -> Arc<RoutingTable<AppContext>> {
        let store = declarations(&DaemonConfig::default());
        let table = build_table(&store, Arc::new(UsersService::new()), RateLimiter::new()).unwrap();
        Arc::new(table)
    }

    fn admin(table: &Arc<RoutingTable<AppContext>>) -> Caller<AppContext> {
        table
            .clone()
            .caller(AppContext::authenticated("u1", Role::Admin))
    }

    fn alice() -> Value {
        json!({ "name": "Alice", "email": "alice@example.com" })
    }

    #[test]
    fn test_table_layout() {
        let table = table();
        assert_eq!(table.group_names().collect::<Vec<_>>(), vec!["math", "users"]);
        assert_eq!(
            table.resolve("users.events").unwrap().kind(),
            EndpointKind::Subscription
        );
        assert_eq!(
            table.resolve("users.create").unwrap().kind(),
            EndpointKind::Mutation
        );
        assert_eq!(
            table.resolve("math.double").unwrap().meta().get("logged"),
            Some(&json!(true))
        );
    }

    #[tokio::test]
    async fn test_create_then_fetch() {
        let table = table();
        let caller = admin(&table);

        let created = caller.call("users.create", alice()).await.unwrap();
        assert!(created["created_at"].is_string());

        let fetched = caller
            .call("users.getById", json!({ "id": created["id"] }))
            .await
            .unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_rate_limit() {
        let table = table();
        let caller = admin(&table);
        let created = caller.call("users.create", alice()).await.unwrap();
        let lookup = json!({ "id": created["id"] });

        assert!(caller.call("users.getById", lookup.clone()).await.is_ok());
        let err = caller
            .call("users.getById", lookup.clone())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TooManyRequests);

        tokio::time::advance(Duration::from_millis(1100)).await;
        assert!(caller.call("users.getById", lookup).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_create_input() {
        let err = admin(&table())
            .call("users.create", json!({ "name": "Al", "email": "not-email" }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert!(err.to_string().contains("name"));
        assert!(err.to_string().contains("email"));
    }

    #[tokio::test]
    async fn test_unauthorized_and_forbidden() {
        let table = table();

        let anonymous = table.clone().caller(AppContext::anonymous());
        let err = anonymous.call("users.create", alice()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);

        let user = table.clone().caller(AppContext::authenticated("u2", Role::User));
        let err = user.call("users.create", alice()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_math_double() {
        let doubled = admin(&table())
            .call("math.double", json!({ "x": 2 }))
            .await
            .unwrap();
        assert_eq!(doubled.as_f64(), Some(4.0));
    }

    #[tokio::test]
    async fn test_math_is_public() {
        let table = table();
        let anonymous = table.caller(AppContext::anonymous());
        assert!(anonymous.call("math.double", json!({ "x": 1.5 })).await.is_ok());
    }

    #[tokio::test]
    async fn test_events_stream_new_users() {
        let table = table();
        let caller = admin(&table);

        let mut events = caller.subscribe("users.events", Value::Null).await.unwrap();
        let created = caller.call("users.create", alice()).await.unwrap();

        let event = events.next().await.unwrap();
        assert_eq!(event["id"], created["id"]);
        events.unsubscribe();
    }
}
