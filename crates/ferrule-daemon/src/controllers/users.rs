// crates/ferrule-daemon/src/controllers/users.rs
//
// The `users` routing group: lookup, creation, and a live feed of newly
// created users.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use ferrule_core::{
    Arguments, Controller, DeclarationStore, Member, ProcedureOptions, RateLimitPolicy, Reply,
    RouterOptions, RpcError, RpcResult, SerdeSchema, Subscription,
};
use ferrule_rpc::logging;

use crate::context::{admin_only, authenticated, AppContext};
use crate::service::UsersService;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserInput {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
}

/// Deliberately loose address check: exactly one `@`, a non-empty local
/// part, and a domain containing a dot with text on both sides. It is not
/// an RFC 5322 validator; quoted local parts and similar forms are not
/// handled, and some invalid addresses pass.
fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

fn create_schema() -> SerdeSchema<CreateUserInput> {
    SerdeSchema::new()
        .refine(|input: &CreateUserInput| {
            if input.name.chars().count() >= 3 {
                Ok(())
            } else {
                Err("name must contain at least 3 characters".to_string())
            }
        })
        .refine(|input: &CreateUserInput| {
            if is_email(&input.email) {
                Ok(())
            } else {
                Err("email must be a valid address".to_string())
            }
        })
}

pub struct UsersController {
    users: Arc<UsersService>,
}

impl UsersController {
    pub fn new(users: Arc<UsersService>) -> Self {
        Self { users }
    }

    fn events(&self) -> Subscription {
        let mut created = self.users.subscribe();
        let (tx, subscription) = Subscription::channel(16);

        let forward = tokio::spawn(async move {
            loop {
                match created.recv().await {
                    Ok(user) => {
                        let Ok(event) = serde_json::to_value(&user) else {
                            continue;
                        };
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("users.events subscriber lagged by {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        subscription.on_teardown(move || forward.abort())
    }
}

#[async_trait]
impl Controller<AppContext> for UsersController {
    fn declare(store: &mut DeclarationStore<AppContext>) {
        store.class::<UsersController>().router(
            Some("users"),
            RouterOptions::new()
                .middleware(logging())
                .auth(authenticated()),
        );

        store
            .method::<UsersController>("get_by_id")
            .query(
                Some("getById"),
                ProcedureOptions::new()
                    .input(SerdeSchema::<GetUserInput>::new().shared())
                    .rate_limit(RateLimitPolicy::new(1, 1)),
            )
            .bind_context(0)
            .bind_input(1);

        store
            .method::<UsersController>("create")
            .mutation(
                None,
                ProcedureOptions::new()
                    .input(create_schema().shared())
                    .auth(admin_only()),
            )
            .bind_input(0);

        store
            .method::<UsersController>("events")
            .subscription(None, ProcedureOptions::new());
    }

    fn members(&self) -> Vec<Member> {
        vec![
            Member::new("get_by_id", 2),
            Member::new("create", 1),
            Member::new("events", 0),
        ]
    }

    async fn invoke(&self, member: &str, args: Arguments<AppContext>) -> RpcResult<Reply> {
        match member {
            "get_by_id" => {
                let input: GetUserInput = args.input(1)?;
                Reply::json(&self.users.find_by_id(input.id).await)
            }
            "create" => {
                let input: CreateUserInput = args.input(0)?;
                Reply::json(&self.users.create(input.name, input.email).await)
            }
            "events" => Ok(Reply::Subscription(self.events())),
            other => Err(RpcError::NotFound(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_email() {
        assert!(is_email("alice@example.com"));
        assert!(!is_email("not-email"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("alice@localhost"));
        assert!(!is_email("a@b@c.com"));
        // Accepted although not a deliverable address.
        assert!(is_email("a b@c.d"));
    }
}
