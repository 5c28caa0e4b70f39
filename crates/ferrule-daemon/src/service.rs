// crates/ferrule-daemon/src/service.rs
//
// In-memory user store backing the users controller. Newly created users are
// also broadcast to live `users.events` subscribers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct UsersService {
    users: RwLock<HashMap<Uuid, User>>,
    created: broadcast::Sender<User>,
}

impl Default for UsersService {
    fn default() -> Self {
        Self::new()
    }
}

impl UsersService {
    pub fn new() -> Self {
        let (created, _) = broadcast::channel(64);
        Self {
            users: RwLock::new(HashMap::new()),
            created,
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }

    pub async fn create(&self, name: String, email: String) -> User {
        let user = User {
            id: Uuid::now_v7(),
            name,
            email,
            created_at: Utc::now(),
        };
        self.users.write().await.insert(user.id, user.clone());
        // No receivers is fine; nobody is subscribed.
        let _ = self.created.send(user.clone());
        tracing::debug!("Created user {}", user.id);
        user
    }

    /// Receive every user created from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<User> {
        self.created.subscribe()
    }
}
