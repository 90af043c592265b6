//! Mock implementations for testing.
//!
//! An in-memory [`UserLookup`] so the auth service can be exercised without
//! a database.

use async_trait::async_trait;
use edudesk::db::UserLookup;
use edudesk::types::{Result, Role, User};
use std::collections::HashMap;
use std::sync::RwLock;

/// User store backed by a map keyed on user id.
#[derive(Default)]
pub struct MockUsers {
    users: RwLock<HashMap<String, User>>,
}

impl MockUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user, replacing any existing one with the same id.
    pub fn insert(&self, user: User) {
        self.users
            .write()
            .expect("mock user lock poisoned")
            .insert(user.id.clone(), user);
    }

    pub fn remove(&self, id: &str) {
        self.users
            .write()
            .expect("mock user lock poisoned")
            .remove(id);
    }

    /// Changes a stored user's role.
    pub fn set_role(&self, id: &str, role: Role) {
        if let Some(user) = self
            .users
            .write()
            .expect("mock user lock poisoned")
            .get_mut(id)
        {
            user.role = role;
        }
    }
}

#[async_trait]
impl UserLookup for MockUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .expect("mock user lock poisoned")
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .expect("mock user lock poisoned")
            .get(id)
            .cloned())
    }
}

/// Builds a user record with the given password hash.
pub fn user(id: &str, email: &str, role: Role, password_hash: &str) -> User {
    User {
        id: id.to_string(),
        email: email.to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        role,
        password_hash: password_hash.to_string(),
        created_at: 0,
        updated_at: 0,
    }
}
