//! User model

use serde::{Deserialize, Serialize};

/// What a requester is allowed to do with the shared round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Gets free (random, unpersisted) rounds and respects the lock
    #[default]
    Ordinary,
    /// Drives the fixed rotation and owns the lock
    Privileged,
}

impl Role {
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Privileged)
    }
}

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Database ID
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Password hash (not serialized to JSON)
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Unix timestamp (seconds)
    #[serde(default)]
    pub created_at: i64,
}

impl User {
    /// Create a new user
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: 0,
            username,
            email,
            password: password_hash,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// The authenticated caller of a core operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Requester {
    pub fn new(user_id: i64, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_not_serialized() {
        let user = User::new("dj".into(), "dj@party.test".into(), "hash".into());
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["email"], "dj@party.test");
    }

    #[test]
    fn test_default_role_is_ordinary() {
        assert_eq!(Role::default(), Role::Ordinary);
        assert!(Requester::new(1, "host", Role::Privileged).is_privileged());
        assert!(!Requester::new(2, "guest", Role::Ordinary).is_privileged());
    }
}
