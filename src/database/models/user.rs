use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tenant_scoped_entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub company_id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

tenant_scoped_entity!(User, "users");

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            company_id: None,
            username: username.into(),
            name: String::new(),
            password_hash: String::new(),
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    /// API representation; the password hash never leaves the service
    pub fn to_public(&self) -> Value {
        json!({
            "id": self.id,
            "company_id": self.company_id,
            "username": self.username,
            "name": self.name,
            "is_superuser": self.is_superuser,
            "is_active": self.is_active,
            "date_joined": self.date_joined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_view_hides_password_hash() {
        let mut user = User::new("ana");
        user.password_hash = "sha256$salt$digest".to_string();
        let public = user.to_public();
        assert!(public.get("password_hash").is_none());
        assert_eq!(public["username"], "ana");
    }
}
