use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::entity::Entity;

/// A tenant. The registry of companies is shared by every tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: Option<i64>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

impl Entity for Company {
    const TABLE: &'static str = "companies";
    const TENANT_COLUMN: Option<&'static str> = None;

    fn id(&self) -> Option<i64> {
        self.id
    }
}
