use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tenant_scoped_entity;

/// One attempt of a taker at an exam, optionally watched by a proctor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Option<i64>,
    pub company_id: Option<i64>,
    pub exam_id: i64,
    pub taker_id: i64,
    #[serde(default)]
    pub proctor_id: Option<i64>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
}

tenant_scoped_entity!(Session, "sessions");

impl Session {
    pub fn start(exam_id: i64, taker_id: i64, proctor_id: Option<i64>) -> Self {
        Self {
            id: None,
            company_id: None,
            exam_id,
            taker_id,
            proctor_id,
            start_time: Utc::now(),
            end_time: None,
            is_active: true,
        }
    }

    /// Closed sessions accept no further artifacts
    pub fn is_closed(&self) -> bool {
        self.end_time.is_some() || !self.is_active
    }

    pub fn end(&mut self) {
        self.end_time = Some(Utc::now());
        self.is_active = false;
    }
}
