use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tenant_scoped_entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: Option<i64>,
    pub company_id: Option<i64>,
    pub exam_title: String,
    pub exam_code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub date_created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

tenant_scoped_entity!(Exam, "exams");

impl Exam {
    pub fn new(exam_title: impl Into<String>, exam_code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            company_id: None,
            exam_title: exam_title.into(),
            exam_code: exam_code.into(),
            description: None,
            date_created: now,
            last_updated: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

impl std::fmt::Display for Exam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.exam_title, self.exam_code)
    }
}
