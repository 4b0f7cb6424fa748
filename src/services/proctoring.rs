use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::database::models::{Exam, RecordingType, Session, SessionPhoto, SessionRecord, User};
use crate::database::{Repository, Store};
use crate::filter::FilterData;
use crate::tenancy::{context::run_as, Actor};

use super::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize)]
pub struct StartSession {
    /// Exam code
    pub exam: String,
    /// Taker username; unknown takers are created in the exam's company
    pub taker: String,
    #[serde(default)]
    pub proctor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecord {
    pub recording_type: String,
    pub file: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TakerSummary {
    pub id: i64,
    pub username: String,
    pub attempts_count: i64,
    pub latest_attempt: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TakerSessions {
    pub count: usize,
    pub photo_count: i64,
    pub record_count: i64,
    pub sessions: Vec<Session>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `desc` selects descending; anything else ascending
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

/// Session lifecycle and the reports built on top of it
pub struct ProctoringService {
    exams: Repository<Exam>,
    users: Repository<User>,
    sessions: Repository<Session>,
    photos: Repository<SessionPhoto>,
    records: Repository<SessionRecord>,
}

impl ProctoringService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            exams: Repository::new(store.clone()),
            users: Repository::new(store.clone()),
            sessions: Repository::new(store.clone()),
            photos: Repository::new(store.clone()),
            records: Repository::new(store),
        }
    }

    /// Exam with `exam_code` visible to the caller
    pub async fn exam_by_code(&self, exam_code: &str) -> ServiceResult<Exam> {
        let mut exams = self.exams.filter(FilterData::where_(json!({ "exam_code": exam_code }))).await?;
        match exams.len() {
            0 => Err(ServiceError::NotFound(format!("exam {}", exam_code))),
            1 => Ok(exams.remove(0)),
            // Only a super-actor sees more than one company
            _ => Err(ServiceError::InvalidState(format!("Exam code {} exists in several companies", exam_code))),
        }
    }

    pub async fn user_by_username(&self, username: &str) -> ServiceResult<User> {
        self.users
            .find(FilterData::where_(json!({ "username": username })))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", username)))
    }

    /// Usernames are unique across companies, so this lookup runs unscoped
    async fn any_user_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        let users = self.users.clone();
        let query = FilterData::where_(json!({ "username": username }));
        Ok(run_as(Actor::system(), async move { users.find(query).await }).await?)
    }

    /// Translate `taker`/`exam`/`proctor` filters into a session query
    pub async fn session_query(
        &self,
        taker: Option<&str>,
        exam: Option<&str>,
        proctor: Option<&str>,
    ) -> ServiceResult<FilterData> {
        let mut query = FilterData::default().order_by("start_time desc, id desc");
        if let Some(username) = taker {
            query = query.and_where(json!({ "taker_id": { "$in": self.user_ids(username).await? } }));
        }
        if let Some(code) = exam {
            let ids = self.exam_ids(code).await?;
            query = query.and_where(json!({ "exam_id": { "$in": ids } }));
        }
        if let Some(username) = proctor {
            query = query.and_where(json!({ "proctor_id": { "$in": self.user_ids(username).await? } }));
        }
        Ok(query)
    }

    async fn user_ids(&self, username: &str) -> ServiceResult<Vec<i64>> {
        let users = self.users.filter(FilterData::where_(json!({ "username": username }))).await?;
        Ok(users.iter().filter_map(|u| u.id).collect())
    }

    async fn exam_ids(&self, exam_code: &str) -> ServiceResult<Vec<i64>> {
        let exams = self.exams.filter(FilterData::where_(json!({ "exam_code": exam_code }))).await?;
        Ok(exams.iter().filter_map(|e| e.id).collect())
    }

    /// Open a session; it belongs to the exam's company
    pub async fn start_session(&self, request: StartSession) -> ServiceResult<Session> {
        let exam = self.exam_by_code(&request.exam).await?;
        let exam_id = saved(exam.id)?;
        let company_id = exam.company_id;

        let taker = match self.any_user_by_username(&request.taker).await? {
            Some(user) => user,
            None => {
                let username = request.taker.trim();
                if username.is_empty() {
                    return Err(ServiceError::InvalidState("Taker username is required".to_string()));
                }
                let mut user = User::new(username);
                user.company_id = company_id;
                self.users.save(&mut user).await?;
                info!("Created taker {} for exam {}", user.username, exam.exam_code);
                user
            }
        };
        if !in_exam_company("Taker", &taker, company_id) {
            return Err(ServiceError::InvalidState(format!("Taker {} is not available", taker.username)));
        }

        let proctor_id = match request.proctor.as_deref().filter(|p| !p.is_empty()) {
            Some(username) => {
                // A proctor from another company reads exactly like a missing one
                let proctor = self
                    .any_user_by_username(username)
                    .await?
                    .filter(|proctor| in_exam_company("Proctor", proctor, company_id))
                    .ok_or_else(|| ServiceError::InvalidState(format!("Proctor {} does not exist", username)))?;
                proctor.id
            }
            None => None,
        };

        let mut session = Session::start(exam_id, saved(taker.id)?, proctor_id);
        session.company_id = company_id;
        self.sessions.save(&mut session).await?;
        info!("Started session {:?} for {} on {}", session.id, taker.username, exam.exam_code);
        Ok(session)
    }

    pub async fn end_session(&self, mut session: Session) -> ServiceResult<Session> {
        if session.is_closed() {
            return Err(ServiceError::InvalidState("This session is already closed.".to_string()));
        }
        session.end();
        self.sessions.save(&mut session).await?;
        info!("Ended session {:?}", session.id);
        Ok(session)
    }

    /// Remove a session together with its photos and records
    pub async fn delete_session(&self, session: &Session) -> ServiceResult<()> {
        let by_session = || FilterData::where_(json!({ "session_id": session.id }));
        let photos = self.photos.delete_where(by_session()).await?;
        let records = self.records.delete_where(by_session()).await?;
        self.sessions.delete(session).await?;
        info!("Deleted session {:?} with {} photos and {} records", session.id, photos, records);
        Ok(())
    }

    pub async fn add_photo(&self, session: &Session, photo: &str) -> ServiceResult<SessionPhoto> {
        if session.is_closed() {
            return Err(ServiceError::InvalidState(
                "This session has been closed and cannot accept new photo.".to_string(),
            ));
        }
        let mut photo = SessionPhoto::new(saved(session.id)?, photo)?;
        photo.company_id = session.company_id;
        self.photos.save(&mut photo).await?;
        Ok(photo)
    }

    pub async fn add_record(&self, session: &Session, record: NewRecord) -> ServiceResult<SessionRecord> {
        if session.is_closed() {
            return Err(ServiceError::InvalidState(
                "This session has been closed and cannot accept new record.".to_string(),
            ));
        }
        let recording_type: RecordingType = record.recording_type.parse()?;
        let mut record = SessionRecord::new(saved(session.id)?, recording_type, &record.file)?;
        record.company_id = session.company_id;
        self.records.save(&mut record).await?;
        Ok(record)
    }

    pub async fn photos_for(&self, session: &Session) -> ServiceResult<Vec<SessionPhoto>> {
        let query = FilterData::where_(json!({ "session_id": saved(session.id)? })).order_by("captured_at asc, id asc");
        Ok(self.photos.filter(query).await?)
    }

    pub async fn records_for(&self, session: &Session) -> ServiceResult<Vec<SessionRecord>> {
        let query = FilterData::where_(json!({ "session_id": saved(session.id)? })).order_by("recorded_at asc, id asc");
        Ok(self.records.filter(query).await?)
    }

    /// Everyone who sat `exam_code`, with attempt counts, ordered by user id
    pub async fn takers_by_exam(&self, exam_code: &str) -> ServiceResult<Vec<TakerSummary>> {
        let exam = self.exam_by_code(exam_code).await?;
        let sessions = self.sessions.filter(FilterData::where_(json!({ "exam_id": saved(exam.id)? }))).await?;

        let mut attempts: BTreeMap<i64, (i64, Option<DateTime<Utc>>)> = BTreeMap::new();
        for session in &sessions {
            let entry = attempts.entry(session.taker_id).or_insert((0, None));
            entry.0 += 1;
            entry.1 = entry.1.max(Some(session.start_time));
        }
        if attempts.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<Value> = attempts.keys().map(|id| json!(id)).collect();
        let users = self
            .users
            .filter(FilterData::where_(json!({ "id": { "$in": ids } })).order_by("id asc"))
            .await?;

        Ok(users
            .into_iter()
            .filter_map(|user| {
                let id = user.id?;
                let (attempts_count, latest_attempt) = attempts.get(&id).copied()?;
                Some(TakerSummary {
                    id,
                    username: user.username,
                    attempts_count,
                    latest_attempt,
                })
            })
            .collect())
    }

    /// Sessions of one taker on one exam, with artifact totals
    pub async fn sessions_by_exam_and_taker(
        &self,
        exam_code: &str,
        taker_username: &str,
        sort: SortOrder,
    ) -> ServiceResult<TakerSessions> {
        let exam = self.exam_by_code(exam_code).await?;
        let taker = self.user_by_username(taker_username).await?;

        let order = match sort {
            SortOrder::Asc => "id asc",
            SortOrder::Desc => "id desc",
        };
        let query = FilterData::where_(json!({ "exam_id": saved(exam.id)?, "taker_id": saved(taker.id)? })).order_by(order);
        let sessions = self.sessions.filter(query).await?;

        let session_ids: Vec<i64> = sessions.iter().filter_map(|s| s.id).collect();
        let (photo_count, record_count) = if session_ids.is_empty() {
            (0, 0)
        } else {
            let by_session = || FilterData::where_(json!({ "session_id": { "$in": session_ids } }));
            (self.photos.count(by_session()).await?, self.records.count(by_session()).await?)
        };

        Ok(TakerSessions {
            count: sessions.len(),
            photo_count,
            record_count,
            sessions,
        })
    }
}

fn saved(id: Option<i64>) -> ServiceResult<i64> {
    id.ok_or_else(|| ServiceError::InvalidState("Record has not been saved".to_string()))
}

fn in_exam_company(role: &str, user: &User, company_id: Option<i64>) -> bool {
    if user.company_id != company_id {
        warn!("{} {} belongs to company {:?}, exam to {:?}", role, user.username, user.company_id, company_id);
        return false;
    }
    true
}
