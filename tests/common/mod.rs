#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use proctor_api::app::{build_router_with, AppState};
use proctor_api::auth::{generate_jwt, Claims};
use proctor_api::config::{config, TenancyConfig};
use proctor_api::database::models::{Company, User};
use proctor_api::database::{MemoryStore, Repository, Store};
use proctor_api::services::users::NewUser;
use proctor_api::tenancy::{context::run_as, Actor};

pub const PASSWORD: &str = "correct-horse";

/// An in-memory app seeded with two companies:
///
/// - Acme: `alice` (member), `proctor_a` (member)
/// - Globex: `bob` (member)
/// - `root`: superuser, registered under Acme but sees every company
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub acme: i64,
    pub globex: i64,
    users: HashMap<String, User>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_tenancy(config().tenancy.clone()).await
    }

    pub async fn with_tenancy(tenancy: TenancyConfig) -> Result<Self> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone());
        let companies = Repository::<Company>::new(store);

        let (acme, globex, users) = run_as(Actor::system(), async {
            let mut acme = Company::new("Acme");
            companies.save(&mut acme).await?;
            let mut globex = Company::new("Globex");
            companies.save(&mut globex).await?;
            let (acme, globex) = (acme.id.context("acme id")?, globex.id.context("globex id")?);

            let mut users = HashMap::new();
            for (username, company_id, is_superuser) in [
                ("alice", acme, false),
                ("proctor_a", acme, false),
                ("bob", globex, false),
                ("root", acme, true),
            ] {
                let user = state
                    .users
                    .create_user(NewUser {
                        company_id,
                        username: username.to_string(),
                        password: PASSWORD.to_string(),
                        name: String::new(),
                        is_superuser,
                    })
                    .await?;
                users.insert(username.to_string(), user);
            }
            anyhow::Ok((acme, globex, users))
        })
        .await?;

        Ok(Self {
            router: build_router_with(state.clone(), tenancy),
            state,
            acme,
            globex,
            users,
        })
    }

    pub fn user(&self, username: &str) -> &User {
        &self.users[username]
    }

    /// Bearer token for a seeded user
    pub fn token(&self, username: &str) -> Result<String> {
        let claims = Claims::for_user(self.user(username)).context("seeded user has an id")?;
        Ok(generate_jwt(&claims)?)
    }

    /// Send a raw body and return the undecoded response
    pub async fn send(&self, method: Method, path: &str, token: Option<&str>, body: Option<Vec<u8>>) -> Result<(StatusCode, Bytes)> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder.header(header::CONTENT_TYPE, "application/json").body(Body::from(body))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        Ok((status, to_bytes(response.into_body(), usize::MAX).await?))
    }

    pub async fn request(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let body = body.map(|body| serde_json::to_vec(&body)).transpose()?;
        let (status, bytes) = self.send(method, path, token, body).await?;
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok((status, json))
    }

    pub async fn get(&self, path: &str, as_user: Option<&str>) -> Result<(StatusCode, Value)> {
        let token = as_user.map(|u| self.token(u)).transpose()?;
        self.request(Method::GET, path, token.as_deref(), None).await
    }

    pub async fn post(&self, path: &str, as_user: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        let token = as_user.map(|u| self.token(u)).transpose()?;
        self.request(Method::POST, path, token.as_deref(), Some(body)).await
    }

    pub async fn put(&self, path: &str, as_user: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        let token = as_user.map(|u| self.token(u)).transpose()?;
        self.request(Method::PUT, path, token.as_deref(), Some(body)).await
    }

    pub async fn patch(&self, path: &str, as_user: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        let token = as_user.map(|u| self.token(u)).transpose()?;
        self.request(Method::PATCH, path, token.as_deref(), Some(body)).await
    }

    pub async fn delete(&self, path: &str, as_user: Option<&str>) -> Result<(StatusCode, Value)> {
        let token = as_user.map(|u| self.token(u)).transpose()?;
        self.request(Method::DELETE, path, token.as_deref(), None).await
    }

    /// Create an exam as `as_user` and return its id
    pub async fn create_exam(&self, as_user: &str, title: &str, code: &str) -> Result<i64> {
        let (status, body) = self
            .post("/api/exams/", Some(as_user), serde_json::json!({ "exam_title": title, "exam_code": code }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create exam failed: {} {}", status, body);
        body["data"]["id"].as_i64().context("exam id")
    }
}

/// `data` array of a successful list response
pub fn data_array(body: &Value) -> Vec<Value> {
    body["data"].as_array().cloned().unwrap_or_default()
}
