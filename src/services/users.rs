use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password};
use crate::database::models::{BaseImage, Company, User};
use crate::database::{Repository, Store};
use crate::filter::FilterData;

use super::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub company_id: i64,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_superuser: bool,
}

/// Metadata of an uploaded file; the bytes live in external storage
#[derive(Debug, Clone, Deserialize)]
pub struct ImageUpload {
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageDetail {
    pub path: String,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

/// `{ user, images }` as returned by the base image endpoints
#[derive(Debug, Clone, Serialize)]
pub struct UserBaseImages {
    pub user: i64,
    pub images: Vec<ImageDetail>,
}

pub struct UserService {
    users: Repository<User>,
    companies: Repository<Company>,
    base_images: Repository<BaseImage>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            users: Repository::new(store.clone()),
            companies: Repository::new(store.clone()),
            base_images: Repository::new(store),
        }
    }

    pub fn users(&self) -> &Repository<User> {
        &self.users
    }

    /// Check credentials; unknown users and wrong passwords fail identically
    pub async fn authenticate(&self, username: &str, password: &str) -> ServiceResult<User> {
        let user = self.users.find(FilterData::where_(json!({ "username": username }))).await?;
        match user {
            Some(user) if user.is_active && verify_password(password, &user.password_hash) => Ok(user),
            _ => {
                warn!("Failed login for {}", username);
                Err(ServiceError::InvalidCredentials)
            }
        }
    }

    pub async fn create_user(&self, new_user: NewUser) -> ServiceResult<User> {
        let username = new_user.username.trim();
        if username.is_empty() {
            return Err(ServiceError::InvalidState("Username is required".to_string()));
        }
        if new_user.password.is_empty() {
            return Err(ServiceError::InvalidState("Password is required".to_string()));
        }
        if self.companies.find(FilterData::by_id(new_user.company_id)).await?.is_none() {
            return Err(ServiceError::NotFound(format!("company {}", new_user.company_id)));
        }
        if self.users.exists(FilterData::where_(json!({ "username": username }))).await? {
            return Err(ServiceError::AlreadyExists(format!("user {}", username)));
        }

        let mut user = User::new(username);
        user.company_id = Some(new_user.company_id);
        user.name = new_user.name;
        user.is_superuser = new_user.is_superuser;
        user.password_hash = hash_password(&new_user.password);
        self.users.save(&mut user).await?;
        info!("Created user {} in company {}", user.username, new_user.company_id);
        Ok(user)
    }

    /// Base images of `user`, newest first
    pub async fn base_images(&self, user: &User) -> ServiceResult<UserBaseImages> {
        let user_id = saved_id(user)?;
        let query = FilterData::where_(json!({ "user_id": user_id })).order_by("uploaded_at desc, id desc");
        let images = self
            .base_images
            .filter(query)
            .await?
            .into_iter()
            .map(|image| ImageDetail {
                path: image.image,
                uploaded_at: image.uploaded_at,
            })
            .collect();
        Ok(UserBaseImages { user: user_id, images })
    }

    /// Validate every upload before storing any of them
    pub async fn upload_base_images(&self, user: &User, uploads: &[ImageUpload]) -> ServiceResult<UserBaseImages> {
        let user_id = saved_id(user)?;
        if uploads.is_empty() {
            return Err(ServiceError::InvalidState("No images provided".to_string()));
        }

        let mut images = uploads
            .iter()
            .map(|upload| BaseImage::upload(user_id, user.company_id, &upload.filename, upload.size))
            .collect::<Result<Vec<_>, _>>()?;
        for image in images.iter_mut() {
            self.base_images.save(image).await?;
        }
        info!("Stored {} base image(s) for user {}", images.len(), user_id);
        self.base_images(user).await
    }

    pub async fn delete_base_images(&self, user: &User) -> ServiceResult<u64> {
        let user_id = saved_id(user)?;
        let deleted = self.base_images.delete_where(FilterData::where_(json!({ "user_id": user_id }))).await?;
        info!("Deleted {} base image(s) for user {}", deleted, user_id);
        Ok(deleted)
    }
}

fn saved_id(user: &User) -> ServiceResult<i64> {
    user.id.ok_or_else(|| ServiceError::InvalidState("User has not been saved".to_string()))
}
