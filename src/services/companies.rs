use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::database::models::Company;
use crate::database::{Repository, Store};
use crate::filter::FilterData;

use super::{ServiceError, ServiceResult};

/// Tenant registry maintenance, used by the admin CLI
pub struct CompanyService {
    companies: Repository<Company>,
}

impl CompanyService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            companies: Repository::new(store),
        }
    }

    pub async fn create(&self, name: &str) -> ServiceResult<Company> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidState("Company name is required".to_string()));
        }
        if self.companies.exists(FilterData::where_(json!({ "name": name }))).await? {
            return Err(ServiceError::AlreadyExists(format!("company {}", name)));
        }

        let mut company = Company::new(name);
        self.companies.save(&mut company).await?;
        info!("Created company {} (id={:?})", company.name, company.id);
        Ok(company)
    }

    pub async fn list(&self) -> ServiceResult<Vec<Company>> {
        Ok(self.companies.filter(FilterData::default().order_by("id asc")).await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Company> {
        match self.companies.find(FilterData::by_id(id)).await? {
            Some(company) => Ok(company),
            None => Err(ServiceError::NotFound(format!("company {}", id))),
        }
    }
}
