use crate::database::{JobInsert, JobRepository};
use crate::dto::company_dto::PublishJobRequest;
use crate::error::{Error, Result};
use crate::models::job::Job;
use crate::utils::time::now;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct JobService {
    repo: Arc<dyn JobRepository>,
}

impl JobService {
    pub fn new(repo: Arc<dyn JobRepository>) -> Self {
        Self { repo }
    }

    /// Only verified companies may publish. PREMIUM companies publish featured.
    pub async fn publish(&self, company_code: &str, payload: PublishJobRequest) -> Result<Job> {
        payload.validate()?;
        let job = Job {
            id: Uuid::new_v4(),
            company_code: company_code.to_string(),
            title: payload.title.trim().to_string(),
            location: payload.location.trim().to_string(),
            profile_type: payload.profile_type,
            description: payload
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            active: true,
            is_featured: false,
            created_at: now(),
        };

        match self.repo.insert_job(&job).await? {
            JobInsert::Created(job) => {
                tracing::info!(job_id = %job.id, company = %company_code, featured = job.is_featured, "job published");
                Ok(job)
            }
            JobInsert::Unverified => Err(Error::Validation(
                "Your company is pending verification and cannot publish yet".to_string(),
            )),
            JobInsert::UnknownCompany => {
                Err(Error::NotFound(format!("Company {} not found", company_code)))
            }
        }
    }

    pub async fn list_for_company(&self, company_code: &str) -> Result<Vec<Job>> {
        self.repo.list_jobs(company_code).await
    }

    pub async fn list_active(&self) -> Result<Vec<Job>> {
        self.repo.list_active_jobs().await
    }

    pub async fn set_active(&self, company_code: &str, id: Uuid, active: bool) -> Result<Job> {
        self.repo
            .set_job_active(company_code, id, active)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))
    }
}
