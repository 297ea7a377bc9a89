use crate::database::{AssessmentRepository, ClaimedAssessment, JobRepository, LedgerRepository};
use crate::dto::assessment_dto::{ActivityBucket, AssessmentView, SubmitAssessmentRequest};
use crate::error::{Error, Result};
use crate::models::assessment::{Answer, Assessment, AssessmentStatus};
use crate::models::candidate::Candidate;
use crate::models::report::AnalysisReport;
use crate::utils::time::{bucket_by_weekday, now, window_start};
use crate::utils::token::normalize_code;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_WINDOW_DAYS: i64 = 7;
pub const MAX_WINDOW_DAYS: i64 = 90;
const DEFAULT_ROLE: &str = "General";

/// Owner of the assessment lifecycle and its redacted read model.
#[derive(Clone)]
pub struct AssessmentService {
    repo: Arc<dyn AssessmentRepository>,
    ledger: Arc<dyn LedgerRepository>,
    jobs: Arc<dyn JobRepository>,
}

impl AssessmentService {
    pub fn new(
        repo: Arc<dyn AssessmentRepository>,
        ledger: Arc<dyn LedgerRepository>,
        jobs: Arc<dyn JobRepository>,
    ) -> Self {
        Self { repo, ledger, jobs }
    }

    /// Upserts the candidate and persists a PENDING assessment.
    pub async fn create(&self, mut payload: SubmitAssessmentRequest) -> Result<Uuid> {
        payload.email = Candidate::identity_key(&payload.email);
        payload.validate()?;

        let company_code = normalize_code(&payload.company_code);
        if self.ledger.company(&company_code).await?.is_none() {
            return Err(Error::NotFound(format!("Company {} not found", company_code)));
        }

        let mut role = payload
            .role
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if let Some(job_id) = payload.job_id {
            let job = self
                .jobs
                .job(job_id)
                .await?
                .filter(|job| job.company_code == company_code)
                .ok_or_else(|| Error::NotFound(format!("Job {} not found", job_id)))?;
            if role.is_none() {
                role = Some(job.title);
            }
        }

        let candidate = Candidate {
            email: payload.email,
            name: payload.name.trim().to_string(),
            phone: payload
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            role: role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            company_code: company_code.clone(),
            profile_type: payload.profile_type,
            location: payload.location,
            updated_at: None,
        };

        let assessment = Assessment {
            id: Uuid::new_v4(),
            candidate_id: candidate.email.clone(),
            company_code,
            job_id: payload.job_id,
            answers: payload
                .answers
                .into_iter()
                .map(|a| Answer {
                    question: a.question.trim().to_string(),
                    response: a.response.trim().to_string(),
                })
                .collect(),
            status: AssessmentStatus::Pending,
            report: None,
            is_unlocked: false,
            candidate_type: candidate.profile_type,
            created_at: now(),
        };

        self.repo.insert_submission(&candidate, &assessment).await?;
        tracing::info!(
            assessment_id = %assessment.id,
            company = %assessment.company_code,
            answers = assessment.answers.len(),
            "assessment submitted"
        );
        Ok(assessment.id)
    }

    pub async fn get(&self, id: Uuid) -> Result<Assessment> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Assessment {} not found", id)))
    }

    pub async fn claim(&self, id: Uuid) -> Result<Option<ClaimedAssessment>> {
        self.repo.claim(id).await
    }

    pub async fn claim_next_pending(&self) -> Result<Option<ClaimedAssessment>> {
        self.repo.claim_next_pending().await
    }

    /// Idempotent: attaching again to a COMPLETED record overwrites the report.
    pub async fn attach_report(&self, id: Uuid, report: &AnalysisReport) -> Result<()> {
        self.repo.attach_report(id, report).await
    }

    pub async fn mark_error(&self, id: Uuid) -> Result<bool> {
        self.repo.mark_error(id).await
    }

    pub async fn stale_analyzing(&self, claimed_before: DateTime<Utc>) -> Result<Vec<Uuid>> {
        self.repo.stale_analyzing(claimed_before).await
    }

    /// Newest first, redacted per row.
    pub async fn list_for_company(&self, company_code: &str) -> Result<Vec<AssessmentView>> {
        let records = self.repo.list_for_company(company_code).await?;
        Ok(records.into_iter().map(AssessmentView::from).collect())
    }

    pub async fn get_for_company(&self, company_code: &str, id: Uuid) -> Result<AssessmentView> {
        self.repo
            .get_for_company(company_code, id)
            .await?
            .map(AssessmentView::from)
            .ok_or_else(|| Error::NotFound(format!("Assessment {} not found", id)))
    }

    pub async fn weekly_activity(
        &self,
        company_code: &str,
        window_days: Option<i64>,
    ) -> Result<Vec<ActivityBucket>> {
        let window_days = window_days.unwrap_or(DEFAULT_WINDOW_DAYS);
        if !(1..=MAX_WINDOW_DAYS).contains(&window_days) {
            return Err(Error::Validation(format!(
                "window_days must be between 1 and {}",
                MAX_WINDOW_DAYS
            )));
        }

        let now = now();
        let timestamps = self
            .repo
            .created_since(company_code, window_start(now, window_days))
            .await?;
        Ok(bucket_by_weekday(now, &timestamps, window_days)
            .into_iter()
            .map(|(day, count)| ActivityBucket {
                day: day.to_string(),
                count,
            })
            .collect())
    }
}
