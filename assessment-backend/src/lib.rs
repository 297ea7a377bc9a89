pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::database::Storage;
use crate::services::{
    assessment_service::AssessmentService,
    company_service::CompanyService,
    job_service::JobService,
    ledger_service::{LedgerPolicy, LedgerService},
    pipeline_service::PipelineService,
    scoring_service::{GeminiBackend, HttpMediaFetcher, ScoringClient, ScoringSettings},
    unlock_service::UnlockService,
};
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub assessments: AssessmentService,
    pub pipeline: PipelineService,
    pub ledger: LedgerService,
    pub companies: CompanyService,
    pub unlock: UnlockService,
    pub jobs: JobService,
    pub jwt_secret: Arc<String>,
}

impl AppState {
    pub fn new(
        storage: Storage,
        scoring: ScoringClient,
        policy: LedgerPolicy,
        stale_after: chrono::Duration,
        jwt_secret: String,
    ) -> Self {
        let assessments = AssessmentService::new(
            storage.assessments.clone(),
            storage.ledger.clone(),
            storage.jobs.clone(),
        );
        let pipeline = PipelineService::new(assessments.clone(), scoring, stale_after);
        let companies = CompanyService::new(storage.ledger.clone(), policy.signup_credits);
        let unlock = UnlockService::new(storage.ledger.clone());
        let ledger = LedgerService::new(storage.ledger, policy);
        let jobs = JobService::new(storage.jobs);

        Self {
            assessments,
            pipeline,
            ledger,
            companies,
            unlock,
            jobs,
            jwt_secret: Arc::new(jwt_secret),
        }
    }

    /// Production wiring: Gemini scoring over HTTP, settings from `config`.
    pub fn from_config(config: &Config, storage: Storage) -> error::Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.scoring_timeout_secs))
            .build()
            .map_err(|e| error::Error::Internal(format!("HTTP client: {}", e)))?;

        let settings = ScoringSettings::from_config(config);
        if settings.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; every assessment will receive the fallback report");
        }
        let scoring = ScoringClient::new(
            Arc::new(GeminiBackend::new(http_client.clone(), &settings)),
            Arc::new(HttpMediaFetcher::new(http_client)),
            settings,
        );

        Ok(Self::new(
            storage,
            scoring,
            LedgerPolicy::from_config(config),
            chrono::Duration::minutes(config.stale_analysis_minutes),
            config.jwt_secret.clone(),
        ))
    }
}
