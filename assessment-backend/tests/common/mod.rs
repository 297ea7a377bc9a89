#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assessment_backend::database::Storage;
use assessment_backend::dto::assessment_dto::{AnswerInput, SubmitAssessmentRequest};
use assessment_backend::models::assessment::{Assessment, AssessmentStatus};
use assessment_backend::models::candidate::ProfileType;
use assessment_backend::models::company::{Company, NewCompany};
use assessment_backend::services::ledger_service::LedgerPolicy;
use assessment_backend::services::scoring_service::{
    MediaFetcher, ScoringBackend, ScoringClient, ScoringError, ScoringRequest, ScoringSettings,
};
use assessment_backend::AppState;
use async_trait::async_trait;
use bytes::Bytes;
use url::Url;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret_key";
pub const AUDIO_URL: &str =
    "https://media.example.com/storage/v1/object/public/audios/1700000000_relief.webm";

pub const MODEL_REPORT: &str = r#"Here is the evaluation:
{"scores": {"aptitude": 82, "integrity": 91, "performancePotential": 77, "culturalFit": 80, "flightRisk": 20},
 "recommendation": {"decision": "HIRE", "reason": "Consistent and honest", "nextSteps": ["Reference check"]}}"#;

/// Answers every request with the same raw text and keeps what it was sent.
#[derive(Default)]
pub struct ScriptedBackend {
    pub reply: String,
    pub seen: Mutex<Vec<ScoringRequest>>,
}

impl ScriptedBackend {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ScoringBackend for ScriptedBackend {
    async fn generate(&self, request: &ScoringRequest) -> Result<String, ScoringError> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(self.reply.clone())
    }
}

pub struct UnavailableBackend;

#[async_trait]
impl ScoringBackend for UnavailableBackend {
    async fn generate(&self, _request: &ScoringRequest) -> Result<String, ScoringError> {
        Err(ScoringError::Api {
            status: 503,
            message: "model overloaded".into(),
        })
    }
}

pub struct PanickingBackend;

#[async_trait]
impl ScoringBackend for PanickingBackend {
    async fn generate(&self, _request: &ScoringRequest) -> Result<String, ScoringError> {
        panic!("scoring backend blew up");
    }
}

pub struct StaticMedia;

#[async_trait]
impl MediaFetcher for StaticMedia {
    async fn fetch(&self, _url: &Url) -> Result<Bytes, ScoringError> {
        Ok(Bytes::from_static(b"webm-audio-bytes"))
    }
}

pub fn settings() -> ScoringSettings {
    ScoringSettings {
        api_key: Some("test-key".into()),
        model_field: "field-model".into(),
        model_administrative: "admin-model".into(),
        timeout: Duration::from_secs(5),
        audio_path_marker: "/storage/v1/object/public/audios/".into(),
    }
}

pub fn app_with(storage: Storage, backend: Arc<dyn ScoringBackend>) -> AppState {
    let scoring = ScoringClient::new(backend, Arc::new(StaticMedia), settings());
    AppState::new(
        storage,
        scoring,
        LedgerPolicy::default(),
        chrono::Duration::minutes(15),
        JWT_SECRET.to_string(),
    )
}

pub fn app(backend: Arc<dyn ScoringBackend>) -> (AppState, Storage) {
    let storage = Storage::memory();
    (app_with(storage.clone(), backend), storage)
}

pub async fn seed_company(storage: &Storage, code: &str, credits: i64) -> Company {
    storage
        .ledger
        .insert_company(&NewCompany {
            code: code.to_string(),
            name: "Acme Logistics".into(),
            email: "ops@acme.test".into(),
            industry: Some("Logistics".into()),
            credits,
        })
        .await
        .unwrap()
        .expect("company code free")
}

pub fn submission(company_code: &str, email: &str) -> SubmitAssessmentRequest {
    SubmitAssessmentRequest {
        name: "Ana Torres".into(),
        email: email.into(),
        phone: Some("5512345678".into()),
        role: Some("Security guard".into()),
        company_code: company_code.into(),
        profile_type: ProfileType::Field,
        location: None,
        job_id: None,
        answers: vec![
            AnswerInput {
                question: "Your relief does not arrive. What do you do?".into(),
                response: AUDIO_URL.into(),
            },
            AnswerInput {
                question: "You find a 500 peso bill on the floor. What do you do?".into(),
                response: "I hand it to my supervisor.".into(),
            },
        ],
    }
}

pub async fn wait_for_status(state: &AppState, id: Uuid, want: AssessmentStatus) -> Assessment {
    for _ in 0..300 {
        let assessment = state.assessments.get(id).await.unwrap();
        if assessment.status == want {
            return assessment;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let last = state.assessments.get(id).await.unwrap();
    panic!("assessment {} stuck in {:?}, wanted {:?}", id, last.status, want);
}
