use crate::models::assessment::{Answer, AssessmentRecord, AssessmentStatus};
use crate::models::candidate::{GeoLocation, ProfileType};
use crate::models::report::AnalysisReport;
use crate::utils::validation::non_blank;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const HIDDEN_EMAIL: &str = "••••••@•••.com";
pub const HIDDEN_PHONE: &str = "55-****-****";
pub const HIDDEN_LOCATION: &str = "Oculto";
pub const HIDDEN_VALUE: &str = "???";
pub const DEFAULT_JOB_TITLE: &str = "General";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerInput {
    #[validate(custom(function = "non_blank"))]
    pub question: String,
    #[validate(custom(function = "non_blank"))]
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAssessmentRequest {
    #[validate(custom(function = "non_blank"), length(max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    pub role: Option<String>,
    #[validate(custom(function = "non_blank"))]
    pub company_code: String,
    pub profile_type: ProfileType,
    pub location: Option<GeoLocation>,
    pub job_id: Option<Uuid>,
    #[validate(length(min = 1, message = "at least one answer is required"), nested)]
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAssessmentResponse {
    pub id: Uuid,
    pub status: AssessmentStatus,
}

/// A value a company may only see after unlocking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Disclosure<T> {
    Revealed(T),
    Hidden(&'static str),
}

impl<T> Disclosure<T> {
    pub fn gate(unlocked: bool, value: T, placeholder: &'static str) -> Self {
        if unlocked {
            Disclosure::Revealed(value)
        } else {
            Disclosure::Hidden(placeholder)
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, Disclosure::Hidden(_))
    }
}

/// Dashboard row. The candidate name is always visible; contact fields,
/// answers and the report are placeholders until unlocked.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentView {
    pub id: Uuid,
    pub candidate_name: String,
    pub candidate_email: Disclosure<String>,
    pub candidate_phone: Disclosure<Option<String>>,
    pub candidate_location: Disclosure<Option<GeoLocation>>,
    pub job_id: Option<Uuid>,
    pub job_title: String,
    pub candidate_type: ProfileType,
    pub status: AssessmentStatus,
    pub is_unlocked: bool,
    pub answers: Disclosure<Vec<Answer>>,
    pub report: Disclosure<Option<AnalysisReport>>,
    pub created_at: DateTime<Utc>,
}

impl From<AssessmentRecord> for AssessmentView {
    fn from(record: AssessmentRecord) -> Self {
        let AssessmentRecord {
            assessment,
            candidate_name,
            candidate_email,
            candidate_phone,
            candidate_location,
            job_title,
        } = record;
        let open = assessment.is_unlocked;

        Self {
            id: assessment.id,
            candidate_name,
            candidate_email: Disclosure::gate(open, candidate_email, HIDDEN_EMAIL),
            candidate_phone: Disclosure::gate(open, candidate_phone, HIDDEN_PHONE),
            candidate_location: Disclosure::gate(open, candidate_location, HIDDEN_LOCATION),
            job_id: assessment.job_id,
            job_title: job_title.unwrap_or_else(|| DEFAULT_JOB_TITLE.to_string()),
            candidate_type: assessment.candidate_type,
            status: assessment.status,
            is_unlocked: open,
            answers: Disclosure::gate(open, assessment.answers, HIDDEN_VALUE),
            report: Disclosure::gate(open, assessment.report, HIDDEN_VALUE),
            created_at: assessment.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityQuery {
    pub window_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityBucket {
    pub day: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockResponse {
    pub already_unlocked: bool,
    pub new_balance: i64,
}
