use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::candidate::{GeoLocation, ProfileType};
use super::report::AnalysisReport;

/// Lifecycle of a submission: PENDING -> ANALYZING -> COMPLETED, with ERROR
/// terminal and only reachable once scoring has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentStatus {
    Pending,
    Analyzing,
    Completed,
    Error,
}

impl AssessmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStatus::Pending => "PENDING",
            AssessmentStatus::Analyzing => "ANALYZING",
            AssessmentStatus::Completed => "COMPLETED",
            AssessmentStatus::Error => "ERROR",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(AssessmentStatus::Pending),
            "ANALYZING" => Some(AssessmentStatus::Analyzing),
            "COMPLETED" => Some(AssessmentStatus::Completed),
            "ERROR" => Some(AssessmentStatus::Error),
            _ => None,
        }
    }

    /// Forward-only transitions. Re-entering COMPLETED is allowed so report
    /// attachment stays idempotent.
    pub fn can_transition_to(self, next: AssessmentStatus) -> bool {
        use AssessmentStatus::*;
        matches!(
            (self, next),
            (Pending, Analyzing)
                | (Pending, Completed)
                | (Analyzing, Completed)
                | (Analyzing, Error)
                | (Completed, Completed)
        )
    }
}

/// One interview answer. `response` is literal text or an opaque media URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub candidate_id: String,
    pub company_code: String,
    pub job_id: Option<Uuid>,
    pub answers: Vec<Answer>,
    pub status: AssessmentStatus,
    pub report: Option<AnalysisReport>,
    pub is_unlocked: bool,
    pub candidate_type: ProfileType,
    pub created_at: DateTime<Utc>,
}

/// Assessment joined with candidate contact fields and job title, before
/// redaction.
#[derive(Debug, Clone)]
pub struct AssessmentRecord {
    pub assessment: Assessment,
    pub candidate_name: String,
    pub candidate_email: String,
    pub candidate_phone: Option<String>,
    pub candidate_location: Option<GeoLocation>,
    pub job_title: Option<String>,
}
