use axum::{extract::State, http::StatusCode, response::Json};

use crate::dto::assessment_dto::{SubmitAssessmentRequest, SubmitAssessmentResponse};
use crate::dto::company_dto::{LoginRequest, RegisterCompanyRequest};
use crate::error::Result;
use crate::models::assessment::AssessmentStatus;
use crate::models::company::Company;
use crate::models::job::Job;
use crate::AppState;

/// Accepted as soon as the raw submission is stored; scoring continues in
/// the background.
#[axum::debug_handler]
pub async fn submit_assessment(
    State(state): State<AppState>,
    Json(payload): Json<SubmitAssessmentRequest>,
) -> Result<(StatusCode, Json<SubmitAssessmentResponse>)> {
    let id = state.pipeline.submit(payload).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitAssessmentResponse {
            id,
            status: AssessmentStatus::Pending,
        }),
    ))
}

#[axum::debug_handler]
pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<Vec<Job>>> {
    Ok(Json(state.jobs.list_active().await?))
}

#[axum::debug_handler]
pub async fn register_company(
    State(state): State<AppState>,
    Json(payload): Json<RegisterCompanyRequest>,
) -> Result<(StatusCode, Json<Company>)> {
    let company = state.companies.register(payload).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

#[axum::debug_handler]
pub async fn login_company(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Company>> {
    Ok(Json(state.companies.login(&payload.code).await?))
}
