use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::assessment_dto::{ActivityBucket, ActivityQuery, AssessmentView, UnlockResponse};
use crate::dto::company_dto::{JobStatusRequest, PublishJobRequest, RedeemRequest, RedeemResponse};
use crate::error::Result;
use crate::models::company::Company;
use crate::models::job::Job;
use crate::AppState;

#[axum::debug_handler]
pub async fn me(Extension(company): Extension<Company>) -> Json<Company> {
    Json(company)
}

#[axum::debug_handler]
pub async fn list_assessments(
    State(state): State<AppState>,
    Extension(company): Extension<Company>,
) -> Result<Json<Vec<AssessmentView>>> {
    Ok(Json(state.assessments.list_for_company(&company.code).await?))
}

#[axum::debug_handler]
pub async fn get_assessment(
    State(state): State<AppState>,
    Extension(company): Extension<Company>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssessmentView>> {
    Ok(Json(state.assessments.get_for_company(&company.code, id).await?))
}

#[axum::debug_handler]
pub async fn unlock_assessment(
    State(state): State<AppState>,
    Extension(company): Extension<Company>,
    Path(id): Path<Uuid>,
) -> Result<Json<UnlockResponse>> {
    Ok(Json(state.unlock.unlock(&company.code, id).await?))
}

#[axum::debug_handler]
pub async fn activity(
    State(state): State<AppState>,
    Extension(company): Extension<Company>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityBucket>>> {
    Ok(Json(
        state
            .assessments
            .weekly_activity(&company.code, query.window_days)
            .await?,
    ))
}

#[axum::debug_handler]
pub async fn redeem_code(
    State(state): State<AppState>,
    Extension(company): Extension<Company>,
    Json(payload): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>> {
    payload.validate()?;
    Ok(Json(state.ledger.redeem(&company.code, &payload.code).await?))
}

#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Extension(company): Extension<Company>,
) -> Result<Json<Vec<Job>>> {
    Ok(Json(state.jobs.list_for_company(&company.code).await?))
}

#[axum::debug_handler]
pub async fn publish_job(
    State(state): State<AppState>,
    Extension(company): Extension<Company>,
    Json(payload): Json<PublishJobRequest>,
) -> Result<(StatusCode, Json<Job>)> {
    let job = state.jobs.publish(&company.code, payload).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[axum::debug_handler]
pub async fn set_job_status(
    State(state): State<AppState>,
    Extension(company): Extension<Company>,
    Path(id): Path<Uuid>,
    Json(payload): Json<JobStatusRequest>,
) -> Result<Json<Job>> {
    Ok(Json(
        state.jobs.set_active(&company.code, id, payload.active).await?,
    ))
}
