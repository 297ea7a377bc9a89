use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use validator::Validate;

use crate::dto::company_dto::{BalanceResponse, GrantCreditsRequest, IssueCodeRequest};
use crate::error::Result;
use crate::models::company::Company;
use crate::models::credit_code::CreditCode;
use crate::utils::token::normalize_code;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_codes(State(state): State<AppState>) -> Result<Json<Vec<CreditCode>>> {
    Ok(Json(state.ledger.list_codes().await?))
}

#[axum::debug_handler]
pub async fn issue_code(
    State(state): State<AppState>,
    Json(payload): Json<IssueCodeRequest>,
) -> Result<(StatusCode, Json<CreditCode>)> {
    payload.validate()?;
    let code = state.ledger.issue_code(payload.amount).await?;
    Ok((StatusCode::CREATED, Json(code)))
}

#[axum::debug_handler]
pub async fn verify_company(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Company>> {
    Ok(Json(state.companies.verify(&code).await?))
}

/// Purchased credits; same plan rules as a redeemed code.
#[axum::debug_handler]
pub async fn grant_credits(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(payload): Json<GrantCreditsRequest>,
) -> Result<Json<BalanceResponse>> {
    payload.validate()?;
    let outcome = state
        .ledger
        .credit(&normalize_code(&code), payload.amount)
        .await?;
    Ok(Json(BalanceResponse {
        balance: outcome.balance,
        plan: outcome.plan,
        upgraded: outcome.upgraded,
    }))
}
