pub mod admin;
pub mod company;
pub mod health;
pub mod public;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    auth::{require_admin, require_company},
    cors::dashboard_cors,
    rate_limit::{rate_limit, RateLimiter},
};
use crate::AppState;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub fn app_router(state: AppState, public_rps: u32, company_rps: u32) -> Router {
    let public_api = Router::new()
        .route("/api/assessments", post(public::submit_assessment))
        .route("/api/jobs", get(public::list_jobs))
        .route("/api/companies/register", post(public::register_company))
        .route("/api/companies/login", post(public::login_company))
        .layer(from_fn_with_state(RateLimiter::per_second(public_rps), rate_limit));

    let company_api = Router::new()
        .route("/api/company/me", get(company::me))
        .route("/api/company/assessments", get(company::list_assessments))
        .route("/api/company/assessments/:id", get(company::get_assessment))
        .route(
            "/api/company/assessments/:id/unlock",
            post(company::unlock_assessment),
        )
        .route("/api/company/activity", get(company::activity))
        .route("/api/company/credits/redeem", post(company::redeem_code))
        .route(
            "/api/company/jobs",
            get(company::list_jobs).post(company::publish_job),
        )
        .route("/api/company/jobs/:id/status", post(company::set_job_status))
        .route_layer(from_fn_with_state(state.clone(), require_company))
        .layer(from_fn_with_state(RateLimiter::per_second(company_rps), rate_limit));

    let admin_api = Router::new()
        .route(
            "/api/admin/credit-codes",
            get(admin::list_codes).post(admin::issue_code),
        )
        .route("/api/admin/companies/:code/verify", post(admin::verify_company))
        .route("/api/admin/companies/:code/credits", post(admin::grant_credits))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(health::health))
        .merge(public_api)
        .merge(company_api)
        .merge(admin_api)
        .with_state(state)
        .layer(dashboard_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
