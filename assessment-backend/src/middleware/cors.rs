use axum::http::{header, HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

use super::auth::COMPANY_CODE_HEADER;

/// Browser dashboards call from any origin and authenticate by header.
pub fn dashboard_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(COMPANY_CODE_HEADER),
        ])
}
