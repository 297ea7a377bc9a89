use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::AppState;

pub const COMPANY_CODE_HEADER: &str = "x-company-code";
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

pub fn issue_token(secret: &str, sub: &str, role: &str, ttl_secs: i64) -> Result<String> {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (chrono::Utc::now().timestamp() + ttl_secs).max(0) as usize,
        role: Some(role.to_string()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("token encoding failed: {}", e)))
}

fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| Error::Unauthorized("missing_authorization".to_string()))?;
    let value = header
        .to_str()
        .map_err(|_| Error::Unauthorized("bad_authorization".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::Unauthorized("unsupported_scheme".to_string()))
}

fn admin_claims(headers: &HeaderMap, secret: &str) -> Result<Claims> {
    let token = bearer_token(headers)?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| Error::Unauthorized("invalid_token".to_string()))?;

    let role = data.claims.role.clone().unwrap_or_default();
    if !role.eq_ignore_ascii_case(ADMIN_ROLE) {
        return Err(Error::Forbidden);
    }
    Ok(data.claims)
}

/// HS256 bearer token with `role = admin`.
pub async fn require_admin(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match admin_claims(req.headers(), &state.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

/// Resolves the `x-company-code` capability to the tenant record and stores
/// it as a request extension.
pub async fn require_company(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(code) = req
        .headers()
        .get(COMPANY_CODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    else {
        return Error::Unauthorized("missing_company_code".to_string()).into_response();
    };

    match state.companies.login(&code).await {
        Ok(company) => {
            req.extensions_mut().insert(company);
            next.run(req).await
        }
        Err(Error::NotFound(_)) | Err(Error::Validation(_)) => {
            Error::Unauthorized("invalid_company_code".to_string()).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn admin_role_is_required() {
        let admin = issue_token("secret", "ops", "admin", 600).unwrap();
        let hr = issue_token("secret", "ops", "hr", 600).unwrap();

        assert_eq!(admin_claims(&headers_with(&admin), "secret").unwrap().sub, "ops");
        assert!(matches!(admin_claims(&headers_with(&hr), "secret"), Err(Error::Forbidden)));
        assert!(matches!(
            admin_claims(&headers_with(&admin), "other-secret"),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            admin_claims(&HeaderMap::new(), "secret"),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let expired = issue_token("secret", "ops", "admin", -3600).unwrap();
        assert!(matches!(
            admin_claims(&headers_with(&expired), "secret"),
            Err(Error::Unauthorized(_))
        ));
    }
}
