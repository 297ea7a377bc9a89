use crate::database::LedgerRepository;
use crate::dto::company_dto::RegisterCompanyRequest;
use crate::error::{Error, Result};
use crate::models::company::{Company, NewCompany};
use crate::utils::token::{generate_company_code, normalize_code};
use std::sync::Arc;
use validator::Validate;

const MAX_CODE_ATTEMPTS: usize = 8;

/// Tenant onboarding and access-code lookup.
#[derive(Clone)]
pub struct CompanyService {
    repo: Arc<dyn LedgerRepository>,
    signup_credits: i64,
}

impl CompanyService {
    pub fn new(repo: Arc<dyn LedgerRepository>, signup_credits: i64) -> Self {
        Self {
            repo,
            signup_credits,
        }
    }

    pub async fn register(&self, payload: RegisterCompanyRequest) -> Result<Company> {
        payload.validate()?;
        let name = payload.name.trim().to_string();
        let industry = payload
            .industry
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty());

        for _ in 0..MAX_CODE_ATTEMPTS {
            let new_company = NewCompany {
                code: generate_company_code(&name),
                name: name.clone(),
                email: payload.email.trim().to_lowercase(),
                industry: industry.clone(),
                credits: self.signup_credits,
            };
            if let Some(company) = self.repo.insert_company(&new_company).await? {
                tracing::info!(company = %company.code, "company registered, pending verification");
                return Ok(company);
            }
            tracing::warn!(code = %new_company.code, "company code collision, retrying");
        }
        Err(Error::Internal("Could not allocate a unique company code".to_string()))
    }

    /// Resolves an access code to its tenant.
    pub async fn login(&self, raw_code: &str) -> Result<Company> {
        let code = normalize_code(raw_code);
        if code.is_empty() {
            return Err(Error::Validation("Access code is required".to_string()));
        }
        self.repo
            .company(&code)
            .await?
            .ok_or_else(|| Error::NotFound("Invalid access code".to_string()))
    }

    pub async fn verify(&self, raw_code: &str) -> Result<Company> {
        let code = normalize_code(raw_code);
        let company = self
            .repo
            .set_verified(&code, true)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Company {} not found", code)))?;
        tracing::info!(company = %company.code, "company verified");
        Ok(company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::models::company::Plan;

    fn service() -> CompanyService {
        CompanyService::new(Arc::new(MemoryStore::new()), 3)
    }

    #[tokio::test]
    async fn registration_starts_free_unverified_with_signup_credits() {
        let companies = service();
        let company = companies
            .register(RegisterCompanyRequest {
                name: "Acme Logistics".into(),
                email: "OPS@acme.test".into(),
                industry: Some("  ".into()),
            })
            .await
            .unwrap();

        assert!(company.code.starts_with("ACM-"));
        assert_eq!(company.credits, 3);
        assert_eq!(company.plan, Plan::Free);
        assert!(!company.is_verified);
        assert_eq!(company.email, "ops@acme.test");
        assert_eq!(company.industry, None);

        let lowered = company.code.to_lowercase();
        assert_eq!(companies.login(&lowered).await.unwrap().code, company.code);
        assert!(companies.verify(&company.code).await.unwrap().is_verified);
    }

    #[tokio::test]
    async fn unknown_or_blank_codes_do_not_log_in() {
        let companies = service();
        assert!(matches!(companies.login("ACM-0000").await, Err(Error::NotFound(_))));
        assert!(matches!(companies.login("  ").await, Err(Error::Validation(_))));
        assert!(matches!(companies.verify("ACM-0000").await, Err(Error::NotFound(_))));
    }
}
