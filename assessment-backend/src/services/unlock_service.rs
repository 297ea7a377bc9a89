use crate::database::{LedgerRepository, UnlockOutcome};
use crate::dto::assessment_dto::UnlockResponse;
use crate::error::{Error, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Pay one credit to reveal one assessment.
#[derive(Clone)]
pub struct UnlockService {
    ledger: Arc<dyn LedgerRepository>,
}

impl UnlockService {
    pub fn new(ledger: Arc<dyn LedgerRepository>) -> Self {
        Self { ledger }
    }

    /// Idempotent; a repeat call reports `already_unlocked` and charges nothing.
    pub async fn unlock(&self, company_code: &str, assessment_id: Uuid) -> Result<UnlockResponse> {
        match self.ledger.unlock(company_code, assessment_id).await? {
            UnlockOutcome::Unlocked { balance } => {
                tracing::info!(
                    company = %company_code,
                    assessment_id = %assessment_id,
                    balance,
                    "assessment unlocked"
                );
                Ok(UnlockResponse {
                    already_unlocked: false,
                    new_balance: balance,
                })
            }
            UnlockOutcome::AlreadyUnlocked { balance } => Ok(UnlockResponse {
                already_unlocked: true,
                new_balance: balance,
            }),
            UnlockOutcome::Insufficient { balance } => {
                tracing::info!(
                    company = %company_code,
                    assessment_id = %assessment_id,
                    balance,
                    "unlock refused, no credits"
                );
                Err(Error::InsufficientCredits)
            }
            UnlockOutcome::NotFound => Err(Error::NotFound(format!(
                "Assessment {} not found",
                assessment_id
            ))),
        }
    }
}
