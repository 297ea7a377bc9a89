use crate::config::Config;
use crate::database::{CreditOutcome, DebitOutcome, LedgerRepository, RedeemOutcome};
use crate::dto::company_dto::RedeemResponse;
use crate::error::{Error, Result};
use crate::models::credit_code::CreditCode;
use crate::utils::time::now;
use crate::utils::token::{generate_credit_code, normalize_code};
use std::collections::HashMap;
use std::sync::Arc;

const MAX_CODE_ATTEMPTS: usize = 8;

#[derive(Debug, Clone)]
pub struct LedgerPolicy {
    pub premium_threshold: i64,
    pub signup_credits: i64,
    pub bootstrap_codes: HashMap<String, i64>,
}

impl LedgerPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            premium_threshold: config.premium_threshold,
            signup_credits: config.signup_credits,
            bootstrap_codes: config.bootstrap_codes.clone(),
        }
    }
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            premium_threshold: 50,
            signup_credits: 3,
            bootstrap_codes: HashMap::from([("START".to_string(), 3)]),
        }
    }
}

/// Company balances, plan tier and vouchers.
#[derive(Clone)]
pub struct LedgerService {
    repo: Arc<dyn LedgerRepository>,
    policy: Arc<LedgerPolicy>,
}

impl LedgerService {
    pub fn new(repo: Arc<dyn LedgerRepository>, policy: LedgerPolicy) -> Self {
        Self {
            repo,
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    /// Returns the new balance.
    pub async fn debit(&self, company_code: &str, amount: i64) -> Result<i64> {
        if amount < 1 {
            return Err(Error::Validation("Debit amount must be positive".to_string()));
        }
        match self.repo.debit(company_code, amount).await? {
            DebitOutcome::Applied { balance } => Ok(balance),
            DebitOutcome::Insufficient { balance } => {
                tracing::info!(company = %company_code, balance, amount, "debit refused");
                Err(Error::InsufficientCredits)
            }
        }
    }

    pub async fn credit(&self, company_code: &str, amount: i64) -> Result<CreditOutcome> {
        if amount < 1 {
            return Err(Error::Validation("Credit amount must be positive".to_string()));
        }
        let outcome = self
            .repo
            .credit(company_code, amount, self.policy.premium_threshold)
            .await?;
        tracing::info!(
            company = %company_code,
            amount,
            balance = outcome.balance,
            plan = outcome.plan.as_str(),
            "credits granted"
        );
        Ok(outcome)
    }

    pub async fn redeem(&self, company_code: &str, raw_code: &str) -> Result<RedeemResponse> {
        let code = normalize_code(raw_code);
        if code.is_empty() {
            return Err(Error::InvalidCode);
        }
        let bootstrap = self.policy.bootstrap_codes.get(&code).copied();

        match self
            .repo
            .redeem(company_code, &code, bootstrap, self.policy.premium_threshold)
            .await?
        {
            RedeemOutcome::Granted { amount, credit } => {
                tracing::info!(
                    company = %company_code,
                    code = %code,
                    amount,
                    balance = credit.balance,
                    "credit code redeemed"
                );
                Ok(RedeemResponse {
                    amount,
                    new_balance: credit.balance,
                    new_plan: credit.plan,
                })
            }
            RedeemOutcome::AlreadyRedeemed => Err(Error::AlreadyRedeemed),
            RedeemOutcome::UnknownCode => Err(Error::InvalidCode),
        }
    }

    pub async fn issue_code(&self, amount: i64) -> Result<CreditCode> {
        if amount < 1 {
            return Err(Error::Validation("Code amount must be positive".to_string()));
        }
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = CreditCode {
                code: generate_credit_code(),
                amount,
                is_redeemed: false,
                redeemed_by: None,
                created_at: now(),
                redeemed_at: None,
            };
            if self.repo.insert_code(&code).await? {
                tracing::info!(code = %code.code, amount, "credit code issued");
                return Ok(code);
            }
            tracing::warn!(code = %code.code, "credit code collision, retrying");
        }
        Err(Error::Internal("Could not allocate a unique credit code".to_string()))
    }

    pub async fn list_codes(&self) -> Result<Vec<CreditCode>> {
        self.repo.list_codes().await
    }
}
