pub mod memory;
pub mod pool;
pub mod postgres;

use crate::error::Result;
use crate::models::assessment::{Assessment, AssessmentRecord};
use crate::models::candidate::Candidate;
use crate::models::company::{Company, NewCompany, Plan};
use crate::models::credit_code::CreditCode;
use crate::models::job::Job;
use crate::models::report::AnalysisReport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// The three repository handles the services are built from, all backed by
/// the same store.
#[derive(Clone)]
pub struct Storage {
    pub assessments: Arc<dyn AssessmentRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
    pub jobs: Arc<dyn JobRepository>,
}

impl Storage {
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(postgres::PgStore::new(pool));
        Self {
            assessments: store.clone(),
            ledger: store.clone(),
            jobs: store,
        }
    }

    pub fn memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            assessments: store.clone(),
            ledger: store.clone(),
            jobs: store,
        }
    }
}

/// An assessment that was just moved PENDING -> ANALYZING, with the candidate
/// the scoring call needs.
#[derive(Debug, Clone)]
pub struct ClaimedAssessment {
    pub assessment: Assessment,
    pub candidate: Candidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    Applied { balance: i64 },
    Insufficient { balance: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditOutcome {
    pub balance: i64,
    pub plan: Plan,
    pub upgraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    Granted { amount: i64, credit: CreditOutcome },
    AlreadyRedeemed,
    UnknownCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked { balance: i64 },
    AlreadyUnlocked { balance: i64 },
    Insufficient { balance: i64 },
    NotFound,
}

#[derive(Debug, Clone)]
pub enum JobInsert {
    Created(Job),
    Unverified,
    UnknownCompany,
}

/// Sole writer of assessment status and report fields.
#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// Upserts the candidate and inserts the PENDING assessment as one unit.
    async fn insert_submission(&self, candidate: &Candidate, assessment: &Assessment) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Assessment>>;

    /// PENDING -> ANALYZING compare-and-set. `None` when another worker won
    /// or the record is no longer PENDING.
    async fn claim(&self, id: Uuid) -> Result<Option<ClaimedAssessment>>;

    /// Claims the oldest PENDING assessment, if any.
    async fn claim_next_pending(&self) -> Result<Option<ClaimedAssessment>>;

    /// Moves the record to COMPLETED with `report`. Re-attaching to a
    /// COMPLETED record overwrites the report.
    async fn attach_report(&self, id: Uuid, report: &AnalysisReport) -> Result<()>;

    /// ANALYZING -> ERROR. Returns whether the transition happened.
    async fn mark_error(&self, id: Uuid) -> Result<bool>;

    /// Newest first.
    async fn list_for_company(&self, company_code: &str) -> Result<Vec<AssessmentRecord>>;

    async fn get_for_company(&self, company_code: &str, id: Uuid) -> Result<Option<AssessmentRecord>>;

    async fn created_since(&self, company_code: &str, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>>;

    /// ANALYZING records whose claim is older than `claimed_before`.
    async fn stale_analyzing(&self, claimed_before: DateTime<Utc>) -> Result<Vec<Uuid>>;
}

/// Balance, plan and voucher state. Every method is a single atomic unit.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn company(&self, code: &str) -> Result<Option<Company>>;

    /// `None` when the code is already taken.
    async fn insert_company(&self, company: &NewCompany) -> Result<Option<Company>>;

    async fn set_verified(&self, code: &str, verified: bool) -> Result<Option<Company>>;

    async fn debit(&self, code: &str, amount: i64) -> Result<DebitOutcome>;

    /// Adds credits and applies the plan rule; a FREE -> PREMIUM change
    /// features every active job of the company in the same unit.
    async fn credit(&self, code: &str, amount: i64, premium_threshold: i64) -> Result<CreditOutcome>;

    /// `false` when the code is already taken.
    async fn insert_code(&self, code: &CreditCode) -> Result<bool>;

    async fn list_codes(&self) -> Result<Vec<CreditCode>>;

    /// Marks the voucher redeemed by `company_code` and credits its amount.
    /// `bootstrap_amount` is the grant for a static code, redeemable once
    /// per company.
    async fn redeem(
        &self,
        company_code: &str,
        code: &str,
        bootstrap_amount: Option<i64>,
        premium_threshold: i64,
    ) -> Result<RedeemOutcome>;

    /// Debits one credit and sets the unlock flag together, or neither.
    async fn unlock(&self, company_code: &str, assessment_id: Uuid) -> Result<UnlockOutcome>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Inserts the job if the company is verified; featured iff the company
    /// is PREMIUM when the row is written.
    async fn insert_job(&self, job: &Job) -> Result<JobInsert>;

    async fn job(&self, id: Uuid) -> Result<Option<Job>>;

    async fn list_jobs(&self, company_code: &str) -> Result<Vec<Job>>;

    /// Featured first, then newest first.
    async fn list_active_jobs(&self) -> Result<Vec<Job>>;

    async fn set_job_active(&self, company_code: &str, id: Uuid, active: bool) -> Result<Option<Job>>;
}
