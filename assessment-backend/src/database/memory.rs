use super::{
    AssessmentRepository, ClaimedAssessment, CreditOutcome, DebitOutcome, JobInsert, JobRepository,
    LedgerRepository, RedeemOutcome, UnlockOutcome,
};
use crate::error::{Error, Result};
use crate::models::assessment::{Assessment, AssessmentRecord, AssessmentStatus};
use crate::models::candidate::Candidate;
use crate::models::company::{Company, NewCompany, Plan};
use crate::models::credit_code::CreditCode;
use crate::models::job::Job;
use crate::models::report::AnalysisReport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    companies: HashMap<String, Company>,
    candidates: HashMap<String, Candidate>,
    jobs: HashMap<Uuid, Job>,
    codes: HashMap<String, CreditCode>,
    bootstrap_redemptions: HashSet<(String, String)>,
    assessments: HashMap<Uuid, Assessment>,
    claimed_at: HashMap<Uuid, DateTime<Utc>>,
}

impl State {
    fn record(&self, assessment: &Assessment) -> Option<AssessmentRecord> {
        let candidate = self.candidates.get(&assessment.candidate_id)?;
        let job_title = assessment
            .job_id
            .and_then(|id| self.jobs.get(&id))
            .map(|job| job.title.clone());
        Some(AssessmentRecord {
            assessment: assessment.clone(),
            candidate_name: candidate.name.clone(),
            candidate_email: candidate.email.clone(),
            candidate_phone: candidate.phone.clone(),
            candidate_location: candidate.location.clone(),
            job_title,
        })
    }

    fn claim(&mut self, id: Uuid) -> Option<ClaimedAssessment> {
        let pending = self
            .assessments
            .get(&id)
            .filter(|a| a.status == AssessmentStatus::Pending)?;
        let candidate = self.candidates.get(&pending.candidate_id)?.clone();

        let assessment = self.assessments.get_mut(&id)?;
        assessment.status = AssessmentStatus::Analyzing;
        let assessment = assessment.clone();
        self.claimed_at.insert(id, Utc::now());
        Some(ClaimedAssessment { assessment, candidate })
    }

    fn apply_credit(&mut self, code: &str, amount: i64, premium_threshold: i64) -> Option<CreditOutcome> {
        let company = self.companies.get_mut(code)?;
        let current = company.plan;
        company.credits += amount;
        company.plan = current.after_grant(amount, premium_threshold);
        let outcome = CreditOutcome {
            balance: company.credits,
            plan: company.plan,
            upgraded: current == Plan::Free && company.plan == Plan::Premium,
        };
        if outcome.upgraded {
            for job in self.jobs.values_mut() {
                if job.company_code == code && job.active {
                    job.is_featured = true;
                }
            }
        }
        Some(outcome)
    }
}

/// Process-local storage. Every operation runs under one lock, so each trait
/// method is linearizable.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssessmentRepository for MemoryStore {
    async fn insert_submission(&self, candidate: &Candidate, assessment: &Assessment) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut candidate = candidate.clone();
        candidate.updated_at = Some(Utc::now());
        state.candidates.insert(candidate.email.clone(), candidate);
        state.assessments.insert(assessment.id, assessment.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Assessment>> {
        Ok(self.state.lock().await.assessments.get(&id).cloned())
    }

    async fn claim(&self, id: Uuid) -> Result<Option<ClaimedAssessment>> {
        Ok(self.state.lock().await.claim(id))
    }

    async fn claim_next_pending(&self) -> Result<Option<ClaimedAssessment>> {
        let mut state = self.state.lock().await;
        let oldest = state
            .assessments
            .values()
            .filter(|a| a.status == AssessmentStatus::Pending)
            .min_by_key(|a| (a.created_at, a.id))
            .map(|a| a.id);
        Ok(oldest.and_then(|id| state.claim(id)))
    }

    async fn attach_report(&self, id: Uuid, report: &AnalysisReport) -> Result<()> {
        let mut state = self.state.lock().await;
        let assessment = state
            .assessments
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Assessment {} not found", id)))?;
        if !assessment.status.can_transition_to(AssessmentStatus::Completed) {
            return Err(Error::Validation(
                "Assessment is in ERROR and cannot take a report".to_string(),
            ));
        }
        assessment.status = AssessmentStatus::Completed;
        assessment.report = Some(report.clone());
        state.claimed_at.remove(&id);
        Ok(())
    }

    async fn mark_error(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(assessment) = state.assessments.get_mut(&id) else {
            return Ok(false);
        };
        if assessment.status != AssessmentStatus::Analyzing {
            return Ok(false);
        }
        assessment.status = AssessmentStatus::Error;
        state.claimed_at.remove(&id);
        Ok(true)
    }

    async fn list_for_company(&self, company_code: &str) -> Result<Vec<AssessmentRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<AssessmentRecord> = state
            .assessments
            .values()
            .filter(|a| a.company_code == company_code)
            .filter_map(|a| state.record(a))
            .collect();
        records.sort_by(|a, b| {
            (b.assessment.created_at, b.assessment.id).cmp(&(a.assessment.created_at, a.assessment.id))
        });
        Ok(records)
    }

    async fn get_for_company(&self, company_code: &str, id: Uuid) -> Result<Option<AssessmentRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .assessments
            .get(&id)
            .filter(|a| a.company_code == company_code)
            .and_then(|a| state.record(a)))
    }

    async fn created_since(&self, company_code: &str, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        let state = self.state.lock().await;
        Ok(state
            .assessments
            .values()
            .filter(|a| a.company_code == company_code && a.created_at >= since)
            .map(|a| a.created_at)
            .collect())
    }

    async fn stale_analyzing(&self, claimed_before: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let state = self.state.lock().await;
        let mut stale: Vec<(DateTime<Utc>, Uuid)> = state
            .claimed_at
            .iter()
            .filter(|(_, at)| **at < claimed_before)
            .map(|(id, at)| (*at, *id))
            .collect();
        stale.sort();
        Ok(stale.into_iter().map(|(_, id)| id).collect())
    }
}

#[async_trait]
impl LedgerRepository for MemoryStore {
    async fn company(&self, code: &str) -> Result<Option<Company>> {
        Ok(self.state.lock().await.companies.get(code).cloned())
    }

    async fn insert_company(&self, company: &NewCompany) -> Result<Option<Company>> {
        let mut state = self.state.lock().await;
        if state.companies.contains_key(&company.code) {
            return Ok(None);
        }
        let created = Company {
            code: company.code.clone(),
            name: company.name.clone(),
            email: company.email.clone(),
            industry: company.industry.clone(),
            credits: company.credits,
            plan: Plan::Free,
            is_verified: false,
            created_at: Utc::now(),
        };
        state.companies.insert(created.code.clone(), created.clone());
        Ok(Some(created))
    }

    async fn set_verified(&self, code: &str, verified: bool) -> Result<Option<Company>> {
        let mut state = self.state.lock().await;
        Ok(state.companies.get_mut(code).map(|company| {
            company.is_verified = verified;
            company.clone()
        }))
    }

    async fn debit(&self, code: &str, amount: i64) -> Result<DebitOutcome> {
        let mut state = self.state.lock().await;
        let company = state
            .companies
            .get_mut(code)
            .ok_or_else(|| Error::NotFound(format!("Company {} not found", code)))?;
        if company.credits < amount {
            return Ok(DebitOutcome::Insufficient {
                balance: company.credits,
            });
        }
        company.credits -= amount;
        Ok(DebitOutcome::Applied {
            balance: company.credits,
        })
    }

    async fn credit(&self, code: &str, amount: i64, premium_threshold: i64) -> Result<CreditOutcome> {
        self.state
            .lock()
            .await
            .apply_credit(code, amount, premium_threshold)
            .ok_or_else(|| Error::NotFound(format!("Company {} not found", code)))
    }

    async fn insert_code(&self, code: &CreditCode) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.codes.contains_key(&code.code) {
            return Ok(false);
        }
        state.codes.insert(code.code.clone(), code.clone());
        Ok(true)
    }

    async fn list_codes(&self) -> Result<Vec<CreditCode>> {
        let state = self.state.lock().await;
        let mut codes: Vec<CreditCode> = state.codes.values().cloned().collect();
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(codes)
    }

    async fn redeem(
        &self,
        company_code: &str,
        code: &str,
        bootstrap_amount: Option<i64>,
        premium_threshold: i64,
    ) -> Result<RedeemOutcome> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !state.companies.contains_key(company_code) {
            return Err(Error::NotFound(format!("Company {} not found", company_code)));
        }

        let amount = match state.codes.get_mut(code) {
            Some(voucher) if voucher.is_redeemed => return Ok(RedeemOutcome::AlreadyRedeemed),
            Some(voucher) => {
                voucher.is_redeemed = true;
                voucher.redeemed_by = Some(company_code.to_string());
                voucher.redeemed_at = Some(Utc::now());
                voucher.amount
            }
            None => {
                let Some(amount) = bootstrap_amount else {
                    return Ok(RedeemOutcome::UnknownCode);
                };
                let key = (company_code.to_string(), code.to_string());
                if !state.bootstrap_redemptions.insert(key) {
                    return Ok(RedeemOutcome::AlreadyRedeemed);
                }
                amount
            }
        };

        let credit = state
            .apply_credit(company_code, amount, premium_threshold)
            .ok_or_else(|| Error::NotFound(format!("Company {} not found", company_code)))?;
        Ok(RedeemOutcome::Granted { amount, credit })
    }

    async fn unlock(&self, company_code: &str, assessment_id: Uuid) -> Result<UnlockOutcome> {
        let mut state = self.state.lock().await;
        let is_unlocked = match state.assessments.get(&assessment_id) {
            Some(a) if a.company_code == company_code => a.is_unlocked,
            _ => return Ok(UnlockOutcome::NotFound),
        };
        let balance = state
            .companies
            .get(company_code)
            .map(|c| c.credits)
            .unwrap_or_default();

        if is_unlocked {
            return Ok(UnlockOutcome::AlreadyUnlocked { balance });
        }
        if balance < 1 {
            return Ok(UnlockOutcome::Insufficient { balance });
        }

        if let Some(company) = state.companies.get_mut(company_code) {
            company.credits -= 1;
        }
        if let Some(assessment) = state.assessments.get_mut(&assessment_id) {
            assessment.is_unlocked = true;
        }
        Ok(UnlockOutcome::Unlocked { balance: balance - 1 })
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn insert_job(&self, job: &Job) -> Result<JobInsert> {
        let mut state = self.state.lock().await;
        let Some(company) = state.companies.get(&job.company_code) else {
            return Ok(JobInsert::UnknownCompany);
        };
        if !company.is_verified {
            return Ok(JobInsert::Unverified);
        }
        let mut job = job.clone();
        job.active = true;
        job.is_featured = company.plan == Plan::Premium;
        state.jobs.insert(job.id, job.clone());
        Ok(JobInsert::Created(job))
    }

    async fn job(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.state.lock().await.jobs.get(&id).cloned())
    }

    async fn list_jobs(&self, company_code: &str) -> Result<Vec<Job>> {
        let state = self.state.lock().await;
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.company_code == company_code)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn list_active_jobs(&self) -> Result<Vec<Job>> {
        let state = self.state.lock().await;
        let mut jobs: Vec<Job> = state.jobs.values().filter(|j| j.active).cloned().collect();
        jobs.sort_by(|a, b| {
            b.is_featured
                .cmp(&a.is_featured)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(jobs)
    }

    async fn set_job_active(&self, company_code: &str, id: Uuid, active: bool) -> Result<Option<Job>> {
        let mut state = self.state.lock().await;
        Ok(state
            .jobs
            .get_mut(&id)
            .filter(|job| job.company_code == company_code)
            .map(|job| {
                job.active = active;
                job.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_company(code: &str, credits: i64) -> NewCompany {
        NewCompany {
            code: code.to_string(),
            name: "Acme".to_string(),
            email: "ops@acme.test".to_string(),
            industry: None,
            credits,
        }
    }

    #[tokio::test]
    async fn duplicate_company_code_is_rejected() {
        let store = MemoryStore::new();
        assert!(store.insert_company(&new_company("ACM-1000", 3)).await.unwrap().is_some());
        assert!(store.insert_company(&new_company("ACM-1000", 9)).await.unwrap().is_none());
        assert_eq!(store.company("ACM-1000").await.unwrap().unwrap().credits, 3);
    }

    #[tokio::test]
    async fn bootstrap_code_is_single_use_per_company() {
        let store = MemoryStore::new();
        store.insert_company(&new_company("ACM-1000", 0)).await.unwrap();
        store.insert_company(&new_company("BET-2000", 0)).await.unwrap();

        let first = store.redeem("ACM-1000", "START", Some(3), 50).await.unwrap();
        assert!(matches!(first, RedeemOutcome::Granted { amount: 3, .. }));
        assert_eq!(
            store.redeem("ACM-1000", "START", Some(3), 50).await.unwrap(),
            RedeemOutcome::AlreadyRedeemed
        );
        assert!(matches!(
            store.redeem("BET-2000", "START", Some(3), 50).await.unwrap(),
            RedeemOutcome::Granted { .. }
        ));
        assert_eq!(
            store.redeem("ACM-1000", "NOPE-NOPE", None, 50).await.unwrap(),
            RedeemOutcome::UnknownCode
        );
    }
}
