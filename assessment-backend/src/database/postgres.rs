use super::{
    AssessmentRepository, ClaimedAssessment, CreditOutcome, DebitOutcome, JobInsert, JobRepository,
    LedgerRepository, RedeemOutcome, UnlockOutcome,
};
use crate::error::{Error, Result};
use crate::models::assessment::{Answer, Assessment, AssessmentRecord, AssessmentStatus};
use crate::models::candidate::{Candidate, GeoLocation, ProfileType};
use crate::models::company::{Company, NewCompany, Plan};
use crate::models::credit_code::CreditCode;
use crate::models::job::Job;
use crate::models::report::AnalysisReport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

const ASSESSMENT_COLUMNS: &str = "a.id, a.candidate_id, a.company_code, a.job_id, a.answers, \
     a.status, a.report, a.is_unlocked, a.candidate_type, a.created_at";

/// Candidate columns joined onto a claimed assessment; prefixed so they do not
/// collide with the assessment's own `company_code`.
const CLAIMED_CANDIDATE_COLUMNS: &str = "c.email AS c_email, c.name AS c_name, c.phone AS c_phone, \
     c.role AS c_role, c.company_code AS c_company_code, c.profile_type AS c_profile_type, \
     c.location AS c_location, c.updated_at AS c_updated_at";

const COMPANY_COLUMNS: &str = "code, name, email, industry, credits, plan, is_verified, created_at";

const JOB_COLUMNS: &str =
    "id, company_code, title, location, profile_type, description, active, is_featured, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_profile(raw: &str) -> Result<ProfileType> {
    ProfileType::parse(raw).ok_or_else(|| Error::Internal(format!("unknown profile type {}", raw)))
}

fn assessment_from_row(row: &PgRow) -> Result<Assessment> {
    let status: String = row.try_get("status")?;
    let candidate_type: String = row.try_get("candidate_type")?;
    let answers: Json<Vec<Answer>> = row.try_get("answers")?;
    let report: Option<Json<AnalysisReport>> = row.try_get("report")?;

    Ok(Assessment {
        id: row.try_get("id")?,
        candidate_id: row.try_get("candidate_id")?,
        company_code: row.try_get("company_code")?,
        job_id: row.try_get("job_id")?,
        answers: answers.0,
        status: AssessmentStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("unknown assessment status {}", status)))?,
        report: report.map(|r| r.0),
        is_unlocked: row.try_get("is_unlocked")?,
        candidate_type: parse_profile(&candidate_type)?,
        created_at: row.try_get("created_at")?,
    })
}

fn record_from_row(row: &PgRow) -> Result<AssessmentRecord> {
    let location: Option<Json<GeoLocation>> = row.try_get("candidate_location")?;
    let assessment = assessment_from_row(row)?;
    Ok(AssessmentRecord {
        candidate_email: assessment.candidate_id.clone(),
        assessment,
        candidate_name: row.try_get("candidate_name")?,
        candidate_phone: row.try_get("candidate_phone")?,
        candidate_location: location.map(|l| l.0),
        job_title: row.try_get("job_title")?,
    })
}

fn claimed_from_row(row: &PgRow) -> Result<ClaimedAssessment> {
    let profile_type: String = row.try_get("c_profile_type")?;
    let location: Option<Json<GeoLocation>> = row.try_get("c_location")?;
    let candidate = Candidate {
        email: row.try_get("c_email")?,
        name: row.try_get("c_name")?,
        phone: row.try_get("c_phone")?,
        role: row.try_get("c_role")?,
        company_code: row.try_get("c_company_code")?,
        profile_type: parse_profile(&profile_type)?,
        location: location.map(|l| l.0),
        updated_at: row.try_get("c_updated_at")?,
    };
    Ok(ClaimedAssessment {
        assessment: assessment_from_row(row)?,
        candidate,
    })
}

fn company_from_row(row: &PgRow) -> Result<Company> {
    let plan: String = row.try_get("plan")?;
    Ok(Company {
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        industry: row.try_get("industry")?,
        credits: row.try_get("credits")?,
        plan: Plan::parse(&plan),
        is_verified: row.try_get("is_verified")?,
        created_at: row.try_get("created_at")?,
    })
}

fn code_from_row(row: &PgRow) -> Result<CreditCode> {
    Ok(CreditCode {
        code: row.try_get("code")?,
        amount: row.try_get("amount")?,
        is_redeemed: row.try_get("is_redeemed")?,
        redeemed_by: row.try_get("redeemed_by")?,
        created_at: row.try_get("created_at")?,
        redeemed_at: row.try_get("redeemed_at")?,
    })
}

fn job_from_row(row: &PgRow) -> Result<Job> {
    let profile_type: String = row.try_get("profile_type")?;
    Ok(Job {
        id: row.try_get("id")?,
        company_code: row.try_get("company_code")?,
        title: row.try_get("title")?,
        location: row.try_get("location")?,
        profile_type: parse_profile(&profile_type)?,
        description: row.try_get("description")?,
        active: row.try_get("active")?,
        is_featured: row.try_get("is_featured")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Credits a company inside the caller's transaction. The row lock taken here
/// serialises concurrent grants for the same company.
async fn apply_credit(
    conn: &mut PgConnection,
    code: &str,
    amount: i64,
    premium_threshold: i64,
) -> Result<Option<CreditOutcome>> {
    let Some(row) = sqlx::query("SELECT plan FROM companies WHERE code = $1 FOR UPDATE")
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };
    let current = Plan::parse(&row.try_get::<String, _>("plan")?);
    let plan = current.after_grant(amount, premium_threshold);

    let balance: i64 = sqlx::query(
        "UPDATE companies SET credits = credits + $2, plan = $3 WHERE code = $1 RETURNING credits",
    )
    .bind(code)
    .bind(amount)
    .bind(plan.as_str())
    .fetch_one(&mut *conn)
    .await?
    .try_get("credits")?;

    let upgraded = current == Plan::Free && plan == Plan::Premium;
    if upgraded {
        let featured = sqlx::query(
            "UPDATE jobs SET is_featured = TRUE WHERE company_code = $1 AND active = TRUE",
        )
        .bind(code)
        .execute(&mut *conn)
        .await?
        .rows_affected();
        tracing::info!(company = %code, featured_jobs = featured, "company upgraded to PREMIUM");
    }

    Ok(Some(CreditOutcome {
        balance,
        plan,
        upgraded,
    }))
}

async fn current_balance(conn: &mut PgConnection, code: &str) -> Result<Option<i64>> {
    let row = sqlx::query("SELECT credits FROM companies WHERE code = $1")
        .bind(code)
        .fetch_optional(conn)
        .await?;
    row.map(|r| r.try_get::<i64, _>("credits").map_err(Error::from))
        .transpose()
}

#[async_trait]
impl AssessmentRepository for PgStore {
    async fn insert_submission(&self, candidate: &Candidate, assessment: &Assessment) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO candidates (email, name, phone, role, company_code, profile_type, location, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                role = EXCLUDED.role,
                company_code = EXCLUDED.company_code,
                profile_type = EXCLUDED.profile_type,
                location = EXCLUDED.location,
                updated_at = NOW()
            "#,
        )
        .bind(&candidate.email)
        .bind(&candidate.name)
        .bind(&candidate.phone)
        .bind(&candidate.role)
        .bind(&candidate.company_code)
        .bind(candidate.profile_type.as_str())
        .bind(candidate.location.as_ref().map(Json))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO assessments (id, candidate_id, company_code, job_id, answers, status, is_unlocked, candidate_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(assessment.id)
        .bind(&assessment.candidate_id)
        .bind(&assessment.company_code)
        .bind(assessment.job_id)
        .bind(Json(&assessment.answers))
        .bind(assessment.status.as_str())
        .bind(assessment.is_unlocked)
        .bind(assessment.candidate_type.as_str())
        .bind(assessment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Assessment>> {
        let row = sqlx::query(&format!("SELECT {} FROM assessments a WHERE a.id = $1", ASSESSMENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(assessment_from_row).transpose()
    }

    async fn claim(&self, id: Uuid) -> Result<Option<ClaimedAssessment>> {
        // One statement: the status flip and the candidate read commit or
        // fail together, so a failed claim leaves the row PENDING.
        let row = sqlx::query(&format!(
            r#"
            WITH a AS (
                UPDATE assessments SET status = 'ANALYZING', updated_at = NOW()
                WHERE id = $1 AND status = 'PENDING'
                RETURNING *
            )
            SELECT {}, {}
            FROM a JOIN candidates c ON c.email = a.candidate_id
            "#,
            ASSESSMENT_COLUMNS, CLAIMED_CANDIDATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(claimed_from_row).transpose()
    }

    async fn claim_next_pending(&self) -> Result<Option<ClaimedAssessment>> {
        let row = sqlx::query(&format!(
            r#"
            WITH a AS (
                UPDATE assessments SET status = 'ANALYZING', updated_at = NOW()
                WHERE id = (
                    SELECT id FROM assessments WHERE status = 'PENDING'
                    ORDER BY created_at ASC FOR UPDATE SKIP LOCKED LIMIT 1
                )
                RETURNING *
            )
            SELECT {}, {}
            FROM a JOIN candidates c ON c.email = a.candidate_id
            "#,
            ASSESSMENT_COLUMNS, CLAIMED_CANDIDATE_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(claimed_from_row).transpose()
    }

    async fn attach_report(&self, id: Uuid, report: &AnalysisReport) -> Result<()> {
        let updated = sqlx::query(
            r#"UPDATE assessments SET status = 'COMPLETED', report = $2, updated_at = NOW()
               WHERE id = $1 AND status <> 'ERROR'"#,
        )
        .bind(id)
        .bind(Json(report))
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            let exists = sqlx::query("SELECT 1 FROM assessments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .is_some();
            return Err(if exists {
                Error::Validation("Assessment is in ERROR and cannot take a report".to_string())
            } else {
                Error::NotFound(format!("Assessment {} not found", id))
            });
        }
        Ok(())
    }

    async fn mark_error(&self, id: Uuid) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE assessments SET status = 'ERROR', updated_at = NOW() WHERE id = $1 AND status = 'ANALYZING'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated > 0)
    }

    async fn list_for_company(&self, company_code: &str) -> Result<Vec<AssessmentRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}, c.name AS candidate_name, c.phone AS candidate_phone,
                   c.location AS candidate_location, j.title AS job_title
            FROM assessments a
            JOIN candidates c ON c.email = a.candidate_id
            LEFT JOIN jobs j ON j.id = a.job_id
            WHERE a.company_code = $1
            ORDER BY a.created_at DESC, a.id DESC
            "#,
            ASSESSMENT_COLUMNS
        ))
        .bind(company_code)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn get_for_company(&self, company_code: &str, id: Uuid) -> Result<Option<AssessmentRecord>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}, c.name AS candidate_name, c.phone AS candidate_phone,
                   c.location AS candidate_location, j.title AS job_title
            FROM assessments a
            JOIN candidates c ON c.email = a.candidate_id
            LEFT JOIN jobs j ON j.id = a.job_id
            WHERE a.company_code = $1 AND a.id = $2
            "#,
            ASSESSMENT_COLUMNS
        ))
        .bind(company_code)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn created_since(&self, company_code: &str, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        let rows = sqlx::query(
            "SELECT created_at FROM assessments WHERE company_code = $1 AND created_at >= $2",
        )
        .bind(company_code)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| r.try_get::<DateTime<Utc>, _>("created_at").map_err(Error::from))
            .collect()
    }

    async fn stale_analyzing(&self, claimed_before: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT id FROM assessments WHERE status = 'ANALYZING' AND updated_at < $1 ORDER BY updated_at ASC",
        )
        .bind(claimed_before)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| r.try_get::<Uuid, _>("id").map_err(Error::from))
            .collect()
    }
}

#[async_trait]
impl LedgerRepository for PgStore {
    async fn company(&self, code: &str) -> Result<Option<Company>> {
        let row = sqlx::query(&format!("SELECT {} FROM companies WHERE code = $1", COMPANY_COLUMNS))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(company_from_row).transpose()
    }

    async fn insert_company(&self, company: &NewCompany) -> Result<Option<Company>> {
        let row = sqlx::query(&format!(
            r#"INSERT INTO companies (code, name, email, industry, credits, plan, is_verified)
               VALUES ($1, $2, $3, $4, $5, 'FREE', FALSE)
               ON CONFLICT (code) DO NOTHING
               RETURNING {}"#,
            COMPANY_COLUMNS
        ))
        .bind(&company.code)
        .bind(&company.name)
        .bind(&company.email)
        .bind(&company.industry)
        .bind(company.credits)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(company_from_row).transpose()
    }

    async fn set_verified(&self, code: &str, verified: bool) -> Result<Option<Company>> {
        let row = sqlx::query(&format!(
            "UPDATE companies SET is_verified = $2 WHERE code = $1 RETURNING {}",
            COMPANY_COLUMNS
        ))
        .bind(code)
        .bind(verified)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(company_from_row).transpose()
    }

    async fn debit(&self, code: &str, amount: i64) -> Result<DebitOutcome> {
        let row = sqlx::query(
            "UPDATE companies SET credits = credits - $2 WHERE code = $1 AND credits >= $2 RETURNING credits",
        )
        .bind(code)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(DebitOutcome::Applied {
                balance: row.try_get("credits")?,
            });
        }

        let mut conn = self.pool.acquire().await?;
        match current_balance(&mut *conn, code).await? {
            Some(balance) => Ok(DebitOutcome::Insufficient { balance }),
            None => Err(Error::NotFound(format!("Company {} not found", code))),
        }
    }

    async fn credit(&self, code: &str, amount: i64, premium_threshold: i64) -> Result<CreditOutcome> {
        let mut tx = self.pool.begin().await?;
        let outcome = apply_credit(&mut *tx, code, amount, premium_threshold)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Company {} not found", code)))?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn insert_code(&self, code: &CreditCode) -> Result<bool> {
        let inserted = sqlx::query(
            r#"INSERT INTO credit_codes (code, amount, is_redeemed, created_at)
               VALUES ($1, $2, FALSE, $3)
               ON CONFLICT (code) DO NOTHING"#,
        )
        .bind(&code.code)
        .bind(code.amount)
        .bind(code.created_at)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(inserted > 0)
    }

    async fn list_codes(&self) -> Result<Vec<CreditCode>> {
        let rows = sqlx::query(
            r#"SELECT code, amount, is_redeemed, redeemed_by, created_at, redeemed_at
               FROM credit_codes ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(code_from_row).collect()
    }

    async fn redeem(
        &self,
        company_code: &str,
        code: &str,
        bootstrap_amount: Option<i64>,
        premium_threshold: i64,
    ) -> Result<RedeemOutcome> {
        let mut tx = self.pool.begin().await?;

        // Concurrent redeemers block on the code row; the loser re-reads
        // is_redeemed = true and gets no row back.
        let claimed = sqlx::query(
            r#"UPDATE credit_codes SET is_redeemed = TRUE, redeemed_by = $2, redeemed_at = NOW()
               WHERE code = $1 AND is_redeemed = FALSE
               RETURNING amount"#,
        )
        .bind(code)
        .bind(company_code)
        .fetch_optional(&mut *tx)
        .await?;

        let (amount, bootstrap) = match claimed {
            Some(row) => (row.try_get::<i64, _>("amount")?, false),
            None => {
                let known = sqlx::query("SELECT 1 FROM credit_codes WHERE code = $1")
                    .bind(code)
                    .fetch_optional(&mut *tx)
                    .await?
                    .is_some();
                if known {
                    return Ok(RedeemOutcome::AlreadyRedeemed);
                }
                let Some(amount) = bootstrap_amount else {
                    return Ok(RedeemOutcome::UnknownCode);
                };
                (amount, true)
            }
        };

        let credit = apply_credit(&mut *tx, company_code, amount, premium_threshold)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Company {} not found", company_code)))?;

        if bootstrap {
            let first_use = sqlx::query(
                r#"INSERT INTO bootstrap_redemptions (company_code, code) VALUES ($1, $2)
                   ON CONFLICT (company_code, code) DO NOTHING"#,
            )
            .bind(company_code)
            .bind(code)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            if first_use == 0 {
                tx.rollback().await?;
                return Ok(RedeemOutcome::AlreadyRedeemed);
            }
        }

        tx.commit().await?;
        Ok(RedeemOutcome::Granted { amount, credit })
    }

    async fn unlock(&self, company_code: &str, assessment_id: Uuid) -> Result<UnlockOutcome> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = sqlx::query(
            "SELECT is_unlocked FROM assessments WHERE id = $1 AND company_code = $2 FOR UPDATE",
        )
        .bind(assessment_id)
        .bind(company_code)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(UnlockOutcome::NotFound);
        };

        if row.try_get::<bool, _>("is_unlocked")? {
            let balance = current_balance(&mut *tx, company_code).await?.unwrap_or_default();
            return Ok(UnlockOutcome::AlreadyUnlocked { balance });
        }

        let debited = sqlx::query(
            "UPDATE companies SET credits = credits - 1 WHERE code = $1 AND credits >= 1 RETURNING credits",
        )
        .bind(company_code)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(debited) = debited else {
            let balance = current_balance(&mut *tx, company_code).await?.unwrap_or_default();
            tx.rollback().await?;
            return Ok(UnlockOutcome::Insufficient { balance });
        };
        let balance: i64 = debited.try_get("credits")?;

        sqlx::query("UPDATE assessments SET is_unlocked = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(assessment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(UnlockOutcome::Unlocked { balance })
    }
}

#[async_trait]
impl JobRepository for PgStore {
    async fn insert_job(&self, job: &Job) -> Result<JobInsert> {
        let mut tx = self.pool.begin().await?;

        // FOR SHARE waits out a concurrent upgrade so the featured flag and
        // the plan cascade cannot miss each other.
        let Some(company) =
            sqlx::query("SELECT plan, is_verified FROM companies WHERE code = $1 FOR SHARE")
                .bind(&job.company_code)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(JobInsert::UnknownCompany);
        };
        if !company.try_get::<bool, _>("is_verified")? {
            return Ok(JobInsert::Unverified);
        }
        let featured = Plan::parse(&company.try_get::<String, _>("plan")?) == Plan::Premium;

        let row = sqlx::query(&format!(
            r#"INSERT INTO jobs (id, company_code, title, location, profile_type, description, active, is_featured, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $8)
               RETURNING {}"#,
            JOB_COLUMNS
        ))
        .bind(job.id)
        .bind(&job.company_code)
        .bind(&job.title)
        .bind(&job.location)
        .bind(job.profile_type.as_str())
        .bind(&job.description)
        .bind(featured)
        .bind(job.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(JobInsert::Created(job_from_row(&row)?))
    }

    async fn job(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query(&format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn list_jobs(&self, company_code: &str) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM jobs WHERE company_code = $1 ORDER BY created_at DESC",
            JOB_COLUMNS
        ))
        .bind(company_code)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(job_from_row).collect()
    }

    async fn list_active_jobs(&self) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM jobs WHERE active = TRUE ORDER BY is_featured DESC, created_at DESC",
            JOB_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(job_from_row).collect()
    }

    async fn set_job_active(&self, company_code: &str, id: Uuid, active: bool) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "UPDATE jobs SET active = $3 WHERE id = $2 AND company_code = $1 RETURNING {}",
            JOB_COLUMNS
        ))
        .bind(company_code)
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(job_from_row).transpose()
    }
}
