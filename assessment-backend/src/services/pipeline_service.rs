use crate::database::ClaimedAssessment;
use crate::dto::assessment_dto::SubmitAssessmentRequest;
use crate::error::Result;
use crate::models::assessment::AssessmentStatus;
use crate::models::report::AnalysisReport;
use crate::services::assessment_service::AssessmentService;
use crate::services::scoring_service::ScoringClient;
use crate::utils::time::now;
use chrono::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Submission -> background scoring -> report attachment.
#[derive(Clone)]
pub struct PipelineService {
    store: AssessmentService,
    scoring: ScoringClient,
    stale_after: Duration,
}

impl PipelineService {
    pub fn new(store: AssessmentService, scoring: ScoringClient, stale_after: Duration) -> Self {
        Self {
            store,
            scoring,
            stale_after,
        }
    }

    /// Persists the submission and returns once it is durable. Scoring runs
    /// in the background.
    pub async fn submit(&self, payload: SubmitAssessmentRequest) -> Result<Uuid> {
        let id = self.store.create(payload).await?;
        self.dispatch(id);
        Ok(id)
    }

    /// Spawns scoring for `id` if it can still be claimed. A failed claim is
    /// left PENDING for the recovery worker.
    pub fn dispatch(&self, id: Uuid) -> JoinHandle<Option<AssessmentStatus>> {
        let this = self.clone();
        tokio::spawn(async move {
            match this.store.claim(id).await {
                Ok(Some(claimed)) => Some(this.process(claimed).await),
                Ok(None) => {
                    tracing::debug!(assessment_id = %id, "assessment already claimed");
                    None
                }
                Err(e) => {
                    tracing::warn!(assessment_id = %id, error = %e, "claim failed, leaving for recovery worker");
                    None
                }
            }
        })
    }

    /// Scores a claimed assessment and records the outcome. Returns the final
    /// status.
    pub async fn process(&self, claimed: ClaimedAssessment) -> AssessmentStatus {
        let ClaimedAssessment {
            assessment,
            candidate,
        } = claimed;
        let id = assessment.id;

        // A panic inside scoring must still end in a report.
        let scoring = self.scoring.clone();
        let answers = assessment.answers;
        let report = match tokio::spawn(async move { scoring.analyze(&candidate, &answers).await }).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(assessment_id = %id, error = %e, "scoring task aborted, using fallback report");
                AnalysisReport::fallback()
            }
        };

        match self.store.attach_report(id, &report).await {
            Ok(()) => {
                tracing::info!(
                    assessment_id = %id,
                    decision = ?report.recommendation.decision,
                    provenance = ?report.provenance,
                    "assessment completed"
                );
                AssessmentStatus::Completed
            }
            Err(e) => {
                tracing::error!(assessment_id = %id, error = %e, "failed to persist report");
                match self.store.mark_error(id).await {
                    Ok(_) => AssessmentStatus::Error,
                    Err(e) => {
                        tracing::error!(assessment_id = %id, error = %e, "failed to mark assessment as ERROR");
                        AssessmentStatus::Analyzing
                    }
                }
            }
        }
    }

    /// Claims and scores the oldest PENDING assessment. `Ok(false)` when the
    /// queue is empty.
    pub async fn run_once(&self) -> Result<bool> {
        let Some(claimed) = self.store.claim_next_pending().await? else {
            return Ok(false);
        };
        tracing::info!(assessment_id = %claimed.assessment.id, "recovering pending assessment");
        self.process(claimed).await;
        Ok(true)
    }

    /// Logs ANALYZING records that have outlived the stale threshold. They are
    /// not retried.
    pub async fn report_stale(&self) -> Result<usize> {
        let stale = self.store.stale_analyzing(now() - self.stale_after).await?;
        for id in &stale {
            tracing::warn!(
                assessment_id = %id,
                stale_minutes = self.stale_after.num_minutes(),
                "assessment stuck in ANALYZING"
            );
        }
        Ok(stale.len())
    }
}
