use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use super::domain::{AssessmentRequest, CompositeAssessment, IntakeSubmission, RequestId};
use super::orchestrator::RiskOrchestrator;
use super::repository::{
    AlertPublisher, AssessmentRepository, RepositoryError, VendorAlert,
};

/// Service composing the orchestrator with the persistence and notification seams.
pub struct VendorAssessmentService<R, A> {
    orchestrator: Arc<RiskOrchestrator>,
    repository: Arc<R>,
    alerts: Arc<A>,
}

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> RequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequestId(format!("req-{id:06}"))
}

impl<R, A> VendorAssessmentService<R, A>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    pub fn new(orchestrator: Arc<RiskOrchestrator>, repository: Arc<R>, alerts: Arc<A>) -> Self {
        Self {
            orchestrator,
            repository,
            alerts,
        }
    }

    /// Assess a submission and persist the outcome.
    ///
    /// Escalated vendors trigger an alert; a failed alert is logged and does not fail the
    /// submission.
    pub async fn submit(
        &self,
        submission: IntakeSubmission,
    ) -> Result<CompositeAssessment, AssessmentServiceError> {
        let IntakeSubmission { request_id, vendor } = submission;
        let request_id = match request_id {
            Some(request_id) => {
                if self.repository.fetch(&request_id)?.is_some() {
                    return Err(RepositoryError::Conflict.into());
                }
                request_id
            }
            None => self.unused_request_id()?,
        };

        let assessment = self
            .orchestrator
            .assess(AssessmentRequest { request_id, vendor })
            .await;
        let stored = self.repository.insert(assessment)?;

        if stored.recommendation.requires_escalation() {
            if let Err(err) = self.alerts.publish(VendorAlert::for_assessment(&stored)) {
                warn!(request_id = %stored.request_id, error = %err, "reviewer alert failed");
            }
        }

        Ok(stored)
    }

    /// Generated ids share the `req-` namespace with caller-supplied ids, so skip any already
    /// taken.
    fn unused_request_id(&self) -> Result<RequestId, RepositoryError> {
        loop {
            let candidate = next_request_id();
            if self.repository.fetch(&candidate)?.is_none() {
                return Ok(candidate);
            }
        }
    }

    /// Fetch a stored assessment.
    pub fn get(&self, request_id: &RequestId) -> Result<CompositeAssessment, AssessmentServiceError> {
        let record = self
            .repository
            .fetch(request_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Assessments waiting on reviewers.
    pub fn pending_review(
        &self,
        limit: usize,
    ) -> Result<Vec<CompositeAssessment>, AssessmentServiceError> {
        Ok(self.repository.pending(limit)?)
    }
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
