use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{CompositeAssessment, RequestId};

/// Storage seam for finished assessments.
pub trait AssessmentRepository: Send + Sync {
    fn insert(&self, record: CompositeAssessment) -> Result<CompositeAssessment, RepositoryError>;
    fn fetch(&self, id: &RequestId) -> Result<Option<CompositeAssessment>, RepositoryError>;
    /// Assessments still waiting on a human decision, most severe first.
    fn pending(&self, limit: usize) -> Result<Vec<CompositeAssessment>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail, chat, ticketing adapters).
pub trait AlertPublisher: Send + Sync {
    fn publish(&self, alert: VendorAlert) -> Result<(), AlertError>;
}

/// Notification payload for reviewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorAlert {
    pub template: String,
    pub request_id: RequestId,
    pub details: BTreeMap<String, String>,
}

impl VendorAlert {
    pub fn for_assessment(assessment: &CompositeAssessment) -> Self {
        let template = if assessment.recommendation == super::domain::Recommendation::Blocked {
            "vendor_blocked"
        } else {
            "vendor_review_required"
        };

        let mut details = BTreeMap::new();
        details.insert(
            "vendor_name".to_string(),
            assessment.vendor.vendor_name.clone(),
        );
        details.insert(
            "contact_email".to_string(),
            assessment.vendor.contact_email.clone(),
        );
        details.insert(
            "recommendation".to_string(),
            assessment.recommendation.label().to_string(),
        );
        details.insert(
            "composite_score".to_string(),
            format!("{:.3}", assessment.composite_score),
        );
        details.insert(
            "risk_level".to_string(),
            assessment.overall_risk_level.label().to_string(),
        );
        if !assessment.risk_factors.is_empty() {
            details.insert(
                "risk_factors".to_string(),
                assessment.risk_factors.join(", "),
            );
        }
        if let Some(reason) = &assessment.block_reason {
            details.insert("block_reason".to_string(), reason.clone());
        }

        Self {
            template: template.to_string(),
            request_id: assessment.request_id.clone(),
            details,
        }
    }
}

/// Alert dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized status view for polling clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentStatusView {
    pub request_id: RequestId,
    pub recommendation: &'static str,
    pub composite_score: f64,
    pub overall_risk_level: &'static str,
    pub summary: String,
}

impl From<&CompositeAssessment> for AssessmentStatusView {
    fn from(assessment: &CompositeAssessment) -> Self {
        Self {
            request_id: assessment.request_id.clone(),
            recommendation: assessment.recommendation.label(),
            composite_score: assessment.composite_score,
            overall_risk_level: assessment.overall_risk_level.label(),
            summary: assessment.summary.clone(),
        }
    }
}
