use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tracing::{error, info};

use super::domain::{round3, AssessmentRequest, CompositeAssessment, RequestId, VendorRecord};
use super::invoker::{SignalInvoker, SignalSource};
use super::policy::RiskPolicy;
use super::scoring::{aggregate, decide, explain, find_structural_block, AssessmentError};

/// Single entry point for one vendor assessment.
pub struct RiskOrchestrator {
    source: Arc<dyn SignalSource>,
    policy: Arc<RiskPolicy>,
}

impl RiskOrchestrator {
    pub fn new(source: Arc<dyn SignalSource>, policy: Arc<RiskPolicy>) -> Self {
        Self { source, policy }
    }

    pub fn with_invoker(invoker: SignalInvoker, policy: Arc<RiskPolicy>) -> Self {
        Self::new(Arc::new(invoker), policy)
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    /// Runs the full pipeline. Never fails: any internal error, including a panic, becomes a
    /// MANUAL_REVIEW record at composite score 0.5.
    pub async fn assess(&self, request: AssessmentRequest) -> CompositeAssessment {
        let AssessmentRequest { request_id, vendor } = request;

        let outcome = AssertUnwindSafe(self.evaluate(&request_id, &vendor))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(assessment)) => {
                info!(
                    request_id = %assessment.request_id,
                    score = assessment.composite_score,
                    recommendation = assessment.recommendation.label(),
                    "vendor assessment complete"
                );
                assessment
            }
            Ok(Err(err)) => {
                error!(request_id = %request_id, error = %err, "assessment failed; escalating to manual review");
                CompositeAssessment::fallback(request_id, vendor, err.to_string())
            }
            Err(_) => {
                error!(request_id = %request_id, "assessment panicked; escalating to manual review");
                CompositeAssessment::fallback(request_id, vendor, "internal error during assessment")
            }
        }
    }

    async fn evaluate(
        &self,
        request_id: &RequestId,
        vendor: &VendorRecord,
    ) -> Result<CompositeAssessment, AssessmentError> {
        let policy = self.policy.as_ref();
        let signals = self.source.collect(vendor, policy.weights()).await;

        // Decisions use the published three-decimal score so the record never disagrees with
        // its own band.
        let score = round3(aggregate(&signals, policy.weights(), policy.overrides())?);
        let block = find_structural_block(&signals);
        let recommendation = decide(score, &signals, policy.thresholds());
        let explanation = explain(&signals, score, recommendation, policy);

        if let Some(block) = &block {
            info!(request_id = %request_id, signal = block.signal(), "structural block applied");
        }

        let mut signal_scores = BTreeMap::new();
        let mut signal_statuses = BTreeMap::new();
        let mut signal_details = BTreeMap::new();
        for (signal, result) in signals.iter() {
            signal_scores.insert(signal.to_string(), round3(result.score()));
            signal_statuses.insert(signal.to_string(), result.status());
            signal_details.insert(signal.to_string(), result.raw().clone());
        }

        Ok(CompositeAssessment {
            request_id: request_id.clone(),
            vendor: vendor.clone(),
            composite_score: score,
            recommendation,
            overall_risk_level: explanation.overall_risk_level,
            risk_factors: explanation.risk_factors,
            key_findings: explanation.key_findings,
            summary: explanation.summary,
            block_reason: block.map(|block| block.summary()),
            signal_scores,
            signal_statuses,
            signal_details,
            assessed_at: Utc::now(),
            error: None,
        })
    }
}
