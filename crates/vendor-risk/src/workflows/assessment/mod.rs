//! Vendor risk assessment: signal fan-out, weighted aggregation with override floors,
//! recommendation bands with structural blocks, and audit explanations.

pub mod domain;
pub mod invoker;
pub mod orchestrator;
pub mod policy;
pub mod producers;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AssessmentRequest, CompositeAssessment, IntakeSubmission, KeyFinding, Recommendation,
    RequestId, Severity, SignalResult, SignalSet, SignalStatus, VendorRecord,
};
pub use invoker::{InvokerSettings, ProducerError, SignalInvoker, SignalProducer, SignalSource};
pub use orchestrator::RiskOrchestrator;
pub use policy::{
    ConfigurationError, OverrideCondition, OverrideRule, PolicyLoadError,
    RecommendationThresholds, RiskPolicy, SignalWeight, WeightTable, FALLBACK_SIGNAL_SCORE,
};
pub use repository::{
    AlertError, AlertPublisher, AssessmentRepository, AssessmentStatusView, RepositoryError,
    VendorAlert,
};
pub use router::assessment_router;
pub use scoring::{aggregate, decide, explain, AssessmentError, Explanation, StructuralBlock};
pub use service::{AssessmentServiceError, VendorAssessmentService};
