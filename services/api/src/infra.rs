use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;
use vendor_risk::config::AssessmentSettings;
use vendor_risk::error::AppError;
use vendor_risk::workflows::assessment::producers::configured_invoker;
use vendor_risk::workflows::assessment::{
    AlertError, AlertPublisher, AssessmentRepository, CompositeAssessment, RepositoryError,
    RequestId, RiskOrchestrator, RiskPolicy, VendorAlert, VendorAssessmentService,
};

pub(crate) type InMemoryAssessmentService =
    VendorAssessmentService<InMemoryAssessmentRepository, InMemoryAlertPublisher>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAssessmentRepository {
    records: Arc<Mutex<HashMap<RequestId, CompositeAssessment>>>,
}

impl AssessmentRepository for InMemoryAssessmentRepository {
    fn insert(&self, record: CompositeAssessment) -> Result<CompositeAssessment, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.request_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.request_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<CompositeAssessment>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn pending(&self, limit: usize) -> Result<Vec<CompositeAssessment>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut pending: Vec<CompositeAssessment> = guard
            .values()
            .filter(|record| record.recommendation.requires_escalation())
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            b.recommendation
                .cmp(&a.recommendation)
                .then_with(|| b.composite_score.total_cmp(&a.composite_score))
                .then_with(|| a.request_id.cmp(&b.request_id))
        });
        pending.truncate(limit);
        Ok(pending)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAlertPublisher {
    events: Arc<Mutex<Vec<VendorAlert>>>,
}

impl AlertPublisher for InMemoryAlertPublisher {
    fn publish(&self, alert: VendorAlert) -> Result<(), AlertError> {
        info!(template = %alert.template, request_id = %alert.request_id, "reviewer alert queued");
        let mut guard = self.events.lock().expect("alert mutex poisoned");
        guard.push(alert);
        Ok(())
    }
}

impl InMemoryAlertPublisher {
    pub(crate) fn events(&self) -> Vec<VendorAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

/// Loads the configured policy file, or the standard policy when none is set.
pub(crate) fn load_policy(settings: &AssessmentSettings) -> Result<RiskPolicy, AppError> {
    match &settings.policy_path {
        Some(path) => {
            let policy = RiskPolicy::from_path(path)?;
            info!(path = %path.display(), signals = policy.weights().len(), "loaded risk policy");
            Ok(policy)
        }
        None => Ok(RiskPolicy::standard()),
    }
}

pub(crate) fn build_orchestrator(settings: &AssessmentSettings) -> Result<RiskOrchestrator, AppError> {
    let policy = load_policy(settings)?;
    let invoker = configured_invoker(
        &policy,
        settings.invoker_settings(),
        &settings.producer_endpoints,
    );
    Ok(RiskOrchestrator::with_invoker(invoker, Arc::new(policy)))
}

/// Service backed by process-local storage; returns the alert sink for inspection.
pub(crate) fn in_memory_service(
    orchestrator: Arc<RiskOrchestrator>,
) -> (InMemoryAssessmentService, InMemoryAlertPublisher) {
    let alerts = InMemoryAlertPublisher::default();
    let service = VendorAssessmentService::new(
        orchestrator,
        Arc::new(InMemoryAssessmentRepository::default()),
        Arc::new(alerts.clone()),
    );
    (service, alerts)
}
