use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::workflows::assessment::domain::{
    CompositeAssessment, RequestId, SignalResult, SignalSet, VendorRecord,
};
use crate::workflows::assessment::invoker::{
    InvokerSettings, ProducerError, SignalInvoker, SignalProducer, SignalSource,
};
use crate::workflows::assessment::orchestrator::RiskOrchestrator;
use crate::workflows::assessment::policy::{
    RecommendationThresholds, RiskPolicy, WeightTable,
};
use crate::workflows::assessment::producers::FixedSignalProducer;
use crate::workflows::assessment::repository::{
    AlertError, AlertPublisher, AssessmentRepository, RepositoryError, VendorAlert,
};
use crate::workflows::assessment::service::VendorAssessmentService;

pub(super) const SIGNALS: [&str; 6] = ["network", "entity", "legal", "payment", "behavioral", "trust"];

pub(super) fn vendor() -> VendorRecord {
    VendorRecord {
        vendor_name: "Acme Industrial Supply".to_string(),
        contact_email: "procurement@acme-industrial.com".to_string(),
        business_description: "Industrial fasteners and fittings distributor".to_string(),
        tax_id: Some("12-3456789".to_string()),
        source_ip: Some("203.0.113.24".to_string()),
        submitted_at: Some("2025-09-24T10:00:00Z".to_string()),
    }
}

pub(super) fn equal_policy() -> RiskPolicy {
    let weights = WeightTable::equal(&SIGNALS).expect("equal weights sum to one");
    RiskPolicy::new(weights, Vec::new(), RecommendationThresholds::default())
        .expect("policy validates")
}

pub(super) fn ok(score: f64) -> SignalResult {
    SignalResult::ok(score, Vec::new(), Value::Null)
}

pub(super) fn ok_with_factors(score: f64, factors: &[&str]) -> SignalResult {
    SignalResult::ok(
        score,
        factors.iter().map(|factor| factor.to_string()).collect(),
        Value::Null,
    )
}

pub(super) fn uniform_set(signals: &[&str], score: f64) -> SignalSet {
    signals.iter().map(|signal| (*signal, ok(score))).collect()
}

pub(super) fn sanctions_payload() -> Value {
    json!({
        "entityRiskScore": 0.97,
        "entityRiskFactors": ["sanctions_match_global_trading_llc"],
        "matchedEntities": [
            {"type": "SANCTIONS", "matched_text": "global trading llc", "list": "OFAC_SDN", "severity": "CRITICAL"}
        ],
        "complianceStatus": "REVIEW"
    })
}

pub(super) fn fast_settings() -> InvokerSettings {
    InvokerSettings {
        timeout: Duration::from_millis(500),
        fallback_score: 0.3,
    }
}

/// Invoker where every signal answers with the same score and no factors.
pub(super) fn uniform_invoker(signals: &[&str], score: f64) -> SignalInvoker {
    signals
        .iter()
        .fold(SignalInvoker::new(fast_settings()), |invoker, signal| {
            invoker.with_producer(*signal, Arc::new(FixedSignalProducer::scored(score, &[])))
        })
}

pub(super) fn orchestrator(invoker: SignalInvoker, policy: RiskPolicy) -> RiskOrchestrator {
    RiskOrchestrator::with_invoker(invoker, Arc::new(policy))
}

pub(super) struct PanickingProducer;

#[async_trait]
impl SignalProducer for PanickingProducer {
    async fn score(&self, _vendor: &VendorRecord) -> Result<Value, ProducerError> {
        panic!("producer bug");
    }
}

pub(super) struct TransportFailure;

#[async_trait]
impl SignalProducer for TransportFailure {
    async fn score(&self, _vendor: &VendorRecord) -> Result<Value, ProducerError> {
        Err(ProducerError::Transport("connection refused".to_string()))
    }
}

/// Source that breaks the invoker contract by returning nothing.
pub(super) struct EmptySource;

#[async_trait]
impl SignalSource for EmptySource {
    async fn collect(&self, _vendor: &VendorRecord, _weights: &WeightTable) -> SignalSet {
        SignalSet::new()
    }
}

pub(super) struct PanickingSource;

#[async_trait]
impl SignalSource for PanickingSource {
    async fn collect(&self, _vendor: &VendorRecord, _weights: &WeightTable) -> SignalSet {
        panic!("collector bug");
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<BTreeMap<RequestId, CompositeAssessment>>,
}

impl AssessmentRepository for MemoryRepository {
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
        pending.sort_by(|a, b| b.recommendation.cmp(&a.recommendation));
        pending.truncate(limit);
        Ok(pending)
    }
}

pub(super) struct UnavailableRepository;

impl AssessmentRepository for UnavailableRepository {
    fn insert(&self, _record: CompositeAssessment) -> Result<CompositeAssessment, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &RequestId) -> Result<Option<CompositeAssessment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn pending(&self, _limit: usize) -> Result<Vec<CompositeAssessment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryAlerts {
    events: Mutex<Vec<VendorAlert>>,
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<VendorAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl AlertPublisher for MemoryAlerts {
    fn publish(&self, alert: VendorAlert) -> Result<(), AlertError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}

pub(super) struct BrokenAlerts;

impl AlertPublisher for BrokenAlerts {
    fn publish(&self, _alert: VendorAlert) -> Result<(), AlertError> {
        Err(AlertError::Transport("smtp relay down".to_string()))
    }
}

pub(super) fn service_with<R, A>(
    invoker: SignalInvoker,
    repository: Arc<R>,
    alerts: Arc<A>,
) -> VendorAssessmentService<R, A>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    VendorAssessmentService::new(
        Arc::new(orchestrator(invoker, RiskPolicy::standard())),
        repository,
        alerts,
    )
}

/// Standard six-signal invoker with the entity producer reporting a sanctions hit.
pub(super) fn sanctions_invoker() -> SignalInvoker {
    let mut invoker = uniform_invoker(&SIGNALS, 0.1);
    invoker.register(
        "entity",
        Arc::new(FixedSignalProducer::new(sanctions_payload())),
    );
    invoker
}
