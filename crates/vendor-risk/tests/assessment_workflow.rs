//! End-to-end scenarios driven through the public orchestrator, service facade and batch
//! importer, using the bundled producers instead of test doubles.

mod common {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use vendor_risk::workflows::assessment::producers::configured_invoker;
    use vendor_risk::workflows::assessment::{
        AlertError, AlertPublisher, AssessmentRepository, CompositeAssessment, InvokerSettings,
        RepositoryError, RequestId, RiskOrchestrator, RiskPolicy, VendorAlert,
        VendorAssessmentService, VendorRecord,
    };

    pub(super) fn vendor(name: &str, email: &str, description: &str) -> VendorRecord {
        VendorRecord {
            vendor_name: name.to_string(),
            contact_email: email.to_string(),
            business_description: description.to_string(),
            ..VendorRecord::default()
        }
    }

    pub(super) fn settings() -> InvokerSettings {
        InvokerSettings {
            timeout: Duration::from_secs(2),
            fallback_score: 0.3,
        }
    }

    /// Standard policy with only the offline heuristics wired in.
    pub(super) fn offline_orchestrator(policy: RiskPolicy) -> RiskOrchestrator {
        let invoker = configured_invoker(&policy, settings(), &BTreeMap::new());
        RiskOrchestrator::with_invoker(invoker, Arc::new(policy))
    }

    #[derive(Default)]
    pub(super) struct MemoryRepository {
        records: Mutex<BTreeMap<RequestId, CompositeAssessment>>,
    }

    impl AssessmentRepository for MemoryRepository {
        fn insert(
            &self,
            record: CompositeAssessment,
        ) -> Result<CompositeAssessment, RepositoryError> {
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
            Ok(guard
                .values()
                .filter(|record| record.recommendation.requires_escalation())
                .take(limit)
                .cloned()
                .collect())
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

    pub(super) fn service(
        policy: RiskPolicy,
    ) -> (
        VendorAssessmentService<MemoryRepository, MemoryAlerts>,
        Arc<MemoryAlerts>,
    ) {
        let alerts = Arc::new(MemoryAlerts::default());
        let service = VendorAssessmentService::new(
            Arc::new(offline_orchestrator(policy)),
            Arc::new(MemoryRepository::default()),
            alerts.clone(),
        );
        (service, alerts)
    }
}

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

use common::*;
use vendor_risk::workflows::assessment::producers::configured_invoker;
use vendor_risk::workflows::assessment::{
    AssessmentRequest, Recommendation, RequestId, RiskOrchestrator, RiskPolicy, Severity,
    SignalStatus,
};
use vendor_risk::workflows::batch::VendorBatchImporter;

#[tokio::test]
async fn unconfigured_signals_degrade_but_still_decide() {
    let orchestrator = offline_orchestrator(RiskPolicy::standard());
    let assessment = orchestrator
        .assess(AssessmentRequest {
            request_id: RequestId("req-offline".to_string()),
            vendor: vendor("Contoso Hardware", "sourcing@microsoft.com", "Office hardware"),
        })
        .await;

    assert_eq!(assessment.signal_statuses.len(), 6);
    for signal in ["entity", "network", "behavioral", "payment"] {
        assert_eq!(assessment.signal_statuses[signal], SignalStatus::Failed);
        assert_eq!(assessment.signal_scores[signal], 0.3);
    }
    assert_eq!(assessment.signal_statuses["legal"], SignalStatus::Ok);
    assert_eq!(assessment.signal_statuses["trust"], SignalStatus::Ok);
    assert_eq!(
        assessment.risk_factors,
        vec![
            "entity:analysis_error".to_string(),
            "network:analysis_error".to_string(),
            "behavioral:analysis_error".to_string(),
            "payment:analysis_error".to_string(),
        ]
    );
    assert_eq!(assessment.composite_score, 0.248);
    assert_eq!(assessment.recommendation, Recommendation::AutoApprove);
    assert!(assessment.error.is_none());
}

#[tokio::test]
async fn disposable_email_and_fraud_language_raise_findings() {
    let orchestrator = offline_orchestrator(RiskPolicy::standard());
    let assessment = orchestrator
        .assess(AssessmentRequest {
            request_id: RequestId("req-suspicious".to_string()),
            vendor: vendor(
                "Fast Fortune Partners",
                "owner@mailinator.com",
                "Guaranteed returns, get rich quick, act now",
            ),
        })
        .await;

    assert_eq!(assessment.signal_scores["legal"], 0.85);
    assert_eq!(assessment.signal_scores["trust"], 0.9);
    assert!(assessment
        .risk_factors
        .contains(&"legal:fraud_keyword_guaranteed_returns".to_string()));
    assert!(assessment
        .risk_factors
        .contains(&"trust:disposable_email".to_string()));

    let findings: Vec<(&str, Severity)> = assessment
        .key_findings
        .iter()
        .map(|finding| (finding.category.as_str(), finding.severity))
        .collect();
    assert_eq!(
        findings,
        vec![("legal", Severity::Critical), ("trust", Severity::Critical)]
    );
    assert_eq!(assessment.recommendation, Recommendation::StandardReview);
}

#[tokio::test]
async fn unreachable_http_producer_becomes_failed_signal() {
    let policy = RiskPolicy::standard();
    let mut endpoints = BTreeMap::new();
    endpoints.insert("entity".to_string(), "http://127.0.0.1:9/score".to_string());
    let invoker = configured_invoker(&policy, settings(), &endpoints);
    let orchestrator = RiskOrchestrator::with_invoker(invoker, Arc::new(policy));

    let assessment = orchestrator
        .assess(AssessmentRequest {
            request_id: RequestId("req-http".to_string()),
            vendor: vendor("Initech", "ap@initech.com", "Software"),
        })
        .await;

    assert_eq!(assessment.signal_statuses["entity"], SignalStatus::Failed);
    assert!(assessment.signal_details["entity"]["error"].is_string());
    assert!(!assessment.is_fallback());
}

#[tokio::test]
async fn policy_file_changes_the_decision() {
    let path = std::env::temp_dir().join(format!(
        "vendor-risk-policy-{}.json",
        std::process::id()
    ));
    std::fs::write(
        &path,
        r#"{
            "weights": [
                {"signal": "legal", "weight": 0.5},
                {"signal": "trust", "weight": 0.5}
            ],
            "thresholds": {"manual_review": 0.8, "enhanced_due_diligence": 0.6, "standard_review": 0.4}
        }"#,
    )
    .expect("write policy file");

    let policy = RiskPolicy::from_path(&path).expect("policy loads");
    std::fs::remove_file(&path).ok();

    let assessment = offline_orchestrator(policy)
        .assess(AssessmentRequest {
            request_id: RequestId("req-policy".to_string()),
            vendor: vendor("Quick Cash Co", "ceo@tempmail.com", "Act now"),
        })
        .await;

    assert_eq!(assessment.signal_scores.len(), 2);
    assert_eq!(assessment.composite_score, 0.675);
    assert_eq!(
        assessment.recommendation,
        Recommendation::EnhancedDueDiligence
    );
}

#[tokio::test]
async fn batch_rows_flow_through_the_service() {
    let csv = "requestId,vendorName,contactEmail,businessDescription\n\
               req-b1,Contoso Hardware,sourcing@microsoft.com,Office hardware\n\
               req-b2,Fast Fortune Partners,owner@mailinator.com,Ponzi scheme with guaranteed returns and act now pricing\n\
               ,Northwind Traders,orders@northwind.example,Food distribution\n";
    let submissions = VendorBatchImporter::from_reader(Cursor::new(csv)).expect("csv parses");
    let policy = RiskPolicy::standard()
        .with_notable_threshold("legal", 0.5)
        .expect("threshold in range");
    let (service, alerts) = service(policy);

    let mut stored = Vec::new();
    for submission in submissions {
        stored.push(service.submit(submission).await.expect("stored"));
    }

    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].request_id, RequestId("req-b1".to_string()));
    assert!(stored[2].request_id.0.starts_with("req-"));
    assert_eq!(stored[1].recommendation, Recommendation::StandardReview);
    assert!(alerts.events().is_empty());

    let fetched = service
        .get(&RequestId("req-b2".to_string()))
        .expect("stored record");
    assert_eq!(fetched.vendor.vendor_name, "Fast Fortune Partners");
}
