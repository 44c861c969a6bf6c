use crate::assess::render_assessment;
use crate::infra::{InMemoryAlertPublisher, InMemoryAssessmentRepository};
use clap::Args;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use vendor_risk::error::AppError;
use vendor_risk::workflows::assessment::producers::FixedSignalProducer;
use vendor_risk::workflows::assessment::{
    CompositeAssessment, IntakeSubmission, InvokerSettings, PolicyLoadError,
    RecommendationThresholds, RequestId, RiskOrchestrator, RiskPolicy, SignalInvoker,
    VendorAlert, VendorAssessmentService, VendorRecord, WeightTable,
};

const SIX_SIGNALS: [&str; 6] = ["network", "entity", "legal", "payment", "behavioral", "trust"];
const FIVE_SIGNALS: [&str; 5] = ["network", "entity", "legal", "payment", "trust"];

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Per-producer timeout used by the scenarios, in milliseconds
    #[arg(long, default_value_t = 250)]
    pub(crate) timeout_ms: u64,
    /// Print the assessment records as a JSON array
    #[arg(long)]
    pub(crate) json: bool,
}

struct DemoScenario {
    id: &'static str,
    title: &'static str,
    vendor: VendorRecord,
    policy: RiskPolicy,
    invoker: SignalInvoker,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let timeout = Duration::from_millis(args.timeout_ms.max(1));
    let (assessments, alerts) = assess_scenarios(timeout).await?;

    if args.json {
        let records: Vec<&CompositeAssessment> =
            assessments.iter().map(|(_, assessment)| assessment).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!("Vendor risk demo");
    for (title, assessment) in &assessments {
        println!("\n{}", title);
        render_assessment(assessment);
    }

    if alerts.is_empty() {
        println!("\nReviewer alerts: none dispatched");
    } else {
        println!("\nReviewer alerts:");
        for alert in alerts {
            println!("  - template={} -> {}", alert.template, alert.request_id);
        }
    }

    Ok(())
}

fn scenario_titles() -> [&'static str; 4] {
    [
        "Clean vendor (equal weights)",
        "Sanctions hit (standard policy)",
        "Single producer outage (legal times out)",
        "Mid-range convergence (five equal weights)",
    ]
}

/// Runs every scenario through one in-memory repository and alert sink.
pub(crate) async fn assess_scenarios(
    timeout: Duration,
) -> Result<(Vec<(&'static str, CompositeAssessment)>, Vec<VendorAlert>), AppError> {
    let repository = Arc::new(InMemoryAssessmentRepository::default());
    let alerts = InMemoryAlertPublisher::default();
    let mut assessments = Vec::new();

    for scenario in scenarios(timeout)? {
        let DemoScenario {
            id,
            title,
            vendor,
            policy,
            invoker,
        } = scenario;
        let orchestrator = Arc::new(RiskOrchestrator::with_invoker(invoker, Arc::new(policy)));
        let service =
            VendorAssessmentService::new(orchestrator, repository.clone(), Arc::new(alerts.clone()));

        let submission = IntakeSubmission {
            request_id: Some(RequestId(id.to_string())),
            vendor,
        };
        match service.submit(submission).await {
            Ok(assessment) => assessments.push((title, assessment)),
            Err(err) => println!("  {} could not be recorded: {}", title, err),
        }
    }

    Ok((assessments, alerts.events()))
}

fn scenarios(timeout: Duration) -> Result<Vec<DemoScenario>, AppError> {
    let settings = InvokerSettings {
        timeout,
        ..InvokerSettings::default()
    };
    let [clean, sanctions, outage, mid_range] = scenario_titles();

    let clean_vendor = DemoScenario {
        id: "demo-clean",
        title: clean,
        vendor: vendor("Harbor Office Supply", "accounts@harbor-office.com"),
        policy: equal_policy(&SIX_SIGNALS)?,
        invoker: uniform_invoker(settings, &SIX_SIGNALS, 0.05),
    };

    let mut sanctions_invoker = uniform_invoker(settings, &SIX_SIGNALS, 0.1);
    sanctions_invoker.register(
        "entity",
        Arc::new(FixedSignalProducer::new(json!({
            "entityRiskScore": 0.97,
            "entityRiskFactors": ["sanctions_match_global_trading_llc"],
            "matchedEntities": [{
                "type": "SANCTIONS",
                "matched_text": "global trading llc",
                "list": "OFAC_SDN",
                "severity": "CRITICAL"
            }],
            "complianceStatus": "BLOCKED"
        }))),
    );
    let sanctions_hit = DemoScenario {
        id: "demo-sanctions",
        title: sanctions,
        vendor: vendor("Global Trading LLC", "director@globaltrading.biz"),
        policy: RiskPolicy::standard(),
        invoker: sanctions_invoker,
    };

    let mut outage_invoker = uniform_invoker(settings, &SIX_SIGNALS, 0.05);
    outage_invoker.register(
        "legal",
        Arc::new(FixedSignalProducer::scored(0.05, &[]).delayed(timeout * 4)),
    );
    let producer_outage = DemoScenario {
        id: "demo-outage",
        title: outage,
        vendor: vendor("Lakeside Catering", "orders@lakeside-catering.com"),
        policy: equal_policy(&SIX_SIGNALS)?,
        invoker: outage_invoker,
    };

    let mut mid_invoker = uniform_invoker(settings, &FIVE_SIGNALS, 0.5);
    mid_invoker.register(
        "trust",
        Arc::new(FixedSignalProducer::scored(0.9, &["domain_age_under_30_days"])),
    );
    let mid_range_vendor = DemoScenario {
        id: "demo-mid-range",
        title: mid_range,
        vendor: vendor("Quickship Logistics", "owner@quickship-logistics.net"),
        policy: equal_policy(&FIVE_SIGNALS)?,
        invoker: mid_invoker,
    };

    Ok(vec![clean_vendor, sanctions_hit, producer_outage, mid_range_vendor])
}

fn vendor(name: &str, email: &str) -> VendorRecord {
    VendorRecord {
        vendor_name: name.to_string(),
        contact_email: email.to_string(),
        business_description: "Demo submission".to_string(),
        ..VendorRecord::default()
    }
}

fn equal_policy(signals: &[&str]) -> Result<RiskPolicy, AppError> {
    let weights = WeightTable::equal(signals).map_err(PolicyLoadError::Invalid)?;
    let policy = RiskPolicy::new(weights, Vec::new(), RecommendationThresholds::default())
        .map_err(PolicyLoadError::Invalid)?;
    Ok(policy)
}

fn uniform_invoker(settings: InvokerSettings, signals: &[&str], score: f64) -> SignalInvoker {
    signals
        .iter()
        .fold(SignalInvoker::new(settings), |invoker, signal| {
            invoker.with_producer(*signal, Arc::new(FixedSignalProducer::scored(score, &[])))
        })
}
