use crate::infra::{build_orchestrator, in_memory_service, InMemoryAssessmentService};
use chrono::Utc;
use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use vendor_risk::config::AppConfig;
use vendor_risk::error::AppError;
use vendor_risk::telemetry;
use vendor_risk::workflows::assessment::{
    AssessmentServiceError, CompositeAssessment, IntakeSubmission, Recommendation,
    RepositoryError, RequestId, VendorRecord,
};
use vendor_risk::workflows::batch::VendorBatchImporter;

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Legal or trading name of the vendor
    #[arg(long)]
    pub(crate) vendor_name: String,
    /// Contact email supplied on the intake form
    #[arg(long)]
    pub(crate) contact_email: String,
    /// Free-text business description
    #[arg(long, default_value = "")]
    pub(crate) description: String,
    #[arg(long)]
    pub(crate) tax_id: Option<String>,
    #[arg(long)]
    pub(crate) source_ip: Option<String>,
    /// Correlation id; generated when omitted
    #[arg(long)]
    pub(crate) request_id: Option<String>,
    /// Print the full assessment record as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV export with vendorName and contactEmail columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Print the assessment records as a JSON array
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let orchestrator = Arc::new(build_orchestrator(&config.assessment)?);
    let (service, alerts) = in_memory_service(orchestrator);

    let submission = IntakeSubmission {
        request_id: args.request_id.map(RequestId),
        vendor: VendorRecord {
            vendor_name: args.vendor_name,
            contact_email: args.contact_email,
            business_description: args.description,
            tax_id: args.tax_id,
            source_ip: args.source_ip,
            submitted_at: Some(Utc::now().to_rfc3339()),
        },
    };

    let assessment = assess_one(&service, submission).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        render_assessment(&assessment);
        for alert in alerts.events() {
            println!("  Reviewer alert: template={}", alert.template);
        }
    }

    Ok(())
}

/// Submits one vendor; a service failure is returned so the process exits non-zero.
pub(crate) async fn assess_one(
    service: &InMemoryAssessmentService,
    submission: IntakeSubmission,
) -> Result<CompositeAssessment, AppError> {
    let assessment = service.submit(submission).await?;
    Ok(assessment)
}

pub(crate) async fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let submissions = VendorBatchImporter::from_path(&args.csv)?;
    let orchestrator = Arc::new(build_orchestrator(&config.assessment)?);
    let (service, alerts) = in_memory_service(orchestrator);

    let mut assessments = Vec::with_capacity(submissions.len());
    let mut skipped = Vec::new();
    for submission in submissions {
        let label = submission
            .request_id
            .as_ref()
            .map(|id| id.0.clone())
            .unwrap_or_else(|| submission.vendor.vendor_name.clone());
        match service.submit(submission).await {
            Ok(assessment) => assessments.push(assessment),
            Err(AssessmentServiceError::Repository(RepositoryError::Conflict)) => {
                skipped.push(format!("{label}: duplicate requestId"));
            }
            Err(err) => skipped.push(format!("{label}: {err}")),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&assessments)?);
        return Ok(());
    }

    println!(
        "Vendor batch {} ({} assessed)",
        args.csv.display(),
        assessments.len()
    );
    for assessment in &assessments {
        render_assessment(assessment);
    }

    println!("\nRecommendation mix:");
    for (recommendation, count) in tally(&assessments) {
        println!("  - {}: {}", recommendation.label(), count);
    }
    println!("Reviewer alerts dispatched: {}", alerts.events().len());
    if !skipped.is_empty() {
        println!("Skipped rows:");
        for reason in skipped {
            println!("  - {}", reason);
        }
    }

    Ok(())
}

pub(crate) fn tally(assessments: &[CompositeAssessment]) -> BTreeMap<Recommendation, usize> {
    let mut counts = BTreeMap::new();
    for assessment in assessments {
        *counts.entry(assessment.recommendation).or_insert(0) += 1;
    }
    counts
}

pub(crate) fn render_assessment(assessment: &CompositeAssessment) {
    println!(
        "- {} {} -> {} (composite {:.3}, {} risk)",
        assessment.request_id,
        assessment.vendor.vendor_name,
        assessment.recommendation.label(),
        assessment.composite_score,
        assessment.overall_risk_level.label()
    );
    println!("  Summary: {}", assessment.summary);
    if let Some(reason) = &assessment.block_reason {
        println!("  Block reason: {}", reason);
    }
    if let Some(error) = &assessment.error {
        println!("  Analysis error: {}", error);
    }
    if assessment.risk_factors.is_empty() {
        println!("  Risk factors: none");
    } else {
        println!("  Risk factors: {}", assessment.risk_factors.join(", "));
    }
    for finding in &assessment.key_findings {
        println!(
            "    [{}] {}: {}",
            finding.severity.label(),
            finding.category,
            finding.description
        );
    }
    for (signal, score) in &assessment.signal_scores {
        let status = assessment
            .signal_statuses
            .get(signal)
            .map(|status| status.label())
            .unwrap_or("unknown");
        println!("    {signal}: {score:.3} ({status})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendor_risk::config::AssessmentSettings;

    fn record(id: &str, recommendation: Recommendation) -> CompositeAssessment {
        let mut record =
            CompositeAssessment::fallback(RequestId(id.to_string()), VendorRecord::default(), "x");
        record.recommendation = recommendation;
        record
    }

    #[test]
    fn tally_counts_each_recommendation() {
        let counts = tally(&[
            record("req-1", Recommendation::AutoApprove),
            record("req-2", Recommendation::Blocked),
            record("req-3", Recommendation::AutoApprove),
        ]);

        assert_eq!(counts.get(&Recommendation::AutoApprove), Some(&2));
        assert_eq!(counts.get(&Recommendation::Blocked), Some(&1));
        assert_eq!(counts.get(&Recommendation::ManualReview), None);
        let order: Vec<Recommendation> = counts.keys().copied().collect();
        assert_eq!(
            order,
            vec![Recommendation::AutoApprove, Recommendation::Blocked]
        );
    }

    #[tokio::test]
    async fn duplicate_submission_is_an_error() {
        let orchestrator =
            Arc::new(build_orchestrator(&AssessmentSettings::default()).expect("orchestrator"));
        let (service, _alerts) = in_memory_service(orchestrator);
        let submission = || IntakeSubmission {
            request_id: Some(RequestId("req-cli".to_string())),
            vendor: VendorRecord {
                vendor_name: "Initech".to_string(),
                contact_email: "ap@initech.com".to_string(),
                ..VendorRecord::default()
            },
        };

        assess_one(&service, submission()).await.expect("first submission");
        let err = assess_one(&service, submission())
            .await
            .expect_err("duplicate id is rejected");
        assert!(matches!(
            err,
            AppError::Assessment(AssessmentServiceError::Repository(RepositoryError::Conflict))
        ));
    }
}
