use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Correlation identifier carried through an assessment unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Vendor submission fields handed to every signal producer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorRecord {
    pub vendor_name: String,
    pub contact_email: String,
    #[serde(default)]
    pub business_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    /// ISO-8601 submission timestamp as received from intake.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
}

impl VendorRecord {
    /// Lower-cased domain portion of the contact email, if it has one.
    pub fn email_domain(&self) -> Option<String> {
        let (_, domain) = self.contact_email.trim().rsplit_once('@')?;
        if domain.is_empty() {
            None
        } else {
            Some(domain.to_ascii_lowercase())
        }
    }
}

/// Fully identified request accepted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRequest {
    pub request_id: RequestId,
    #[serde(flatten)]
    pub vendor: VendorRecord,
}

/// Intake payload; a missing request id is assigned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(flatten)]
    pub vendor: VendorRecord,
}

/// How a signal result came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    /// The producer computed a real score.
    Ok,
    /// The producer answered, but substituted a fallback for part of its work.
    Degraded,
    /// The producer could not run; the invoker substituted the fallback score.
    Failed,
}

impl SignalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SignalStatus::Ok => "ok",
            SignalStatus::Degraded => "degraded",
            SignalStatus::Failed => "failed",
        }
    }
}

/// Output of one signal producer for one request. Immutable once built; the score is always
/// clamped into `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalResult {
    score: f64,
    factors: Vec<String>,
    status: SignalStatus,
    raw: Value,
}

impl SignalResult {
    pub fn new(score: f64, factors: Vec<String>, status: SignalStatus, raw: Value) -> Self {
        Self {
            score: clamp_unit(score),
            factors,
            status,
            raw,
        }
    }

    pub fn ok(score: f64, factors: Vec<String>, raw: Value) -> Self {
        Self::new(score, factors, SignalStatus::Ok, raw)
    }

    /// Substitute result used when a producer could not be consulted.
    pub fn failed(signal: &str, fallback_score: f64, reason: impl Into<String>) -> Self {
        Self::new(
            fallback_score,
            vec![format!("{signal}:analysis_error")],
            SignalStatus::Failed,
            serde_json::json!({ "error": reason.into() }),
        )
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn factors(&self) -> &[String] {
        &self.factors
    }

    pub fn status(&self) -> SignalStatus {
        self.status
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Mapping of signal name to result for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalSet(BTreeMap<String, SignalResult>);

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, signal: impl Into<String>, result: SignalResult) {
        self.0.insert(signal.into(), result);
    }

    pub fn get(&self, signal: &str) -> Option<&SignalResult> {
        self.0.get(signal)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SignalResult)> {
        self.0.iter().map(|(name, result)| (name.as_str(), result))
    }
}

impl<S: Into<String>> FromIterator<(S, SignalResult)> for SignalSet {
    fn from_iter<I: IntoIterator<Item = (S, SignalResult)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, result)| (name.into(), result))
                .collect(),
        )
    }
}

/// Final routing decision, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    AutoApprove,
    StandardReview,
    EnhancedDueDiligence,
    ManualReview,
    Blocked,
}

impl Recommendation {
    pub const fn label(self) -> &'static str {
        match self {
            Recommendation::AutoApprove => "AUTO_APPROVE",
            Recommendation::StandardReview => "STANDARD_REVIEW",
            Recommendation::EnhancedDueDiligence => "ENHANCED_DUE_DILIGENCE",
            Recommendation::ManualReview => "MANUAL_REVIEW",
            Recommendation::Blocked => "BLOCKED",
        }
    }

    /// Whether a human has to look at the vendor before onboarding continues.
    pub fn requires_escalation(self) -> bool {
        self >= Recommendation::EnhancedDueDiligence
    }
}

/// Score-derived severity band shared by findings and the overall risk label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Severity::Critical
        } else if score >= 0.6 {
            Severity::High
        } else if score >= 0.4 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

/// One audit-facing observation about a notable signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFinding {
    pub category: String,
    pub severity: Severity,
    pub description: String,
}

/// The engine's output for one request, handed to persistence and notification consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeAssessment {
    pub request_id: RequestId,
    #[serde(flatten)]
    pub vendor: VendorRecord,
    pub composite_score: f64,
    pub recommendation: Recommendation,
    pub overall_risk_level: Severity,
    pub risk_factors: Vec<String>,
    pub key_findings: Vec<KeyFinding>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    #[serde(default)]
    pub signal_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub signal_statuses: BTreeMap<String, SignalStatus>,
    #[serde(default)]
    pub signal_details: BTreeMap<String, Value>,
    pub assessed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub(crate) const FALLBACK_COMPOSITE_SCORE: f64 = 0.5;

impl CompositeAssessment {
    /// Conservative record used when the pipeline itself failed: escalate to a human, never
    /// approve.
    pub fn fallback(request_id: RequestId, vendor: VendorRecord, error: impl Into<String>) -> Self {
        let recommendation = Recommendation::ManualReview;
        let overall_risk_level = Severity::from_score(FALLBACK_COMPOSITE_SCORE);
        Self {
            request_id,
            vendor,
            composite_score: FALLBACK_COMPOSITE_SCORE,
            recommendation,
            overall_risk_level,
            risk_factors: vec!["analysis_error".to_string()],
            key_findings: Vec::new(),
            summary: format!(
                "{} after analysis error ({} overall risk)",
                recommendation.label(),
                overall_risk_level.label()
            ),
            block_reason: None,
            signal_scores: BTreeMap::new(),
            signal_statuses: BTreeMap::new(),
            signal_details: BTreeMap::new(),
            assessed_at: Utc::now(),
            error: Some(error.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Rounds to three decimals for the wire format.
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
