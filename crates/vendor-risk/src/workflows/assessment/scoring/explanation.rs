use super::super::domain::{KeyFinding, Recommendation, Severity, SignalResult, SignalSet};
use super::super::policy::RiskPolicy;

/// Audit-facing account of how a recommendation was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub risk_factors: Vec<String>,
    pub key_findings: Vec<KeyFinding>,
    /// Derived from the composite score alone; may disagree with a structural block.
    pub overall_risk_level: Severity,
    pub summary: String,
}

/// Builds namespaced risk factors and severity-bucketed findings.
///
/// Signals are visited in weight-table order so the output never depends on which producer
/// answered first. Signals outside the table follow in name order.
pub fn explain(
    signals: &SignalSet,
    score: f64,
    recommendation: Recommendation,
    policy: &RiskPolicy,
) -> Explanation {
    let weights = policy.weights();
    let ordered = weights
        .signals()
        .filter_map(|signal| signals.get(signal).map(|result| (signal, result)))
        .chain(
            signals
                .iter()
                .filter(|(signal, _)| !weights.contains(signal)),
        );

    let mut risk_factors = Vec::new();
    let mut key_findings = Vec::new();

    for (signal, result) in ordered {
        risk_factors.extend(
            result
                .factors()
                .iter()
                .map(|factor| namespaced(signal, factor)),
        );

        if result.score() >= policy.notable_threshold(signal) {
            key_findings.push(finding(signal, result));
        }
    }

    let overall_risk_level = Severity::from_score(score);
    let summary = format!(
        "{} with {} overall risk (composite {:.3})",
        recommendation.label(),
        overall_risk_level.label(),
        score
    );

    Explanation {
        risk_factors,
        key_findings,
        overall_risk_level,
        summary,
    }
}

/// Prefixes a factor with its signal name unless the producer already did.
fn namespaced(signal: &str, factor: &str) -> String {
    match factor.strip_prefix(signal) {
        Some(rest) if rest.starts_with(':') => factor.to_string(),
        _ => format!("{signal}:{factor}"),
    }
}

fn finding(signal: &str, result: &SignalResult) -> KeyFinding {
    let count = result.factors().len();
    let noun = if count == 1 { "factor" } else { "factors" };
    KeyFinding {
        category: signal.to_string(),
        severity: Severity::from_score(result.score()),
        description: format!(
            "Detected {count} {signal} risk {noun} (score {:.2})",
            result.score()
        ),
    }
}
