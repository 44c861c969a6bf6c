use serde_json::Value;

use super::super::domain::{Recommendation, SignalSet};
use super::super::policy::RecommendationThresholds;

/// Structural condition that forces a BLOCKED decision regardless of score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralBlock {
    /// The producer reported `complianceStatus: BLOCKED`.
    ComplianceBlocked { signal: String },
    /// The producer listed a matched entity with CRITICAL severity.
    CriticalMatch {
        signal: String,
        entity: Option<String>,
    },
}

impl StructuralBlock {
    pub fn signal(&self) -> &str {
        match self {
            StructuralBlock::ComplianceBlocked { signal }
            | StructuralBlock::CriticalMatch { signal, .. } => signal,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            StructuralBlock::ComplianceBlocked { signal } => {
                format!("{signal} reported compliance status BLOCKED")
            }
            StructuralBlock::CriticalMatch {
                signal,
                entity: Some(entity),
            } => format!("{signal} reported a critical watchlist match: {entity}"),
            StructuralBlock::CriticalMatch {
                signal,
                entity: None,
            } => format!("{signal} reported a critical watchlist match"),
        }
    }
}

/// Finds the first structural block in signal-name order.
pub fn find_structural_block(signals: &SignalSet) -> Option<StructuralBlock> {
    signals
        .iter()
        .find_map(|(signal, result)| inspect_raw(signal, result.raw()))
}

fn inspect_raw(signal: &str, raw: &Value) -> Option<StructuralBlock> {
    let compliance_blocked = raw
        .get("complianceStatus")
        .and_then(Value::as_str)
        .is_some_and(|status| status.eq_ignore_ascii_case("BLOCKED"));
    if compliance_blocked {
        return Some(StructuralBlock::ComplianceBlocked {
            signal: signal.to_string(),
        });
    }

    let matched = raw.get("matchedEntities").and_then(Value::as_array)?;
    matched
        .iter()
        .find(|entity| {
            entity
                .get("severity")
                .and_then(Value::as_str)
                .is_some_and(|severity| severity.eq_ignore_ascii_case("CRITICAL"))
        })
        .map(|entity| StructuralBlock::CriticalMatch {
            signal: signal.to_string(),
            entity: entity
                .get("matched_text")
                .or_else(|| entity.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
        })
}

/// Maps a composite score to a recommendation. A structural block always wins.
pub fn decide(
    score: f64,
    signals: &SignalSet,
    thresholds: &RecommendationThresholds,
) -> Recommendation {
    if find_structural_block(signals).is_some() {
        return Recommendation::Blocked;
    }

    if score >= thresholds.manual_review {
        Recommendation::ManualReview
    } else if score >= thresholds.enhanced_due_diligence {
        Recommendation::EnhancedDueDiligence
    } else if score >= thresholds.standard_review {
        Recommendation::StandardReview
    } else {
        Recommendation::AutoApprove
    }
}
