use super::super::domain::{clamp_unit, SignalSet};
use super::super::policy::{OverrideRule, WeightTable};
use super::AssessmentError;

/// Reduces a signal set to one composite score in `[0, 1]`.
///
/// The weighted sum is taken over the weight table, then each matching override raises the
/// result to at least its floor. Overrides never lower the score.
pub fn aggregate(
    signals: &SignalSet,
    weights: &WeightTable,
    overrides: &[OverrideRule],
) -> Result<f64, AssessmentError> {
    if signals.is_empty() || weights.is_empty() {
        return Err(AssessmentError::EmptySignalSet);
    }

    let mut weighted = 0.0;
    for (signal, weight) in weights.iter() {
        let result = signals
            .get(signal)
            .ok_or_else(|| AssessmentError::MissingSignal(signal.to_string()))?;
        weighted += weight * result.score();
    }

    let mut composite = clamp_unit(weighted);
    for rule in overrides {
        if rule.matches(signals) {
            composite = composite.max(rule.floor);
        }
    }

    Ok(clamp_unit(composite))
}
