use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::domain::{SignalSet, SignalStatus};

/// House default "neutral/unknown" risk substituted for a signal that could not be computed.
pub const FALLBACK_SIGNAL_SCORE: f64 = 0.3;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
const DEFAULT_NOTABLE_THRESHOLD: f64 = 0.6;

/// Invalid risk configuration. Fatal at load time; never defaulted per request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("weight table must name at least one signal")]
    EmptyWeightTable,
    #[error("signal '{0}' appears more than once in the weight table")]
    DuplicateSignal(String),
    #[error("signal '{signal}' has negative weight {weight}")]
    NegativeWeight { signal: String, weight: f64 },
    #[error("signal '{0}' has a non-finite weight")]
    NonFiniteWeight(String),
    #[error("weights must sum to 1.0 (found {total:.6})")]
    WeightSum { total: f64 },
    #[error("override rule references unknown signal '{0}'")]
    UnknownOverrideSignal(String),
    #[error("override floor {floor} for signal '{signal}' is outside [0, 1]")]
    FloorOutOfRange { signal: String, floor: f64 },
    #[error("override threshold {threshold} for signal '{signal}' is outside [0, 1]")]
    OverrideThresholdOutOfRange { signal: String, threshold: f64 },
    #[error("recommendation thresholds must descend: manual review > enhanced due diligence > standard review")]
    ThresholdOrder,
    #[error("recommendation threshold {0} is outside [0, 1]")]
    ThresholdOutOfRange(f64),
    #[error("notable threshold {threshold} for signal '{signal}' is outside [0, 1]")]
    NotableThresholdOutOfRange { signal: String, threshold: f64 },
    #[error("notable threshold configured for unknown signal '{0}'")]
    UnknownNotableSignal(String),
}

/// One row of the weight table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalWeight {
    pub signal: String,
    pub weight: f64,
}

impl SignalWeight {
    pub fn new(signal: impl Into<String>, weight: f64) -> Self {
        Self {
            signal: signal.into(),
            weight,
        }
    }
}

/// Validated, ordered signal weights. The row order is the fixed iteration order used for
/// explanations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SignalWeight>", into = "Vec<SignalWeight>")]
pub struct WeightTable {
    entries: Vec<SignalWeight>,
}

impl WeightTable {
    pub fn new(entries: Vec<SignalWeight>) -> Result<Self, ConfigurationError> {
        if entries.is_empty() {
            return Err(ConfigurationError::EmptyWeightTable);
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.signal.as_str()) {
                return Err(ConfigurationError::DuplicateSignal(entry.signal.clone()));
            }
            if !entry.weight.is_finite() {
                return Err(ConfigurationError::NonFiniteWeight(entry.signal.clone()));
            }
            if entry.weight < 0.0 {
                return Err(ConfigurationError::NegativeWeight {
                    signal: entry.signal.clone(),
                    weight: entry.weight,
                });
            }
        }

        let total: f64 = entries.iter().map(|entry| entry.weight).sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigurationError::WeightSum { total });
        }

        Ok(Self { entries })
    }

    /// Splits the weight evenly across the named signals.
    pub fn equal<S: AsRef<str>>(signals: &[S]) -> Result<Self, ConfigurationError> {
        if signals.is_empty() {
            return Err(ConfigurationError::EmptyWeightTable);
        }
        let share = 1.0 / signals.len() as f64;
        Self::new(
            signals
                .iter()
                .map(|signal| SignalWeight::new(signal.as_ref(), share))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries
            .iter()
            .map(|entry| (entry.signal.as_str(), entry.weight))
    }

    pub fn signals(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.signal.as_str())
    }

    pub fn weight(&self, signal: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.signal == signal)
            .map(|entry| entry.weight)
    }

    pub fn contains(&self, signal: &str) -> bool {
        self.weight(signal).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<SignalWeight>> for WeightTable {
    type Error = ConfigurationError;

    fn try_from(entries: Vec<SignalWeight>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<WeightTable> for Vec<SignalWeight> {
    fn from(table: WeightTable) -> Self {
        table.entries
    }
}

/// Predicate evaluated against one named signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverrideCondition {
    ScoreAtLeast { threshold: f64 },
    StatusIs { status: SignalStatus },
}

/// Raises the composite score to at least `floor` when its condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideRule {
    pub signal: String,
    pub condition: OverrideCondition,
    pub floor: f64,
}

impl OverrideRule {
    pub fn score_at_least(signal: impl Into<String>, threshold: f64, floor: f64) -> Self {
        Self {
            signal: signal.into(),
            condition: OverrideCondition::ScoreAtLeast { threshold },
            floor,
        }
    }

    pub fn status_is(signal: impl Into<String>, status: SignalStatus, floor: f64) -> Self {
        Self {
            signal: signal.into(),
            condition: OverrideCondition::StatusIs { status },
            floor,
        }
    }

    pub fn matches(&self, signals: &SignalSet) -> bool {
        let Some(result) = signals.get(&self.signal) else {
            return false;
        };

        match &self.condition {
            OverrideCondition::ScoreAtLeast { threshold } => result.score() >= *threshold,
            OverrideCondition::StatusIs { status } => result.status() == *status,
        }
    }

    fn validate(&self, weights: &WeightTable) -> Result<(), ConfigurationError> {
        if !weights.contains(&self.signal) {
            return Err(ConfigurationError::UnknownOverrideSignal(
                self.signal.clone(),
            ));
        }
        if !is_unit(self.floor) {
            return Err(ConfigurationError::FloorOutOfRange {
                signal: self.signal.clone(),
                floor: self.floor,
            });
        }
        if let OverrideCondition::ScoreAtLeast { threshold } = self.condition {
            if !is_unit(threshold) {
                return Err(ConfigurationError::OverrideThresholdOutOfRange {
                    signal: self.signal.clone(),
                    threshold,
                });
            }
        }
        Ok(())
    }
}

/// Lower bounds of the score bands used by the recommendation engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecommendationThresholds {
    pub manual_review: f64,
    pub enhanced_due_diligence: f64,
    pub standard_review: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            manual_review: 0.7,
            enhanced_due_diligence: 0.5,
            standard_review: 0.3,
        }
    }
}

impl RecommendationThresholds {
    fn validate(&self) -> Result<(), ConfigurationError> {
        for threshold in [
            self.manual_review,
            self.enhanced_due_diligence,
            self.standard_review,
        ] {
            if !is_unit(threshold) {
                return Err(ConfigurationError::ThresholdOutOfRange(threshold));
            }
        }

        if self.manual_review > self.enhanced_due_diligence
            && self.enhanced_due_diligence > self.standard_review
        {
            Ok(())
        } else {
            Err(ConfigurationError::ThresholdOrder)
        }
    }
}

/// Read-only risk configuration shared by every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskPolicy {
    weights: WeightTable,
    overrides: Vec<OverrideRule>,
    thresholds: RecommendationThresholds,
    notable_thresholds: BTreeMap<String, f64>,
    default_notable_threshold: f64,
}

impl RiskPolicy {
    pub fn new(
        weights: WeightTable,
        overrides: Vec<OverrideRule>,
        thresholds: RecommendationThresholds,
    ) -> Result<Self, ConfigurationError> {
        let policy = Self {
            weights,
            overrides,
            thresholds,
            notable_thresholds: BTreeMap::new(),
            default_notable_threshold: DEFAULT_NOTABLE_THRESHOLD,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Production weights: entity resolution carries the most weight, and sanctions or
    /// criminal findings set hard floors.
    pub fn standard() -> Self {
        let weights = WeightTable {
            entries: vec![
                SignalWeight::new("entity", 0.30),
                SignalWeight::new("network", 0.15),
                SignalWeight::new("behavioral", 0.15),
                SignalWeight::new("payment", 0.15),
                SignalWeight::new("legal", 0.15),
                SignalWeight::new("trust", 0.10),
            ],
        };

        Self {
            weights,
            overrides: vec![
                OverrideRule::score_at_least("entity", 0.95, 0.95),
                OverrideRule::score_at_least("legal", 0.90, 0.90),
            ],
            thresholds: RecommendationThresholds::default(),
            notable_thresholds: BTreeMap::new(),
            default_notable_threshold: DEFAULT_NOTABLE_THRESHOLD,
        }
    }

    pub fn with_notable_threshold(
        mut self,
        signal: impl Into<String>,
        threshold: f64,
    ) -> Result<Self, ConfigurationError> {
        self.notable_thresholds.insert(signal.into(), threshold);
        self.validate()?;
        Ok(self)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PolicyLoadError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parses a JSON policy document and validates it.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PolicyLoadError> {
        let document: PolicyDocument = serde_json::from_reader(reader)?;
        let policy = Self {
            weights: document.weights,
            overrides: document.overrides,
            thresholds: document.thresholds,
            notable_thresholds: document.notable_thresholds,
            default_notable_threshold: document
                .default_notable_threshold
                .unwrap_or(DEFAULT_NOTABLE_THRESHOLD),
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.weights.is_empty() {
            return Err(ConfigurationError::EmptyWeightTable);
        }
        for rule in &self.overrides {
            rule.validate(&self.weights)?;
        }
        self.thresholds.validate()?;

        if !is_unit(self.default_notable_threshold) {
            return Err(ConfigurationError::NotableThresholdOutOfRange {
                signal: "*".to_string(),
                threshold: self.default_notable_threshold,
            });
        }
        for (signal, threshold) in &self.notable_thresholds {
            if !self.weights.contains(signal) {
                return Err(ConfigurationError::UnknownNotableSignal(signal.clone()));
            }
            if !is_unit(*threshold) {
                return Err(ConfigurationError::NotableThresholdOutOfRange {
                    signal: signal.clone(),
                    threshold: *threshold,
                });
            }
        }
        Ok(())
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    pub fn overrides(&self) -> &[OverrideRule] {
        &self.overrides
    }

    pub fn thresholds(&self) -> &RecommendationThresholds {
        &self.thresholds
    }

    pub fn notable_threshold(&self, signal: &str) -> f64 {
        self.notable_thresholds
            .get(signal)
            .copied()
            .unwrap_or(self.default_notable_threshold)
    }
}

/// Unknown keys are rejected so a misspelled section cannot silently drop overrides.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PolicyDocument {
    weights: WeightTable,
    #[serde(default)]
    overrides: Vec<OverrideRule>,
    #[serde(default)]
    thresholds: RecommendationThresholds,
    #[serde(default)]
    notable_thresholds: BTreeMap<String, f64>,
    #[serde(default)]
    default_notable_threshold: Option<f64>,
}

/// Failure to read a policy document from disk or parse it.
#[derive(Debug, thiserror::Error)]
pub enum PolicyLoadError {
    #[error("failed to read risk policy: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid risk policy document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid risk policy: {0}")]
    Invalid(#[from] ConfigurationError),
}

fn is_unit(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
