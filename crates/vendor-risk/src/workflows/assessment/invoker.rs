use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::domain::{SignalResult, SignalSet, SignalStatus, VendorRecord};
use super::policy::{WeightTable, FALLBACK_SIGNAL_SCORE};

const DEFAULT_SIGNAL_TIMEOUT: Duration = Duration::from_secs(5);

/// External collaborator that scores one aspect of a vendor.
///
/// Implementations return the producer's raw JSON payload; the invoker is responsible for
/// extracting the score and factor tags so every producer is held to the same contract.
#[async_trait]
pub trait SignalProducer: Send + Sync {
    async fn score(&self, vendor: &VendorRecord) -> Result<Value, ProducerError>;
}

/// Anything able to produce one result per weighted signal.
#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn collect(&self, vendor: &VendorRecord, weights: &WeightTable) -> SignalSet;
}

/// Reasons a producer call yields no usable result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProducerError {
    #[error("producer did not respond within {0:?}")]
    Timeout(Duration),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("payload has no score field")]
    MissingScore,
    #[error("producer task panicked")]
    Panicked,
    #[error("no producer configured")]
    Unconfigured,
}

/// Per-call bound and fallback score applied by the invoker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvokerSettings {
    pub timeout: Duration,
    pub fallback_score: f64,
}

impl Default for InvokerSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SIGNAL_TIMEOUT,
            fallback_score: FALLBACK_SIGNAL_SCORE,
        }
    }
}

/// Fans a vendor record out to every weighted producer and always returns one result per
/// weighted signal.
#[derive(Clone, Default)]
pub struct SignalInvoker {
    producers: BTreeMap<String, Arc<dyn SignalProducer>>,
    settings: InvokerSettings,
}

impl SignalInvoker {
    pub fn new(settings: InvokerSettings) -> Self {
        Self {
            producers: BTreeMap::new(),
            settings,
        }
    }

    pub fn with_producer(
        mut self,
        signal: impl Into<String>,
        producer: Arc<dyn SignalProducer>,
    ) -> Self {
        self.register(signal, producer);
        self
    }

    pub fn register(&mut self, signal: impl Into<String>, producer: Arc<dyn SignalProducer>) {
        self.producers.insert(signal.into(), producer);
    }

    pub fn settings(&self) -> &InvokerSettings {
        &self.settings
    }

    /// Calls every producer named in `weights` concurrently. Failures of any kind are
    /// replaced with a FAILED result at the fallback score; sibling calls are unaffected.
    pub async fn invoke_all(&self, vendor: &VendorRecord, weights: &WeightTable) -> SignalSet {
        let vendor = Arc::new(vendor.clone());
        let timeout = self.settings.timeout;

        let calls = weights.signals().map(|signal| {
            let producer = self.producers.get(signal).cloned();
            let vendor = Arc::clone(&vendor);
            let signal = signal.to_string();
            async move {
                let outcome = call_producer(producer, vendor, timeout).await;
                (signal, outcome)
            }
        });

        join_all(calls)
            .await
            .into_iter()
            .map(|(signal, outcome)| {
                let result = match outcome.and_then(|payload| parse_payload(&signal, payload)) {
                    Ok(result) => {
                        debug!(
                            signal = %signal,
                            score = result.score(),
                            status = result.status().label(),
                            "signal collected"
                        );
                        result
                    }
                    Err(err) => {
                        warn!(signal = %signal, error = %err, "signal producer failed; using fallback score");
                        SignalResult::failed(&signal, self.settings.fallback_score, err.to_string())
                    }
                };
                (signal, result)
            })
            .collect()
    }
}

#[async_trait]
impl SignalSource for SignalInvoker {
    async fn collect(&self, vendor: &VendorRecord, weights: &WeightTable) -> SignalSet {
        self.invoke_all(vendor, weights).await
    }
}

async fn call_producer(
    producer: Option<Arc<dyn SignalProducer>>,
    vendor: Arc<VendorRecord>,
    timeout: Duration,
) -> Result<Value, ProducerError> {
    let producer = producer.ok_or(ProducerError::Unconfigured)?;
    let mut task = tokio::spawn(async move { producer.score(&vendor).await });

    match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) if join_error.is_panic() => Err(ProducerError::Panicked),
        Ok(Err(join_error)) => Err(ProducerError::Transport(join_error.to_string())),
        Err(_) => {
            task.abort();
            Err(ProducerError::Timeout(timeout))
        }
    }
}

/// Extracts score and factor tags from a producer payload.
///
/// Accepts `score` or `<signal>RiskScore`, and `factors`, `<signal>RiskFactors`, or
/// `riskFactors`. A payload reporting an `error` or `degraded: true` alongside a usable score
/// is DEGRADED.
pub(crate) fn parse_payload(signal: &str, payload: Value) -> Result<SignalResult, ProducerError> {
    let Value::Object(map) = &payload else {
        return Err(ProducerError::Malformed(
            "payload is not a JSON object".to_string(),
        ));
    };

    let score_key = format!("{signal}RiskScore");
    let raw_score = map
        .get("score")
        .or_else(|| map.get(&score_key))
        .ok_or(ProducerError::MissingScore)?;
    let score = raw_score
        .as_f64()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ProducerError::Malformed(format!("score is not a number: {raw_score}")))?;

    if !(0.0..=1.0).contains(&score) {
        warn!(signal, score, "producer score outside [0, 1]; clamping");
    }

    let factors = parse_factors(signal, map)?;
    let degraded = map.get("error").is_some_and(|error| !error.is_null())
        || map.get("degraded").and_then(Value::as_bool) == Some(true);
    let status = if degraded {
        SignalStatus::Degraded
    } else {
        SignalStatus::Ok
    };

    Ok(SignalResult::new(score, factors, status, payload))
}

fn parse_factors(signal: &str, map: &Map<String, Value>) -> Result<Vec<String>, ProducerError> {
    let factors_key = format!("{signal}RiskFactors");
    let Some(raw) = map
        .get("factors")
        .or_else(|| map.get(&factors_key))
        .or_else(|| map.get("riskFactors"))
    else {
        return Ok(Vec::new());
    };

    match raw {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    ProducerError::Malformed(format!("factor is not a string: {item}"))
                })
            })
            .collect(),
        other => Err(ProducerError::Malformed(format!(
            "factors is not a list: {other}"
        ))),
    }
}
