use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::super::domain::VendorRecord;
use super::super::invoker::{ProducerError, SignalProducer};

/// Returns the same payload for every vendor, optionally after a delay.
#[derive(Debug, Clone)]
pub struct FixedSignalProducer {
    payload: Value,
    delay: Option<Duration>,
}

impl FixedSignalProducer {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            delay: None,
        }
    }

    pub fn scored(score: f64, factors: &[&str]) -> Self {
        Self::new(json!({ "score": score, "factors": factors }))
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl SignalProducer for FixedSignalProducer {
    async fn score(&self, _vendor: &VendorRecord) -> Result<Value, ProducerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.payload.clone())
    }
}

/// Stands in for a weighted signal with no reachable producer.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredProducer;

#[async_trait]
impl SignalProducer for UnconfiguredProducer {
    async fn score(&self, _vendor: &VendorRecord) -> Result<Value, ProducerError> {
        Err(ProducerError::Unconfigured)
    }
}
