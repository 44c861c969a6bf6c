use async_trait::async_trait;
use serde_json::Value;

use super::super::domain::VendorRecord;
use super::super::invoker::{ProducerError, SignalProducer};

/// Producer reached over HTTP: POSTs the vendor record as JSON and returns the response body.
///
/// The invoker owns the timeout, so the client carries none of its own.
#[derive(Debug, Clone)]
pub struct HttpSignalProducer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSignalProducer {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SignalProducer for HttpSignalProducer {
    async fn score(&self, vendor: &VendorRecord) -> Result<Value, ProducerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(vendor)
            .send()
            .await
            .map_err(|err| ProducerError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProducerError::Transport(format!(
                "{} responded with {status}",
                self.endpoint
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| ProducerError::Malformed(err.to_string()))
    }
}
