mod fixed;
mod heuristic;
mod http;

pub use fixed::{FixedSignalProducer, UnconfiguredProducer};
pub use heuristic::{EmailDomainProducer, KeywordScreenProducer};
pub use http::HttpSignalProducer;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use super::invoker::{InvokerSettings, SignalInvoker, SignalProducer};
use super::policy::RiskPolicy;

/// Wires a producer for every weighted signal: a remote endpoint when one is configured,
/// an offline heuristic for `trust` and `legal`, and otherwise a producer that always fails so
/// the signal degrades to the fallback score instead of disappearing.
pub fn configured_invoker(
    policy: &RiskPolicy,
    settings: InvokerSettings,
    endpoints: &BTreeMap<String, String>,
) -> SignalInvoker {
    let client = reqwest::Client::new();
    let mut invoker = SignalInvoker::new(settings);

    for signal in policy.weights().signals() {
        let producer: Arc<dyn SignalProducer> = match endpoints.get(signal) {
            Some(endpoint) => {
                info!(signal, endpoint = %endpoint, "using remote signal producer");
                Arc::new(HttpSignalProducer::new(client.clone(), endpoint.clone()))
            }
            None => match signal {
                "trust" => Arc::new(EmailDomainProducer),
                "legal" => Arc::new(KeywordScreenProducer),
                _ => Arc::new(UnconfiguredProducer),
            },
        };
        invoker.register(signal, producer);
    }

    invoker
}
