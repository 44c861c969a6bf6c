//! Offline heuristics usable when no remote producer is deployed. They look only at the
//! submitted text and never reach external data sources.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::super::domain::VendorRecord;
use super::super::invoker::{ProducerError, SignalProducer};

const LEGITIMATE_DOMAINS: &[&str] = &[
    "google.com",
    "microsoft.com",
    "amazon.com",
    "apple.com",
    "meta.com",
    "facebook.com",
    "netflix.com",
    "adobe.com",
    "salesforce.com",
    "oracle.com",
    "ibm.com",
    "intel.com",
    "cisco.com",
    "dell.com",
    "hp.com",
    "sap.com",
];

const DISPOSABLE_DOMAINS: &[&str] = &[
    "tempmail.com",
    "guerrillamail.com",
    "10minutemail.com",
    "throwaway.email",
    "mailinator.com",
    "trashmail.com",
    "temp-mail.org",
    "fakeinbox.com",
];

const FRAUD_KEYWORDS: &[&str] = &[
    "scam",
    "fraud",
    "ponzi",
    "pyramid",
    "guaranteed returns",
    "get rich quick",
    "make money fast",
    "act now",
    "limited time",
    "expires soon",
];

const MODEL_VERSION: &str = "heuristic-v1";

/// Scores the contact email domain: well-known companies are low risk, disposable inboxes
/// are high risk.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailDomainProducer;

#[async_trait]
impl SignalProducer for EmailDomainProducer {
    async fn score(&self, vendor: &VendorRecord) -> Result<Value, ProducerError> {
        let Some(domain) = vendor.email_domain() else {
            return Ok(json!({
                "score": 0.6,
                "factors": ["invalid_email"],
                "modelVersion": MODEL_VERSION,
            }));
        };

        let (score, factors): (f64, Vec<&str>) = if LEGITIMATE_DOMAINS.contains(&domain.as_str()) {
            (0.05, Vec::new())
        } else if DISPOSABLE_DOMAINS.contains(&domain.as_str()) {
            (0.90, vec!["disposable_email"])
        } else {
            (0.12, Vec::new())
        };

        Ok(json!({
            "score": score,
            "factors": factors,
            "domain": domain,
            "modelVersion": MODEL_VERSION,
        }))
    }
}

/// Counts fraud keywords in the vendor name and description.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScreenProducer;

#[async_trait]
impl SignalProducer for KeywordScreenProducer {
    async fn score(&self, vendor: &VendorRecord) -> Result<Value, ProducerError> {
        let text = format!("{} {}", vendor.vendor_name, vendor.business_description).to_lowercase();
        let matched: Vec<&str> = FRAUD_KEYWORDS
            .iter()
            .copied()
            .filter(|keyword| text.contains(keyword))
            .collect();

        let score = match matched.len() {
            0 => 0.12,
            1 | 2 => 0.45,
            _ => 0.85,
        };
        let factors: Vec<String> = matched
            .iter()
            .map(|keyword| format!("fraud_keyword_{}", keyword.replace(' ', "_")))
            .collect();

        Ok(json!({
            "score": score,
            "factors": factors,
            "keywordMatches": matched.len(),
            "modelVersion": MODEL_VERSION,
        }))
    }
}
