use std::io::Read;

use serde::{Deserialize, Deserializer};

use crate::workflows::assessment::{IntakeSubmission, RequestId, VendorRecord};

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<IntakeSubmission>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut submissions = Vec::new();

    for record in csv_reader.deserialize::<VendorRow>() {
        submissions.push(record?.into_submission());
    }

    Ok(submissions)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VendorRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    request_id: Option<String>,
    vendor_name: String,
    contact_email: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    business_description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    tax_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    source_ip: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    submitted_at: Option<String>,
}

impl VendorRow {
    fn into_submission(self) -> IntakeSubmission {
        IntakeSubmission {
            request_id: self.request_id.map(RequestId),
            vendor: VendorRecord {
                vendor_name: self.vendor_name,
                contact_email: self.contact_email,
                business_description: self.business_description.unwrap_or_default(),
                tax_id: self.tax_id,
                source_ip: self.source_ip,
                submitted_at: self.submitted_at,
            },
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}
