//! Alidns response bodies

use serde::Deserialize;

/// Error body returned in place of any response
#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DescribeDomainsResponse {
    #[serde(rename = "Domains", default)]
    pub domains: DomainsWrapper,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DomainsWrapper {
    #[serde(rename = "Domain", default)]
    pub domain: Vec<DomainResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainResult {
    #[serde(rename = "DomainName")]
    pub domain_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DescribeSubDomainRecordsResponse {
    #[serde(rename = "DomainRecords", default)]
    pub domain_records: DomainRecordsWrapper,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DomainRecordsWrapper {
    #[serde(rename = "Record", default)]
    pub record: Vec<RecordResult>,
}

/// A record as Alidns describes it; `Status` is ignored so that paused
/// records still count for ownership.
#[derive(Debug, Deserialize)]
pub(crate) struct RecordResult {
    #[serde(rename = "RecordId")]
    pub record_id: String,
    #[serde(rename = "RR")]
    pub rr: String,
    #[serde(rename = "DomainName")]
    pub domain_name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "TTL")]
    pub ttl: u32,
    #[serde(rename = "Remark")]
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddDomainRecordResponse {
    #[serde(rename = "RecordId")]
    pub record_id: String,
}
