use reqwest::Method;

use crate::error::BulkError;

/// 🧭 Verb + URL for every batch of the run. Decided once, never renegotiated.
///
/// - no external id: `POST  {instance}/services/data/{version}/composite/sobjects`
/// - external id:    `PATCH {instance}/services/data/{version}/composite/sobjects/{object}/{external_id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub url: String,
}

impl Endpoint {
    pub fn resolve(
        instance_url: &str,
        api_version: &str,
        object: &str,
        external_id: Option<&str>,
    ) -> Result<Self, BulkError> {
        // -- 🧹 "/" hygiene. One slash of difference, infinite suffering of difference.
        let instance_url = instance_url.trim().trim_end_matches('/');
        let api_version = api_version.trim().trim_matches('/');
        let object = object.trim();

        if instance_url.is_empty() {
            return Err(BulkError::config("the Salesforce instance URL is missing"));
        }
        if api_version.is_empty() {
            return Err(BulkError::config("the Salesforce API version is missing"));
        }
        if object.is_empty() {
            return Err(BulkError::config("the Salesforce object name is missing"));
        }

        let collection = format!("{instance_url}/services/data/{api_version}/composite/sobjects");
        let endpoint = match external_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(external_id) => Self {
                method: Method::PATCH,
                url: format!("{collection}/{object}/{external_id}"),
            },
            None => Self {
                method: Method::POST,
                url: collection,
            },
        };
        Ok(endpoint)
    }

    /// 🔑 PATCH on an external id means "insert or update, you figure it out".
    pub fn is_upsert(&self) -> bool {
        self.method == Method::PATCH
    }
}
