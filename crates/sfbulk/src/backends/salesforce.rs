//! # 📡 THE SALESFORCE BACKEND
//!
//! *Previously, on sfbulk...*
//!
//! 🎬 COLD OPEN: INT. SANDBOX ORG, FRIDAY, 5:52 PM
//!
//! Forty thousand Accounts stand in a CSV, waiting to be born. The org has a
//! limit of 200 records per composite call and an opinion about every one of
//! them. "Just run the import," someone said. "It's just an API," someone said.
//!
//! 🚀 This module knows where batches go (`Endpoint`) and how they get there
//! (`HttpTransport`). It does not know what a record means, what a 400 means,
//! or why `Ext_Id__c` is spelled like that. The delivery client worries about that.
//!
//! 🦆 (mandatory duck, no context provided, none shall be requested)

mod endpoint;
mod http_transport;

use serde::{Deserialize, Serialize};

pub use endpoint::Endpoint;
pub use http_transport::HttpTransport;

pub const DEFAULT_API_VERSION: &str = "v58.0";

// -- 📡 SalesforceConfig, right next to the code that spends it.
#[derive(Deserialize, Serialize, Clone)]
pub struct SalesforceConfig {
    /// 📡 `https://yourorg.my.salesforce.com`, or `env://VAR` to read it from the environment.
    pub instance_url: String,
    /// 🔒 A ready-to-use bearer token (or `env://VAR`). We never refresh it. If it expires
    /// mid-run, every batch after that comes back 401 and the report will say so.
    pub access_token: String,
    /// 🏷️ `Account`, `Contact`, `My_Object__c`... Also stamped into every record's `attributes.type`.
    pub object: String,
    /// 🔑 When set, batches are upserted (PATCH) on this field instead of inserted.
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// ⏱️ Composite calls with 200 records and a few triggers can take a while. Two minutes.
fn default_request_timeout_secs() -> u64 {
    120
}

// 🔒 Hand-rolled so the token never ends up in a log line. "password123" is not a password,
// it is a confession, and we are not printing it either way.
impl std::fmt::Debug for SalesforceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceConfig")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"<redacted>")
            .field("object", &self.object)
            .field("external_id", &self.external_id)
            .field("api_version", &self.api_version)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl SalesforceConfig {
    /// 🧭 Where this config points. Resolved once, reused for every batch.
    pub fn endpoint(&self) -> Result<Endpoint, crate::error::BulkError> {
        Endpoint::resolve(
            &self.instance_url,
            &self.api_version,
            &self.object,
            self.external_id.as_deref(),
        )
    }
}
