//! 📦 Common data structures — the building blocks of sfbulk.
//!
//! 🎬 A row leaves a CSV file. It is a humble `Record`: column names, string values,
//! no ambitions. A few microseconds later it has been templated, nested, stamped with
//! an `attributes.type`, and it is an `EncodedItem` standing in a queue with 199 friends
//! waiting for a bus called `BulkRequest`. This module defines all of them.
//!
//! 🦆

use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value};

/// 📄 One source row. Field name → scalar, in column order (`preserve_order` keeps it honest).
///
/// Field names may contain the nesting separator (`.` by default); the encoder expands those.
pub type Record = Map<String, Value>;

/// 📦 A Record after templating, key expansion and discriminator injection.
/// Always carries `"attributes": {"type": "<object>"}`.
pub type EncodedItem = Map<String, Value>;

/// 🏷️ The key the encoder injects into every item. Salesforce calls it `attributes`.
pub const DISCRIMINATOR_KEY: &str = "attributes";

/// 📬 The JSON body of a composite sObject call: `{"allOrNone": .., "records": [..]}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPayload<'a> {
    pub all_or_none: bool,
    pub records: &'a [EncodedItem],
}

impl<'a> BulkPayload<'a> {
    pub fn new(all_or_none: bool, records: &'a [EncodedItem]) -> Self {
        Self {
            all_or_none,
            records,
        }
    }

    /// 🔄 Serialize to the wire. A `Map<String, Value>` cannot fail to serialize, but serde
    /// insists on asking, so we answer with a Result like polite people.
    pub fn render(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// 📡 Everything a transport needs to fire one batch: verb, url, rendered body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRequest {
    pub method: Method,
    pub url: String,
    pub body: String,
}

/// 📨 What came back. Status code and the raw body; interpretation happens in `delivery`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_one_where_the_payload_uses_camel_case_like_salesforce_wants() {
        let mut item = EncodedItem::new();
        item.insert("Name".to_string(), json!("Acme"));
        let records = vec![item];

        let rendered = BulkPayload::new(true, &records)
            .render()
            .expect("💀 a map refused to serialize. physics is broken.");
        let parsed: Value = serde_json::from_str(&rendered).expect("💀 we wrote invalid JSON");

        assert_eq!(parsed, json!({"allOrNone": true, "records": [{"Name": "Acme"}]}));
        // -- 🎯 allOrNone comes first, the way the docs print it
        assert!(rendered.starts_with(r#"{"allOrNone":true"#));
    }

    #[test]
    fn the_one_where_an_empty_batch_is_still_a_valid_body() {
        let rendered = BulkPayload::new(false, &[])
            .render()
            .expect("💀 even nothing should serialize");
        assert_eq!(rendered, r#"{"allOrNone":false,"records":[]}"#);
    }
}
