//! 🔄 Transforms — from "a row in a CSV" to "an sObject Salesforce will accept".
//!
//! ```text
//!   Record ──▶ [template? render + parse] ──▶ [expand a.b.c keys] ──▶ [+ attributes.type] ──▶ EncodedItem
//! ```
//!
//! Three steps, one pure function, one error type. The encoder holds no mutable state,
//! so encoding the same row twice gives the same item twice. Determinism: it's underrated.
//!
//! 🦆

use serde_json::{Value, json};

use crate::common::{DISCRIMINATOR_KEY, EncodedItem, Record};
use crate::error::BulkError;

pub(crate) mod nesting;
pub mod template;

pub use template::{JinjaTemplate, RecordTemplate};

/// 🔤 The default nesting separator: `Owner.Email` → `{"Owner": {"Email": ..}}`.
pub const DEFAULT_SEPARATOR: &str = ".";

/// 📦 `Record → EncodedItem`. Configured once, used for every row of the run.
pub struct RecordEncoder {
    object: String,
    separator: String,
    template: Option<Box<dyn RecordTemplate>>,
}

impl std::fmt::Debug for RecordEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordEncoder")
            .field("object", &self.object)
            .field("separator", &self.separator)
            .field("templated", &self.template.is_some())
            .finish()
    }
}

impl RecordEncoder {
    /// 🚀 An encoder for `object` with the default separator and no template.
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            separator: DEFAULT_SEPARATOR.to_string(),
            template: None,
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_template(mut self, template: impl RecordTemplate + 'static) -> Self {
        self.template = Some(Box::new(template));
        self
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    /// 🔄 Encode one row.
    ///
    /// The discriminator goes in last, so a template (or a column) that produced its own
    /// `attributes` loses that argument.
    pub fn encode(&self, record: Record) -> Result<EncodedItem, BulkError> {
        let shaped = match &self.template {
            Some(template) => parse_rendered_object(template.render(&record)?)?,
            None => record,
        };

        let mut item = nesting::expand_nested_keys(shaped, &self.separator)?;
        item.insert(DISCRIMINATOR_KEY.to_string(), json!({ "type": self.object }));
        Ok(item)
    }
}

fn parse_rendered_object(rendered: String) -> Result<EncodedItem, BulkError> {
    match serde_json::from_str::<Value>(&rendered) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(BulkError::MalformedTemplateOutput {
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
            rendered,
        }),
        Err(e) => Err(BulkError::MalformedTemplateOutput {
            reason: e.to_string(),
            rendered,
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(m) => m,
            other => panic!("💀 records are objects, not {other}"),
        }
    }

    #[test]
    fn the_one_where_a_plain_row_gains_exactly_one_field() {
        let row = record(json!({"Name": "Acme", "Industry": "Anvils", "Employees": 42}));
        let item = RecordEncoder::new("Account").encode(row.clone()).unwrap();

        assert_eq!(item.len(), row.len() + 1);
        for (key, value) in &row {
            assert_eq!(item.get(key), Some(value), "field {key} should survive untouched");
        }
        assert_eq!(item.get("attributes"), Some(&json!({"type": "Account"})));
    }

    #[test]
    fn the_one_where_dotted_keys_become_nested_objects() {
        let item = RecordEncoder::new("Contact")
            .encode(record(json!({"a.b": 1, "a.c": 2})))
            .unwrap();
        assert_eq!(
            Value::Object(item),
            json!({"a": {"b": 1, "c": 2}, "attributes": {"type": "Contact"}})
        );
    }

    #[test]
    fn the_one_where_the_discriminator_wins_every_argument() {
        let item = RecordEncoder::new("Lead")
            .encode(record(json!({"attributes": "mine", "Name": "x"})))
            .unwrap();
        assert_eq!(item.get("attributes"), Some(&json!({"type": "Lead"})));

        let item = RecordEncoder::new("Lead")
            .encode(record(json!({"attributes.type": "Account"})))
            .unwrap();
        assert_eq!(item.get("attributes"), Some(&json!({"type": "Lead"})));
    }

    #[test]
    fn the_one_where_the_template_reshapes_the_row() {
        let encoder = RecordEncoder::new("Account").with_template(
            JinjaTemplate::new(r#"{"Name": {{ row.company | tojson }}, "Owner.Email": {{ row.email | tojson }}}"#)
                .unwrap(),
        );
        let item = encoder
            .encode(record(json!({"company": "Acme", "email": "wile@acme.test", "ignored": "yes"})))
            .unwrap();

        assert_eq!(
            Value::Object(item),
            json!({
                "Name": "Acme",
                "Owner": {"Email": "wile@acme.test"},
                "attributes": {"type": "Account"}
            })
        );
    }

    #[test]
    fn the_one_where_the_template_writes_gibberish() {
        let encoder = RecordEncoder::new("Account")
            .with_template(JinjaTemplate::new(r#"{"Name": {{ row.company }}"#).unwrap());
        let err = encoder.encode(record(json!({"company": "Acme"}))).unwrap_err();
        match err {
            BulkError::MalformedTemplateOutput { rendered, .. } => {
                assert_eq!(rendered, r#"{"Name": Acme"#)
            }
            other => panic!("💀 expected MalformedTemplateOutput, got {other:?}"),
        }
    }

    #[test]
    fn the_one_where_valid_json_is_still_not_an_object() {
        let encoder = RecordEncoder::new("Account")
            .with_template(|_: &Record| -> Result<String, BulkError> { Ok("[1, 2]".to_string()) });
        let err = encoder.encode(Record::new()).unwrap_err();
        assert!(
            matches!(err, BulkError::MalformedTemplateOutput { ref reason, .. } if reason.contains("an array"))
        );
    }

    #[test]
    fn the_one_where_template_failures_bubble_up_untouched() {
        let encoder = RecordEncoder::new("Account").with_template(|_: &Record| -> Result<String, BulkError> {
            Err(BulkError::TemplateRender("boom".to_string()))
        });
        let err = encoder.encode(Record::new()).unwrap_err();
        assert!(matches!(err, BulkError::TemplateRender(ref m) if m == "boom"));
    }

    #[test]
    fn the_one_where_conflicting_keys_stop_the_row() {
        let err = RecordEncoder::new("Account")
            .encode(record(json!({"a": "flat", "a.b": "nested"})))
            .unwrap_err();
        assert!(matches!(err, BulkError::ConflictingKeys { .. }));
    }

    #[test]
    fn the_one_where_a_custom_separator_is_threaded_through() {
        let item = RecordEncoder::new("Account")
            .with_separator("/")
            .encode(record(json!({"Owner/Email": "x", "Web.Site": "y"})))
            .unwrap();
        assert_eq!(item.get("Owner"), Some(&json!({"Email": "x"})));
        assert_eq!(item.get("Web.Site"), Some(&json!("y")));
    }
}
