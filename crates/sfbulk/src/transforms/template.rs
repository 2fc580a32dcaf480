//! 🎭 Item templates — `Record → text`, pluggable.
//!
//! The encoder doesn't care who renders the text, only that it comes back as a JSON
//! object. Anything implementing [`RecordTemplate`] will do, closures included.
//! The shipped one is [`JinjaTemplate`], because the people writing these templates
//! already know Jinja, and minijinja speaks it fluently enough.
//!
//! ```text
//! {"Name": {{ row.company | tojson }}, "Owner.Email": {{ row.email | tojson }}}
//! ```

use minijinja::{Environment, context};

use crate::common::Record;
use crate::error::BulkError;

/// 🎭 Turns one row into the text of one JSON object.
pub trait RecordTemplate: Send + Sync {
    fn render(&self, record: &Record) -> Result<String, BulkError>;
}

impl<F> RecordTemplate for F
where
    F: Fn(&Record) -> Result<String, BulkError> + Send + Sync,
{
    fn render(&self, record: &Record) -> Result<String, BulkError> {
        self(record)
    }
}

/// 🥷 Jinja-flavored item template. The row is bound as `row`.
pub struct JinjaTemplate {
    env: Environment<'static>,
    source_len: usize,
}

impl JinjaTemplate {
    const NAME: &'static str = "item";

    /// 🏗️ Compile once, render many. Syntax errors surface here, before any row is read.
    pub fn new(source: impl Into<String>) -> Result<Self, BulkError> {
        let source = source.into();
        let source_len = source.len();
        let mut env = Environment::new();
        env.add_template_owned(Self::NAME, source)
            .map_err(|e| BulkError::TemplateRender(format!("template does not compile: {e}")))?;
        Ok(Self { env, source_len })
    }
}

impl std::fmt::Debug for JinjaTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JinjaTemplate")
            .field("source_len", &self.source_len)
            .finish()
    }
}

impl RecordTemplate for JinjaTemplate {
    fn render(&self, record: &Record) -> Result<String, BulkError> {
        let template = self
            .env
            .get_template(Self::NAME)
            .map_err(|e| BulkError::TemplateRender(e.to_string()))?;
        template
            .render(context! { row => record })
            .map_err(|e| BulkError::TemplateRender(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn row(value: Value) -> Record {
        match value {
            Value::Object(m) => m,
            other => panic!("💀 rows are objects, not {other}"),
        }
    }

    #[test]
    fn the_one_where_the_row_is_bound_as_row() {
        let template = JinjaTemplate::new(r#"{"Name": "{{ row.company }}"}"#).unwrap();
        let rendered = template.render(&row(json!({"company": "Acme"}))).unwrap();
        assert_eq!(rendered, r#"{"Name": "Acme"}"#);
    }

    #[test]
    fn the_one_where_tojson_quotes_things_properly() {
        let template = JinjaTemplate::new(r#"{"Name": {{ row.company | tojson }}}"#).unwrap();
        let rendered = template
            .render(&row(json!({"company": "Say \"cheese\""})))
            .unwrap();
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, json!({"Name": "Say \"cheese\""}));
    }

    #[test]
    fn the_one_where_a_syntax_error_is_caught_at_construction() {
        let err = JinjaTemplate::new(r#"{"Name": {{ row.company "#).unwrap_err();
        assert!(matches!(err, BulkError::TemplateRender(_)));
    }

    #[test]
    fn the_one_where_a_runtime_failure_is_a_render_error() {
        let template = JinjaTemplate::new(r#"{{ definitely_not_a_function(row) }}"#).unwrap();
        let err = template.render(&row(json!({"a": 1}))).unwrap_err();
        assert!(matches!(err, BulkError::TemplateRender(_)));
    }

    #[test]
    fn the_one_where_a_plain_closure_is_a_template_too() {
        let shout = |record: &Record| -> Result<String, BulkError> {
            Ok(format!("{{\"count\": {}}}", record.len()))
        };
        assert_eq!(shout.render(&row(json!({"a": 1, "b": 2}))).unwrap(), r#"{"count": 2}"#);
    }
}
