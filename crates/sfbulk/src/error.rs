//! 💀 The errors that stop a run.
//!
//! Not every bad thing is an error here. A batch that Salesforce half-rejects, a 500,
//! a dropped TCP connection: those are *outcomes* (see `delivery::BatchOutcome`), they
//! get logged, counted, and the run moves on to the next batch.
//!
//! The variants below are the other kind. A broken template or a missing object name
//! will break every row the same way, so we stop at the first one instead of
//! spamming the log ten thousand times.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BulkError {
    /// 🔧 Something required is missing or nonsensical before a single row is read.
    #[error("💀 configuration error: {0}")]
    Configuration(String),

    /// 🎭 The template engine threw while rendering a row.
    #[error("💀 the item template failed to render a row: {0}")]
    TemplateRender(String),

    /// 📜 The template rendered, but what came out is not a JSON object.
    #[error("💀 item template output is not a properly formatted JSON object ({reason}). rendered text was: {rendered}")]
    MalformedTemplateOutput { reason: String, rendered: String },

    /// 🪆 A flat key and a dotted key want the same spot, e.g. `a` = 1 and `a.b` = 2.
    #[error("💀 field `{key}` collides with another field at `{path}`: one of them is a value, the other needs it to be an object")]
    ConflictingKeys { key: String, path: String },
}

impl BulkError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        BulkError::Configuration(message.into())
    }
}
