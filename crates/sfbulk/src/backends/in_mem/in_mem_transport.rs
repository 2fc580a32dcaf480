use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::backends::Transport;
use crate::common::{BulkRequest, TransportResponse};

/// 🎬 One line of the script an [`InMemoryTransport`] follows.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// 📨 Answer with this status and body.
    Respond(TransportResponse),
    /// 🔌 Pretend the network ate the request.
    Fail(String),
}

/// 📓 A transport that never forgets. Every request lands in `requests`.
///
/// Replies come from the script, in order. Once the script runs out, every request is
/// answered with a 200 in which every submitted record succeeded, which is what a
/// well-behaved org would do on a good day.
///
/// Clone-able because tests need to peek inside after handing a copy to the client.
/// The `Arc` means everyone shares the same notebook.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTransport {
    requests: Arc<Mutex<Vec<BulkRequest>>>,
    script: Arc<Mutex<VecDeque<ScriptedReply>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            requests: Arc::default(),
            script: Arc::new(Mutex::new(replies.into_iter().collect())),
        }
    }

    /// 🔍 Every request sent so far, oldest first.
    pub async fn requests(&self) -> Vec<BulkRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// ✅ `[{"id": .., "success": true, "errors": []}, ...]`, one per record in the body.
    fn all_succeeded(body: &str) -> Result<TransportResponse> {
        let payload: Value = serde_json::from_str(body)?;
        let Some(records) = payload.get("records").and_then(Value::as_array) else {
            bail!("💀 in-memory transport got a body with no `records` array: {body}");
        };
        let results: Vec<Value> = (0..records.len())
            .map(|i| json!({"id": format!("001IN{i:013}"), "success": true, "errors": []}))
            .collect();
        Ok(TransportResponse::new(200, Value::Array(results).to_string()))
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&mut self, request: BulkRequest) -> Result<TransportResponse> {
        let body = request.body.clone();
        // 🔒 The Mutex is load-bearing. Do not remove. I know it looks optional. It isn't.
        self.requests.lock().await.push(request);

        match self.script.lock().await.pop_front() {
            Some(ScriptedReply::Respond(response)) => Ok(response),
            Some(ScriptedReply::Fail(reason)) => bail!("{reason}"),
            None => Self::all_succeeded(&body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn request(body: &str) -> BulkRequest {
        BulkRequest {
            method: Method::POST,
            url: "https://example.test/services/data/v58.0/composite/sobjects".to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn the_one_where_the_default_reply_is_everyone_wins() {
        let mut transport = InMemoryTransport::new();
        let response = transport
            .send(request(r#"{"allOrNone":false,"records":[{},{},{}]}"#))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        let results: Vec<Value> = serde_json::from_str(&response.body).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r["success"] == json!(true)));
    }

    #[tokio::test]
    async fn the_one_where_the_script_is_followed_then_abandoned() {
        let observer = InMemoryTransport::with_script(vec![
            ScriptedReply::Respond(TransportResponse::new(500, "oops")),
            ScriptedReply::Fail("connection reset by peer".to_string()),
        ]);
        let mut transport = observer.clone();
        let body = r#"{"allOrNone":false,"records":[{}]}"#;

        assert_eq!(transport.send(request(body)).await.unwrap().status, 500);
        let err = transport.send(request(body)).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(transport.send(request(body)).await.unwrap().status, 200);

        // -- 🔍 the clone saw everything, because the Arc is shared
        assert_eq!(observer.call_count().await, 3);
        assert_eq!(observer.requests().await[0].body, body);
    }
}
