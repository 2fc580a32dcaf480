use anyhow::Result;
use async_trait::async_trait;

use crate::backends::{in_mem, salesforce};
use crate::common::{BulkRequest, TransportResponse};

/// 📡 Sends one rendered batch and hands back whatever came back — pure I/O, zero logic.
///
/// # Contract 📜
/// - `Ok(response)` for ANY status code. A 500 is still a response.
/// - `Err(..)` only when no response was obtained (DNS, TLS, timeout, reset...).
/// - No retries. No interpretation. The delivery client reads the tea leaves.
#[async_trait]
pub trait Transport: std::fmt::Debug + Send {
    async fn send(&mut self, request: BulkRequest) -> Result<TransportResponse>;
}

/// 🎭 Where batches go: the real API, or a notebook that writes down every request.
#[derive(Debug)]
pub enum TransportBackend {
    Http(salesforce::HttpTransport),
    InMemory(in_mem::InMemoryTransport),
}

#[async_trait]
impl Transport for TransportBackend {
    async fn send(&mut self, request: BulkRequest) -> Result<TransportResponse> {
        match self {
            TransportBackend::Http(t) => t.send(request).await,
            TransportBackend::InMemory(t) => t.send(request).await,
        }
    }
}
