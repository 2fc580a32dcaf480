use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, trace};

use crate::backends::Transport;
use crate::common::{BulkRequest, TransportResponse};
use crate::error::BulkError;

/// 📡 The real thing: a `reqwest::Client` with the bearer token baked in.
///
/// Pure I/O, zero interpretation. Whatever status comes back is handed up untouched.
/// Only "no response at all" is an error here.
///
/// 🔄 This does not retry. Retries are somebody else's problem, and that somebody does not exist.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// 🚀 Build the client once: bearer + JSON content type as default headers, plus timeouts.
    pub fn new(access_token: &str, connect_timeout: Duration, timeout: Duration) -> Result<Self> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", access_token.trim()))
            .map_err(|_| BulkError::config("the access token contains characters that cannot go in an HTTP header"))?;
        // 🔒 keeps the token out of reqwest's own Debug output
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .context("💀 The HTTP client refused to be born. Probably the TLS stack, possibly a cursed system OpenSSL. Either way: tragic.")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&mut self, request: BulkRequest) -> Result<TransportResponse> {
        debug!("📡 {} {} ({} bytes)", request.method, request.url, request.body.len());
        let response = self
            .client
            .request(request.method, &request.url)
            .body(request.body)
            .send()
            .await
            .with_context(|| format!("💀 no response from {}. The network is giving us the silent treatment.", request.url))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("💀 the response started arriving and then stopped. Half a response is no response.")?;
        trace!("📨 {status}: {body}");
        Ok(TransportResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> HttpTransport {
        HttpTransport::new("00Dxx!token", Duration::from_secs(5), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn the_one_where_the_headers_and_verb_arrive_intact() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/services/data/v58.0/composite/sobjects/Account/Ext_Id__c"))
            .and(header("authorization", "Bearer 00Dxx!token"))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"{"allOrNone":false,"records":[]}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let response = transport()
            .send(BulkRequest {
                method: Method::PATCH,
                url: format!("{}/services/data/v58.0/composite/sobjects/Account/Ext_Id__c", server.uri()),
                body: r#"{"allOrNone":false,"records":[]}"#.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response, TransportResponse::new(200, "[]"));
    }

    #[tokio::test]
    async fn the_one_where_a_400_is_still_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"[{"errorCode":"INVALID_FIELD"}]"#))
            .mount(&server)
            .await;

        let response = transport()
            .send(BulkRequest {
                method: Method::POST,
                url: format!("{}/services/data/v58.0/composite/sobjects", server.uri()),
                body: "{}".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.status, 400);
        assert!(response.body.contains("INVALID_FIELD"));
    }

    #[tokio::test]
    async fn the_one_where_nobody_is_listening() {
        // -- 🔌 port 9 on localhost: the discard service, which nobody runs anymore
        let result = transport()
            .send(BulkRequest {
                method: Method::POST,
                url: "http://127.0.0.1:9/services/data/v58.0/composite/sobjects".to_string(),
                body: "{}".to_string(),
            })
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn the_one_where_a_newline_in_the_token_is_a_config_problem() {
        let err = HttpTransport::new("abc\ndef", Duration::from_secs(1), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BulkError>(),
            Some(BulkError::Configuration(_))
        ));
    }
}
