use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::{
    Check, Exchange, Failure, FailureKind, OrderDriver, CHECK_ORDER, CHECK_STATUS,
    CHECK_SUCCESS_FLAG, REQUEST_TIMEOUT,
};
use crate::config::Protocol;
use crate::error::Result;
use crate::payload::CreateOrderRequest;

/// `POST /order` with a JSON body.
#[derive(Debug, Clone)]
pub struct HttpDriver {
    client: Client,
    url: String,
}

impl HttpDriver {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl OrderDriver for HttpDriver {
    fn protocol(&self) -> Protocol {
        Protocol::Http
    }

    async fn submit(&self, request: &CreateOrderRequest) -> std::result::Result<Exchange, Failure> {
        let start = Instant::now();
        let body = serde_json::to_vec(request).map_err(|e| Failure {
            kind: FailureKind::Other,
            latency: start.elapsed(),
            message: e.to_string(),
        })?;
        let bytes_sent = body.len() as u64;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Failure {
                kind: classify(&e),
                latency: start.elapsed(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let payload = response.bytes().await.map_err(|e| Failure {
            kind: classify(&e),
            latency: start.elapsed(),
            message: e.to_string(),
        })?;

        Ok(Exchange {
            latency: start.elapsed(),
            checks: validate(status, &payload),
            bytes_sent,
            bytes_received: payload.len() as u64,
        })
    }
}

fn classify(error: &reqwest::Error) -> FailureKind {
    if error.is_timeout() {
        FailureKind::Timeout
    } else if error.is_connect() {
        FailureKind::Connection
    } else {
        FailureKind::Other
    }
}

/// Status must be 200 or 201 and the body must carry a boolean `success`
/// and a non-null `order`.
pub fn validate(status: StatusCode, body: &[u8]) -> Vec<Check> {
    let json: Option<Value> = serde_json::from_slice(body).ok();
    let field = |name: &str| json.as_ref().and_then(|v| v.get(name));

    vec![
        Check::new(
            CHECK_STATUS,
            status == StatusCode::OK || status == StatusCode::CREATED,
        ),
        Check::new(
            CHECK_SUCCESS_FLAG,
            field("success").is_some_and(Value::is_boolean),
        ),
        Check::new(CHECK_ORDER, field("order").is_some_and(|o| !o.is_null())),
    ]
}
