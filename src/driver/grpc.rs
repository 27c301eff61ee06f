use std::time::Instant;

use async_trait::async_trait;
use prost::Message;
use tonic::transport::Channel;
use tonic::Code;

use super::{
    Check, Exchange, Failure, FailureKind, OrderDriver, CHECK_NO_ERRORS, CHECK_ORDER,
    CHECK_STATUS, CHECK_SUCCESS_FLAG, REQUEST_TIMEOUT,
};
use crate::config::Protocol;
use crate::error::{Error, Result};
use crate::payload::CreateOrderRequest;
use crate::proto::{self, OrderServiceClient};

/// Unary `OrderService/createOrder` call.
#[derive(Debug, Clone)]
pub struct GrpcDriver {
    client: OrderServiceClient,
}

impl GrpcDriver {
    /// The channel connects on first use, so an unreachable target shows up as
    /// failed iterations rather than a startup error.
    pub fn connect_lazy(endpoint: &str) -> Result<Self> {
        let channel = Channel::from_shared(endpoint.to_string())
            .map_err(|e| Error::InvalidEndpoint(format!("{endpoint}: {e}")))?
            .timeout(REQUEST_TIMEOUT)
            .connect_lazy();
        Ok(Self {
            client: OrderServiceClient::new(channel),
        })
    }
}

#[async_trait]
impl OrderDriver for GrpcDriver {
    fn protocol(&self) -> Protocol {
        Protocol::Grpc
    }

    async fn submit(&self, request: &CreateOrderRequest) -> std::result::Result<Exchange, Failure> {
        let message = proto::CreateOrderRequest::from(request);
        let bytes_sent = message.encoded_len() as u64;
        let mut call = tonic::Request::new(message);
        call.set_timeout(REQUEST_TIMEOUT);

        let mut client = self.client.clone();
        let start = Instant::now();
        match client.create_order(call).await {
            Ok(response) => {
                let body = response.into_inner();
                Ok(Exchange {
                    latency: start.elapsed(),
                    checks: validate(Code::Ok, Some(&body)),
                    bytes_sent,
                    bytes_received: body.encoded_len() as u64,
                })
            }
            Err(status) => {
                let latency = start.elapsed();
                let kind = match status.code() {
                    Code::Unavailable => Some(FailureKind::Connection),
                    Code::DeadlineExceeded => Some(FailureKind::Timeout),
                    _ => None,
                };
                match kind {
                    Some(kind) => Err(Failure {
                        kind,
                        latency,
                        message: status.to_string(),
                    }),
                    None => Ok(Exchange {
                        latency,
                        checks: validate(status.code(), None),
                        bytes_sent,
                        bytes_received: 0,
                    }),
                }
            }
        }
    }
}

/// Code must be OK, the reply must report success with an order, and the
/// error list must be empty.
pub fn validate(code: Code, body: Option<&proto::CreateOrderResponse>) -> Vec<Check> {
    vec![
        Check::new(CHECK_STATUS, code == Code::Ok),
        Check::new(CHECK_SUCCESS_FLAG, body.is_some_and(|b| b.success)),
        Check::new(CHECK_ORDER, body.is_some_and(|b| b.order.is_some())),
        Check::new(CHECK_NO_ERRORS, body.is_some_and(|b| b.errors.is_empty())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::iterate;
    use crate::payload::OrderGenerator;
    use crate::proto::OrderSummary;

    fn response(errors: Vec<String>) -> proto::CreateOrderResponse {
        proto::CreateOrderResponse {
            success: true,
            order: Some(OrderSummary {
                order_id: "ord_1".to_string(),
                status: "CREATED".to_string(),
                total_amount: 99.5,
            }),
            errors,
        }
    }

    #[test]
    fn ok_reply_passes_every_check() {
        let body = response(vec![]);
        assert!(validate(Code::Ok, Some(&body)).iter().all(|c| c.passed));
    }

    #[test]
    fn non_empty_error_list_fails_only_that_check() {
        let body = response(vec!["inventory unavailable".to_string()]);
        let failed: Vec<&str> = validate(Code::Ok, Some(&body))
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name)
            .collect();
        assert_eq!(failed, vec![CHECK_NO_ERRORS]);
    }

    #[test]
    fn error_status_fails_all_checks() {
        assert!(validate(Code::InvalidArgument, None)
            .iter()
            .all(|c| !c.passed));
    }

    #[test]
    fn rejects_malformed_endpoint() {
        assert!(matches!(
            GrpcDriver::connect_lazy("not a uri"),
            Err(Error::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_failed_iteration() {
        let driver = GrpcDriver::connect_lazy("http://127.0.0.1:1").unwrap();
        let outcome = iterate(&driver, &mut OrderGenerator::seeded(8)).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Connection));
    }
}
