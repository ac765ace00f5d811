use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::error::ProviderError;
use super::types::{ChargeRequest, ChargeResponse};
use super::PaymentProvider;
use crate::invoice::Invoice;

pub struct HttpPaymentProvider {
    client: Client,
    charge_url: String,
}

impl HttpPaymentProvider {
    pub fn with_timeouts(
        base_url: &str,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            charge_url: format!("{}/charges", base_url.trim_end_matches('/')),
        })
    }
}

/// Statuses that say "try again later" rather than "this request is wrong".
fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn classify_send_error(err: reqwest::Error) -> ProviderError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        ProviderError::Network(err.to_string())
    } else {
        ProviderError::Http(err)
    }
}

#[async_trait]
impl PaymentProvider for HttpPaymentProvider {
    async fn charge(&self, invoice: &Invoice) -> Result<bool, ProviderError> {
        let req = ChargeRequest::from(invoice);
        let response = self
            .client
            .post(&self.charge_url)
            .json(&req)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        debug!(invoice_id = invoice.id, status = status.as_u16(), "provider responded");

        if is_transient_status(status) {
            return Err(ProviderError::Network(format!(
                "provider returned status {}",
                status.as_u16()
            )));
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<ChargeResponse>().await?;
        Ok(body.charged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{Currency, InvoiceStatus, Money};
    use rust_decimal::Decimal;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn invoice() -> Invoice {
        Invoice::new(
            1,
            1,
            Money::new(Decimal::new(10, 0), Currency::Eur),
            InvoiceStatus::Pending,
        )
    }

    fn provider_for(base_url: &str) -> Result<HttpPaymentProvider, ProviderError> {
        HttpPaymentProvider::with_timeouts(base_url, Duration::from_secs(2), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn charged_true_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/charges"))
            .and(body_partial_json(serde_json::json!({"invoice_id": 1, "currency": "EUR"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"charged": true})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server.uri()).unwrap();
        assert!(provider.charge(&invoice()).await.unwrap());
    }

    #[tokio::test]
    async fn charged_false_is_decline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/charges"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"charged": false})))
            .mount(&server)
            .await;

        let provider = provider_for(&format!("{}/", server.uri())).unwrap();
        assert!(!provider.charge(&invoice()).await.unwrap());
    }

    #[tokio::test]
    async fn service_unavailable_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/charges"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = provider_for(&server.uri()).unwrap();
        let err = provider.charge(&invoice()).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn bad_request_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/charges"))
            .respond_with(ResponseTemplate::new(400).set_body_string("unknown currency"))
            .mount(&server)
            .await;

        let provider = provider_for(&server.uri()).unwrap();
        match provider.charge(&invoice()).await.unwrap_err() {
            ProviderError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "unknown currency");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/charges"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = provider_for(&server.uri()).unwrap();
        let err = provider.charge(&invoice()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Http(_)));
    }

    #[tokio::test]
    async fn unreachable_provider_is_network_error() {
        // Nothing listens on port 9 of the loopback in test environments.
        let provider = HttpPaymentProvider::with_timeouts(
            "http://127.0.0.1:9",
            Duration::from_millis(200),
            Duration::from_millis(500),
        )
        .unwrap();
        let err = provider.charge(&invoice()).await.unwrap_err();
        assert!(err.is_transient());
    }
}
