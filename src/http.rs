use crate::api::ErrorResponse;
use crate::error::{Error, Result};
use reqwest::{Client, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const MAX_RETRY_DELAY_MS: u64 = 5_000;

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    base_delay_ms: u64,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::http(e.to_string()))?;

        Ok(Self {
            client,
            max_retries,
            base_delay_ms: 200,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.request_with_retry(|| self.client.get(url)).await?;
        serde_json::from_str(&body).map_err(|e| Error::parse(format!("JSON parse: {e}")))
    }

    pub async fn post_json<B, T>(&self, url: &str, payload: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_string(payload)
            .map_err(|e| Error::parse(format!("JSON encode: {e}")))?;
        let text = self
            .request_with_retry(|| {
                self.client
                    .post(url)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(body.clone())
            })
            .await?;
        serde_json::from_str(&text).map_err(|e| Error::parse(format!("JSON parse: {e}")))
    }

    async fn request_with_retry<F>(&self, build: F) -> Result<String>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut delay = self.base_delay_ms;
        let mut retries = 0;

        loop {
            match send_once(build()).await {
                Attempt::Done(outcome) => return outcome,
                Attempt::Retry(e) if retries >= self.max_retries => return Err(e),
                Attempt::Retry(e) => {
                    retries += 1;
                    warn!(retries, delay_ms = delay, error = %e, "transient failure, retrying");
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
                }
            }
        }
    }
}

enum Attempt {
    Done(Result<String>),
    Retry(Error),
}

// Evaluator answers (400, 500) are deterministic for the same operands, so
// only transport failures and gateway statuses are worth another attempt.
async fn send_once(request: reqwest::RequestBuilder) -> Attempt {
    let resp = match request.send().await {
        Ok(resp) => resp,
        Err(e) if e.is_timeout() || e.is_connect() => {
            return Attempt::Retry(Error::http(e.to_string()));
        }
        Err(e) => return Attempt::Done(Err(Error::http(e.to_string()))),
    };

    let retryable = is_gateway_failure(resp.status());
    match handle_response(resp).await {
        Err(e) if retryable => {
            debug!(error = %e, "gateway not ready");
            Attempt::Retry(e)
        }
        outcome => Attempt::Done(outcome),
    }
}

fn is_gateway_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

async fn handle_response(resp: reqwest::Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| Error::http(e.to_string()))?;

    if status.is_success() {
        return Ok(body);
    }

    Err(Error::api(status.as_u16(), error_message(&body)))
}

/// Pull the `error` field out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_error_field() {
        let body = r#"{"error":"Division by zero is not allowed","status":"400"}"#;
        assert_eq!(error_message(body), "Division by zero is not allowed");
    }

    #[test]
    fn only_gateway_statuses_are_retried() {
        assert!(is_gateway_failure(StatusCode::BAD_GATEWAY));
        assert!(is_gateway_failure(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_gateway_failure(StatusCode::GATEWAY_TIMEOUT));
        assert!(!is_gateway_failure(StatusCode::BAD_REQUEST));
        assert!(!is_gateway_failure(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_gateway_failure(StatusCode::NOT_FOUND));
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message("Not Found"), "Not Found");
        assert_eq!(error_message(""), "");
    }
}
